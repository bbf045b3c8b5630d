use super::event::CoordinateEvent;
use super::{Action, TouchType, MAX_FINGERS};

/// Persistent state of one contact slot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContactSlot {
    pub id: u8,
    pub prev_touch_type: TouchType,
    pub touch_type: TouchType,
    pub action: Action,
    pub prev_action: Action,
    pub x: u16,
    pub y: u16,
    /// Position latched at press.
    pub p_x: u16,
    pub p_y: u16,
    pub z: u8,
    pub major: u8,
    pub minor: u8,
    pub move_count: u16,
    pub palm: bool,
    pub palm_count: u16,
    pub left_event: u8,
    pub max_energy: bool,
    pub max_energy_x: u16,
    pub max_energy_y: u16,
    pub noise_level: u8,
    pub max_strength: u8,
    pub hover_id_num: u8,
}

impl ContactSlot {
    fn update(&mut self, ev: &CoordinateEvent) {
        self.prev_touch_type = self.touch_type;
        self.prev_action = self.action;
        self.id = ev.touch_id;
        self.action = ev.action;
        self.x = ev.x;
        self.y = ev.y;
        // z of 0 is never reported
        self.z = ev.z.max(1);
        self.touch_type = ev.touch_type;
        self.major = ev.major;
        self.minor = ev.minor;
        self.max_energy = ev.max_energy;
        if self.max_energy {
            self.max_energy_x = self.x;
            self.max_energy_y = self.y;
        }

        let is_palm = self.touch_type == TouchType::Palm;
        if !self.palm && is_palm {
            self.palm_count = self.palm_count.saturating_add(1);
        }
        self.palm = is_palm;
        self.left_event = ev.left_event;

        self.noise_level = ev.noise_level;
        self.max_strength = self.max_strength.max(ev.max_strength);
        self.hover_id_num = self.hover_id_num.max(ev.hover_id_num);
    }

    fn reset_counters(&mut self) {
        self.action = Action::None;
        self.move_count = 0;
        self.palm_count = 0;
        self.noise_level = 0;
        self.max_strength = 0;
        self.hover_id_num = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportKind {
    Down,
    Move,
    Up,
}

/// What changed on a slot, in input-consumer terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ContactReport {
    pub slot: u8,
    pub kind: ReportKind,
    pub x: u16,
    pub y: u16,
    pub major: u8,
    pub minor: u8,
    /// At least one contact is still down after this report.
    pub touch_present: bool,
}

/// Why a coordinate frame produced no report. No state was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SuppressReason {
    IdOutOfRange(u8),
    UnsupportedType(TouchType),
    UnsupportedAction,
    /// Move arrived while no contact was down.
    NoActiveTouch,
    /// Move arrived on a slot that was released.
    MoveWithoutPress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ContactOutcome {
    Report(ContactReport),
    Suppressed(SuppressReason),
}

/// Fixed table of contact slots indexed by hardware touch id, plus the
/// table-wide counters.
#[derive(Debug, Clone, Default)]
pub struct ContactTable {
    slots: [ContactSlot; MAX_FINGERS],
    touch_count: u32,
    check_multi: bool,
    multi_count: u32,
    all_finger_count: u32,
}

impl ContactTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_coordinate(&mut self, ev: &CoordinateEvent) -> ContactOutcome {
        let id = usize::from(ev.touch_id);
        let Some(slot) = self.slots.get_mut(id) else {
            return ContactOutcome::Suppressed(SuppressReason::IdOutOfRange(ev.touch_id));
        };
        if !ev.touch_type.is_reportable() {
            return ContactOutcome::Suppressed(SuppressReason::UnsupportedType(ev.touch_type));
        }
        match ev.action {
            Action::None => return ContactOutcome::Suppressed(SuppressReason::UnsupportedAction),
            Action::Move if self.touch_count == 0 => {
                return ContactOutcome::Suppressed(SuppressReason::NoActiveTouch);
            }
            Action::Move if slot.action == Action::None => {
                return ContactOutcome::Suppressed(SuppressReason::MoveWithoutPress);
            }
            _ => {}
        }

        slot.update(ev);

        let kind = match ev.action {
            Action::Press => {
                self.touch_count = self.touch_count.saturating_add(1);
                self.all_finger_count = self.all_finger_count.saturating_add(1);
                slot.p_x = slot.x;
                slot.p_y = slot.y;
                if self.touch_count > 4 && !self.check_multi {
                    self.check_multi = true;
                    self.multi_count = self.multi_count.saturating_add(1);
                }
                ReportKind::Down
            }
            Action::Move => {
                slot.move_count = slot.move_count.saturating_add(1);
                ReportKind::Move
            }
            _ => {
                self.touch_count = self.touch_count.saturating_sub(1);
                if self.touch_count == 0 {
                    self.check_multi = false;
                }
                ReportKind::Up
            }
        };

        let report = ContactReport {
            slot: ev.touch_id,
            kind,
            x: slot.x,
            y: slot.y,
            major: slot.major,
            minor: slot.minor,
            touch_present: self.touch_count > 0,
        };
        if kind == ReportKind::Up {
            slot.reset_counters();
        }
        ContactOutcome::Report(report)
    }

    /// Number of contacts currently down.
    pub fn count(&self) -> u32 {
        self.touch_count
    }

    pub fn slot(&self, id: u8) -> Option<&ContactSlot> {
        self.slots.get(usize::from(id))
    }

    /// More than four contacts are down in the current episode.
    pub fn multi_touch_active(&self) -> bool {
        self.check_multi
    }

    /// Episodes that reached more than four contacts.
    pub fn multi_count(&self) -> u32 {
        self.multi_count
    }

    /// Presses seen since power-on.
    pub fn all_finger_count(&self) -> u32 {
        self.all_finger_count
    }
}
