use super::contact::{ContactReport, ReportKind};

/// Aggregate keys reported alongside the per-slot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Key {
    /// Any contact is down.
    Touch,
    /// A finger tool is in contact.
    ToolFinger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotGeometry {
    pub x: u16,
    pub y: u16,
    pub major: u8,
    pub minor: u8,
}

/// Multi-touch slot update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotEvent {
    pub slot: u8,
    pub tool_active: bool,
    /// Present while the tool is active.
    pub geometry: Option<SlotGeometry>,
}

impl From<&ContactReport> for SlotEvent {
    fn from(report: &ContactReport) -> Self {
        let tool_active = report.kind != ReportKind::Up;
        Self {
            slot: report.slot,
            tool_active,
            geometry: tool_active.then_some(SlotGeometry {
                x: report.x,
                y: report.y,
                major: report.major,
                minor: report.minor,
            }),
        }
    }
}

/// Consumer of multi-touch reports.
///
/// Updates between two `sync()` calls form one frame and must be applied
/// atomically by the consumer.
pub trait InputSink {
    fn report_slot(&mut self, event: &SlotEvent);

    fn report_key(&mut self, key: Key, pressed: bool);

    fn sync(&mut self);
}

impl<T: InputSink + ?Sized> InputSink for &mut T {
    fn report_slot(&mut self, event: &SlotEvent) {
        T::report_slot(self, event)
    }

    fn report_key(&mut self, key: Key, pressed: bool) {
        T::report_key(self, key, pressed)
    }

    fn sync(&mut self) {
        T::sync(self)
    }
}
