use super::{Action, ErrorCode, EventClass, InfoCode, StatusType, TouchType, EVENT_SIZE};

/// One raw queue entry.
pub type Frame = [u8; EVENT_SIZE];

const VENDOR_ECHO: u8 = 0x01;

/// A decoded event frame.
///
/// Decoding is total: every bit pattern maps to some variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    Coordinate(CoordinateEvent),
    Status(StatusEvent),
    Gesture(GestureEvent),
    /// Vendor echo of a previously written command.
    Vendor(Frame),
    Unknown(Frame),
}

impl Event {
    pub fn decode(frame: &Frame) -> Self {
        match EventClass::from(frame[0] & 0x03) {
            EventClass::Coordinate => Event::Coordinate(CoordinateEvent::decode(frame)),
            EventClass::Status => Event::Status(StatusEvent::decode(frame)),
            EventClass::Gesture => Event::Gesture(GestureEvent::decode(frame)),
            EventClass::Vendor if frame[1] == VENDOR_ECHO => Event::Vendor(*frame),
            EventClass::Vendor => Event::Unknown(*frame),
        }
    }
}

/// Number of frames still queued behind `frame`.
pub fn left_event_count(frame: &Frame) -> u8 {
    frame[7] & 0x1F
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoordinateEvent {
    pub touch_id: u8,
    pub action: Action,
    /// 12-bit
    pub x: u16,
    /// 12-bit
    pub y: u16,
    pub major: u8,
    pub minor: u8,
    /// 6-bit
    pub z: u8,
    pub touch_type: TouchType,
    pub left_event: u8,
    pub max_energy: bool,
    pub noise_level: u8,
    pub max_strength: u8,
    /// 4-bit
    pub hover_id_num: u8,
}

impl CoordinateEvent {
    /// Byte 0 carries the tag in bits 0-1, the touch id in bits 2-5 and the
    /// action in bits 6-7. The low coordinate nibbles share byte 3 (y low,
    /// x high), and the touch type is split across bytes 6 and 7.
    fn decode(b: &Frame) -> Self {
        let ttype_hi = (b[6] >> 6) & 0x03;
        let ttype_lo = (b[7] >> 6) & 0x03;
        Self {
            touch_id: (b[0] >> 2) & 0x0F,
            action: Action::from((b[0] >> 6) & 0x03),
            x: (u16::from(b[1]) << 4) | u16::from(b[3] >> 4),
            y: (u16::from(b[2]) << 4) | u16::from(b[3] & 0x0F),
            major: b[4],
            minor: b[5],
            z: b[6] & 0x3F,
            touch_type: TouchType::from((ttype_hi << 2) | ttype_lo),
            left_event: b[7] & 0x1F,
            max_energy: b[7] & 0x20 != 0,
            noise_level: b[8],
            max_strength: b[9],
            hover_id_num: b[10] & 0x0F,
        }
    }

    /// Pack the fields into a coordinate frame. Fields wider than their
    /// on-wire width are truncated.
    pub fn encode(&self) -> Frame {
        let mut b = [0u8; EVENT_SIZE];
        let action: u8 = self.action.into();
        let ttype: u8 = self.touch_type.into();
        b[0] = u8::from(EventClass::Coordinate) | ((self.touch_id & 0x0F) << 2) | (action << 6);
        b[1] = (self.x >> 4) as u8;
        b[2] = (self.y >> 4) as u8;
        b[3] = (((self.x & 0x0F) as u8) << 4) | (self.y & 0x0F) as u8;
        b[4] = self.major;
        b[5] = self.minor;
        b[6] = (self.z & 0x3F) | (((ttype >> 2) & 0x03) << 6);
        b[7] = (self.left_event & 0x1F) | (u8::from(self.max_energy) << 5) | ((ttype & 0x03) << 6);
        b[8] = self.noise_level;
        b[9] = self.max_strength;
        b[10] = self.hover_id_num & 0x0F;
        b
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusEvent {
    pub status_type: StatusType,
    pub sf: u8,
    pub status_id: u8,
    pub data: [u8; 5],
    pub left_event: u8,
}

impl StatusEvent {
    fn decode(b: &Frame) -> Self {
        Self {
            status_type: StatusType::from((b[0] >> 2) & 0x0F),
            sf: b[0] >> 6,
            status_id: b[1],
            data: [b[2], b[3], b[4], b[5], b[6]],
            left_event: b[7] & 0x1F,
        }
    }

    pub fn kind(&self) -> StatusKind {
        match self.status_type {
            StatusType::Error => StatusKind::Error(ErrorCode::from(self.status_id)),
            StatusType::Information => StatusKind::Information(InfoCode::from(self.status_id)),
            other => StatusKind::Other(other),
        }
    }

    /// Ready information carrying the reset marker.
    pub fn is_ic_reset(&self) -> bool {
        self.kind() == StatusKind::Information(InfoCode::Ready)
            && self.data[0] == super::INFO_READY_IC_RESET
    }
}

/// Status frame classified by sub-type and sub-code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusKind {
    Error(ErrorCode),
    Information(InfoCode),
    Other(StatusType),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GestureEvent {
    pub gesture_type: u8,
    pub sf: u8,
    pub gesture_id: u8,
    pub data: [u8; 4],
    pub left_event: u8,
}

impl GestureEvent {
    fn decode(b: &Frame) -> Self {
        Self {
            gesture_type: (b[0] >> 2) & 0x0F,
            sf: b[0] >> 6,
            gesture_id: b[1],
            data: [b[2], b[3], b[4], b[5]],
            left_event: b[7] & 0x1F,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinate_round_trip() {
        let coord = CoordinateEvent {
            touch_id: 7,
            action: Action::Move,
            x: 0xABC,
            y: 0x123,
            major: 40,
            minor: 22,
            z: 0x2A,
            touch_type: TouchType::Palm,
            left_event: 19,
            max_energy: true,
            noise_level: 3,
            max_strength: 200,
            hover_id_num: 9,
        };
        let frame = coord.encode();
        assert_eq!(Event::decode(&frame), Event::Coordinate(coord));
        assert_eq!(left_event_count(&frame), 19);
    }

    #[test]
    fn test_coordinate_bit_layout() {
        // tid 3, press; x = 0x7F5, y = 0x0A6; type glove (0b0011) split 00 / 11
        let frame: Frame = [
            0x4C, 0x7F, 0x0A, 0x56, 0x11, 0x22, 0x05, 0xE2, 0x04, 0x30, 0xF2, 0, 0, 0, 0, 0,
        ];
        let Event::Coordinate(c) = Event::decode(&frame) else {
            panic!("expected a coordinate frame");
        };
        assert_eq!(c.touch_id, 3);
        assert_eq!(c.action, Action::Press);
        assert_eq!(c.x, 0x7F5);
        assert_eq!(c.y, 0x0A6);
        assert_eq!(c.major, 0x11);
        assert_eq!(c.minor, 0x22);
        assert_eq!(c.z, 5);
        assert_eq!(c.touch_type, TouchType::Glove);
        assert_eq!(c.left_event, 2);
        assert!(c.max_energy);
        assert_eq!(c.noise_level, 4);
        assert_eq!(c.max_strength, 0x30);
        assert_eq!(c.hover_id_num, 2);
    }

    #[test]
    fn test_status_classification() {
        let mut frame: Frame = [0; EVENT_SIZE];
        frame[0] = 0x01 | (1 << 2);
        frame[1] = 0x01;
        let Event::Status(queue_full) = Event::decode(&frame) else {
            panic!("expected a status frame");
        };
        assert_eq!(queue_full.kind(), StatusKind::Error(ErrorCode::QueueFull));

        frame[1] = 0x02;
        let Event::Status(esd) = Event::decode(&frame) else {
            panic!("expected a status frame");
        };
        assert_eq!(esd.kind(), StatusKind::Error(ErrorCode::Esd));

        frame[0] = 0x01 | (2 << 2);
        frame[1] = 0x00;
        frame[2] = 0x10;
        let Event::Status(ready) = Event::decode(&frame) else {
            panic!("expected a status frame");
        };
        assert!(ready.is_ic_reset());
        assert_eq!(ready.data[0], 0x10);
    }

    #[test]
    fn test_gesture_and_vendor_frames() {
        let frame: Frame = [0x02 | (5 << 2), 0x0B, 1, 2, 3, 4, 0, 0x03, 0, 0, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            Event::decode(&frame),
            Event::Gesture(GestureEvent {
                gesture_type: 5,
                sf: 0,
                gesture_id: 0x0B,
                data: [1, 2, 3, 4],
                left_event: 3,
            })
        );

        let mut vendor: Frame = [0xFF; EVENT_SIZE];
        vendor[1] = VENDOR_ECHO;
        assert_eq!(Event::decode(&vendor), Event::Vendor(vendor));
        vendor[1] = 0x42;
        assert_eq!(Event::decode(&vendor), Event::Unknown(vendor));
    }

    #[test]
    fn test_decode_is_total() {
        for first in 0..=u8::MAX {
            let frame: Frame = [first, 0xFF, 0x00, 0xFF, 0xAA, 0x55, 0xFF, 0xFF, 0, 0, 0xFF, 0, 0, 0, 0, 0];
            let _ = Event::decode(&frame);
        }
    }
}
