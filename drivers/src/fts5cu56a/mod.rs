//! STMicroelectronics FTS5CU56A capacitive multi-touch controller.
//!
//! The controller queues fixed 16-byte event frames and raises its interrupt
//! line while the queue is non-empty. [`blocking::Fts5cu56a`] drains the
//! queue, [`event`] decodes frames, [`contact`] keeps per-finger state and
//! [`input`] is the consumer-facing report seam.

use embedded_hal::i2c::{Error, ErrorKind};
use num_enum::{FromPrimitive, IntoPrimitive};

pub mod blocking;
pub mod contact;
pub mod event;
pub mod input;

/// Default 7-bit bus address.
pub const FTS5CU56A_ADDRESS: u8 = 0x49;

/// Size of one event frame in bytes.
pub const EVENT_SIZE: usize = 16;
/// Depth of the controller's event queue.
pub const FIFO_MAX: usize = 31;
/// Number of contact slots supported.
pub const MAX_FINGERS: usize = 10;
/// Largest reported X/Y coordinate.
pub const MAX_COORD: u16 = 4095;

pub(crate) const CMD_READ_STATUS: u8 = 0x84;
pub(crate) const CMD_READ_DEVICE_ID: u8 = 0x22;
pub(crate) const CMD_READ_FW_VERSION: u8 = 0x24;
pub(crate) const CMD_FORCE_CALIBRATION: u8 = 0x13;
pub(crate) const CMD_READ_ONE_EVENT: u8 = 0x60;
pub(crate) const CMD_READ_ALL_EVENT: u8 = 0x61;
pub(crate) const CMD_CLEAR_ALL_EVENT: u8 = 0x62;
pub(crate) const CMD_SLEEP_IN: u8 = 0x90;
pub(crate) const CMD_SLEEP_OUT: u8 = 0x91;
pub(crate) const CMD_MS_MT_SENSE_OFF: u8 = 0x92;
pub(crate) const CMD_MS_MT_SENSE_ON: u8 = 0x93;
pub(crate) const CMD_SS_HOVER_SENSE_OFF: u8 = 0x94;
pub(crate) const CMD_SS_HOVER_SENSE_ON: u8 = 0x95;
pub(crate) const CMD_MS_KEY_SENSE_OFF: u8 = 0x9A;
pub(crate) const CMD_MS_KEY_SENSE_ON: u8 = 0x9B;

/// System reset, issued once after the identification reads.
pub(crate) const SYSTEM_RESET_CMD: [u8; 6] = [0xFA, 0x20, 0x00, 0x00, 0x24, 0x81];
/// Enables the touch, palm and wet touch types.
pub(crate) const TOUCH_TYPE_CMD: [u8; 3] = [0x39, 0x61, 0x00];
pub(crate) const SCAN_ENABLE_CMD: [u8; 3] = [0xA0, 0x00, 0x01];

/// Settle time after enabling the supplies and after the system reset.
pub(crate) const POWER_ON_DELAY_MS: u32 = 20;

/// Event class in the low two bits of byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EventClass {
    Coordinate = 0,
    Status = 1,
    Gesture = 2,
    #[num_enum(default)]
    Vendor = 3,
}

/// Per-contact action code of a coordinate frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Action {
    #[default]
    None = 0,
    Press = 1,
    Move = 2,
    Release = 3,
}

impl Action {
    pub(crate) fn mnemonic(self) -> &'static str {
        match self {
            Action::Press => "P",
            Action::Move => "M",
            Action::Release | Action::None => "R",
        }
    }
}

/// Contact classification reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchType {
    Normal = 0,
    Hover = 1,
    FlipCover = 2,
    Glove = 3,
    Stylus = 4,
    Palm = 5,
    Wet = 6,
    Proximity = 7,
    Jig = 8,
    #[num_enum(catch_all)]
    Other(u8),
}

// num_enum reads `#[default]` as its own default, which excludes `catch_all`
impl Default for TouchType {
    fn default() -> Self {
        TouchType::Normal
    }
}

impl TouchType {
    /// Types forwarded to the input consumer as finger contacts.
    pub fn is_reportable(self) -> bool {
        matches!(
            self,
            TouchType::Normal | TouchType::Palm | TouchType::Wet | TouchType::Glove
        )
    }

    /// One-character tag used in transition logs.
    pub fn mnemonic(self) -> char {
        match self {
            TouchType::Normal => 'N',
            TouchType::Hover => '1',
            TouchType::FlipCover => '2',
            TouchType::Glove => 'G',
            TouchType::Stylus => '4',
            TouchType::Palm => 'P',
            _ => '?',
        }
    }
}

/// Status frame sub-type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StatusType {
    CommandDriven = 0,
    Error = 1,
    Information = 2,
    UserInput = 3,
    VendorInfo = 7,
    #[num_enum(catch_all)]
    Other(u8),
}

/// Status id of an error status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCode {
    CoreError = 0x00,
    QueueFull = 0x01,
    Esd = 0x02,
    #[num_enum(catch_all)]
    Other(u8),
}

/// Status id of an information status frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InfoCode {
    Ready = 0x00,
    WetMode = 0x01,
    NoiseMode = 0x02,
    XenosensorDetect = 0x04,
    #[num_enum(catch_all)]
    Other(u8),
}

/// Data byte of a ready information frame that marks a controller reset.
pub(crate) const INFO_READY_IC_RESET: u8 = 0x10;

#[derive(Debug, Clone, Copy)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchConfig {
    /// 7-bit bus address.
    pub address: u8,
    /// Touch keys (menu/back) are wired to the controller, along with
    /// their LED supply.
    pub use_key: bool,
    /// Hover sensing state applied on the next `open()`.
    pub hover_enabled: bool,
}

impl Default for TouchConfig {
    fn default() -> Self {
        Self {
            address: FTS5CU56A_ADDRESS,
            use_key: false,
            hover_enabled: false,
        }
    }
}

/// Identification read back during power-on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceInfo {
    pub chip_id: u16,
    pub chip_version: u8,
    pub fw_version: u16,
    pub config_id: u8,
    pub config_version: u8,
}

/// Errors that can occur when interacting with the FTS5CU56A
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchSensorError {
    I2CError(ErrorKind),
    /// The supply enable line could not be driven.
    SupplyError,
    /// The touch-key LED supply could not be switched.
    LedError,
    /// Attribute value could not be parsed, or the attribute is read-only.
    InvalidInput,
    FormatError,
}

impl<E> From<E> for TouchSensorError
where
    E: Error,
{
    fn from(e: E) -> Self {
        TouchSensorError::I2CError(e.kind())
    }
}
