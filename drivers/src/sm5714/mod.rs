//! Silicon Mitus SM5714 charger and fuel gauge.
//!
//! Both functions sit on the same package but answer on separate bus
//! addresses, so each gets its own driver. Readings are reported through
//! [`Property`] with the integer codes of a power-supply class.

use core::fmt::{self, Display, Formatter};
use embedded_hal::i2c::{Error, ErrorKind};
use num_enum::IntoPrimitive;

pub mod charger;
pub mod fuel_gauge;

/// Errors that can occur when interacting with the SM5714
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PowerSupplyError {
    I2CError(ErrorKind),
    /// The property is not provided by this supply.
    InvalidProperty(Property),
}

impl<E> From<E> for PowerSupplyError
where
    E: Error,
{
    fn from(e: E) -> Self {
        PowerSupplyError::I2CError(e.kind())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SupplyType {
    Usb,
    Battery,
}

/// Readable power-supply properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Property {
    Present,
    Online,
    Status,
    Health,
    /// Decidegrees Celsius.
    Temp,
    /// Percent.
    Capacity,
    /// Microvolts.
    VoltageNow,
    /// Milliamperes.
    CurrentNow,
}

/// Charging state as seen by the charger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ChargeStatus {
    Unknown = 0,
    Charging = 1,
    Discharging = 2,
    NotCharging = 3,
    Full = 4,
}

impl Display for ChargeStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            ChargeStatus::Unknown => write!(f, "Unknown"),
            ChargeStatus::Charging => write!(f, "Charging"),
            ChargeStatus::Discharging => write!(f, "Discharging"),
            ChargeStatus::NotCharging => write!(f, "Not charging"),
            ChargeStatus::Full => write!(f, "Full"),
        }
    }
}

/// Input supply health.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Health {
    Unknown = 0,
    Good = 1,
    Overvoltage = 4,
}

impl Display for Health {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Health::Unknown => write!(f, "Unknown"),
            Health::Good => write!(f, "Good"),
            Health::Overvoltage => write!(f, "Over voltage"),
        }
    }
}

/// Widen an 8.8 fixed-point value to an integer in `scale` units.
pub fn fixed_8_8(value: u16, scale: u32) -> u32 {
    let integer = u32::from(value >> 8);
    let fraction = u32::from(value & 0xFF);
    integer * scale + (fraction * scale) / 256
}
