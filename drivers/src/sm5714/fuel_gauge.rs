use embedded_hal::i2c::I2c;

use super::{fixed_8_8, PowerSupplyError, Property, SupplyType};
use crate::register::BlockingRegisterDevice;

pub const NAME: &str = "sm5714_fg";
pub const SUPPLY_TYPE: SupplyType = SupplyType::Battery;
pub const PROPERTIES: [Property; 4] = [
    Property::Temp,
    Property::Capacity,
    Property::VoltageNow,
    Property::CurrentNow,
];

pub(crate) const REG_SRAM_RADDR: u8 = 0x8C;
pub(crate) const REG_SRAM_RDATA: u8 = 0x8D;

/// Fuel-gauge SRAM word addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum SramAddr {
    Soc = 0x00,
    Ocv = 0x01,
    Vbat = 0x03,
    Vsys = 0x04,
    Current = 0x05,
    Temperature = 0x07,
    VbatAvg = 0x08,
    CurrentAvg = 0x09,
    State = 0x15,
}

/// SM5714 fuel gauge. Readings go through the SRAM window: the word address
/// is written to RADDR, then the value is read back from RDATA.
pub struct Sm5714FuelGauge<I2C> {
    dev: BlockingRegisterDevice<I2C>,
}

impl<I2C> Sm5714FuelGauge<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, adr: u8) -> Self {
        Self {
            dev: BlockingRegisterDevice::new(i2c, adr),
        }
    }

    pub fn read_sram(&mut self, addr: SramAddr) -> Result<u16, PowerSupplyError> {
        self.dev.write_word(REG_SRAM_RADDR, addr as u16)?;
        Ok(self.dev.read_word(REG_SRAM_RDATA)?)
    }

    /// Battery temperature in decidegrees Celsius.
    pub fn temperature(&mut self) -> Result<u32, PowerSupplyError> {
        let raw = self.read_sram(SramAddr::Temperature)? & 0x7FFF;
        Ok(fixed_8_8(raw, 10))
    }

    /// State of charge in percent.
    pub fn capacity(&mut self) -> Result<u32, PowerSupplyError> {
        let raw = self.read_sram(SramAddr::Soc)?;
        Ok(fixed_8_8(raw, 10) / 10)
    }

    /// Open-circuit voltage in microvolts.
    pub fn voltage_now(&mut self) -> Result<u32, PowerSupplyError> {
        let raw = self.read_sram(SramAddr::Ocv)? & 0x07FF;
        Ok(fixed_8_8(raw, 1_000_000))
    }

    /// Battery current in milliamperes.
    pub fn current_now(&mut self) -> Result<u32, PowerSupplyError> {
        let raw = self.read_sram(SramAddr::Current)? & 0x07FF;
        Ok(fixed_8_8(raw, 1000))
    }

    pub fn get_property(&mut self, prop: Property) -> Result<i32, PowerSupplyError> {
        let value = match prop {
            Property::Temp => self.temperature()?,
            Property::Capacity => self.capacity()?,
            Property::VoltageNow => self.voltage_now()?,
            Property::CurrentNow => self.current_now()?,
            _ => return Err(PowerSupplyError::InvalidProperty(prop)),
        };
        // the masks and scales bound every reading below i32::MAX
        Ok(i32::try_from(value).unwrap_or(i32::MAX))
    }

    pub fn release(self) -> I2C {
        self.dev.release()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::i2c::ErrorKind;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;

    const ADR: u8 = 0x71;

    fn sram(addr: u8, value: u16) -> [I2cTransaction; 2] {
        [
            I2cTransaction::write(ADR, vec![REG_SRAM_RADDR, addr, 0x00]),
            I2cTransaction::write_read(ADR, vec![REG_SRAM_RDATA], value.to_le_bytes().to_vec()),
        ]
    }

    #[test]
    fn test_fixed_point_conversion() {
        assert_eq!(fixed_8_8(0x0180, 1000), 1500);
        assert_eq!(fixed_8_8(0x0180, 10), 15);
        assert_eq!(fixed_8_8(0x00FF, 1), 0);
        assert_eq!(fixed_8_8(0x0400, 1_000_000), 4_000_000);
    }

    #[test]
    fn test_properties_apply_masks_and_scales() {
        let mut expectations = vec![];
        expectations.extend(sram(0x07, 0x8190));
        expectations.extend(sram(0x00, 0x5A80));
        expectations.extend(sram(0x01, 0xF3C0));
        expectations.extend(sram(0x05, 0x0180));
        let mut i2c = I2cMock::new(&expectations);
        let mut fg = Sm5714FuelGauge::new(i2c.clone(), ADR);

        // 0x0190 -> 1.5625 degrees
        assert_eq!(fg.get_property(Property::Temp), Ok(15));
        // 90.5 % truncates to 90
        assert_eq!(fg.get_property(Property::Capacity), Ok(90));
        // 0x3C0 -> 3.75 V
        assert_eq!(fg.get_property(Property::VoltageNow), Ok(3_750_000));
        assert_eq!(fg.get_property(Property::CurrentNow), Ok(1500));
        assert_eq!(
            fg.get_property(Property::Online),
            Err(PowerSupplyError::InvalidProperty(Property::Online))
        );
        i2c.done();
    }

    #[test]
    fn test_address_write_failure_propagates() {
        let expectations =
            [I2cTransaction::write(ADR, vec![REG_SRAM_RADDR, 0x05, 0x00]).with_error(ErrorKind::Other)];
        let mut i2c = I2cMock::new(&expectations);
        let mut fg = Sm5714FuelGauge::new(i2c.clone(), ADR);

        assert_eq!(
            fg.current_now(),
            Err(PowerSupplyError::I2CError(ErrorKind::Other))
        );
        i2c.done();
    }
}
