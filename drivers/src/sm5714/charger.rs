use bitflags::bitflags;
use embedded_hal::i2c::I2c;

use super::{ChargeStatus, Health, PowerSupplyError, Property, SupplyType};
use crate::register::BlockingRegisterDevice;

pub const NAME: &str = "sm5714_charger";
pub const SUPPLY_TYPE: SupplyType = SupplyType::Usb;
pub const PROPERTIES: [Property; 4] = [
    Property::Present,
    Property::Status,
    Property::Health,
    Property::Online,
];

pub(crate) const REG_STATUS1: u8 = 0x0D;
pub(crate) const REG_STATUS2: u8 = 0x0E;
pub(crate) const REG_STATUS3: u8 = 0x0F;
pub(crate) const REG_CHGCNTL4: u8 = 0x1A;

pub(crate) const CHGCNTL4_AUTOSTOP: u16 = 1 << 6;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status1: u16 {
        /// Valid input supply.
        const VBUS_POK = 1 << 0;
        const VBUS_UVLO = 1 << 1;
        const VBUS_OVP = 1 << 2;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Status2: u16 {
        const NO_BATTERY = 1 << 2;
        const CHARGE_ON = 1 << 3;
        const TOP_OFF = 1 << 5;
    }
}

#[derive(Debug, Clone, Copy, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChargerConfig {
    /// Stop charging automatically at top-off.
    pub use_autostop: bool,
}

/// SM5714 charger, 16-bit little-endian registers.
pub struct Sm5714Charger<I2C> {
    dev: BlockingRegisterDevice<I2C>,
    config: ChargerConfig,
}

impl<I2C> Sm5714Charger<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, adr: u8, config: ChargerConfig) -> Self {
        Self {
            dev: BlockingRegisterDevice::new(i2c, adr),
            config,
        }
    }

    /// Apply the autostop setting.
    pub fn init(&mut self) -> Result<(), PowerSupplyError> {
        let value = if self.config.use_autostop {
            CHGCNTL4_AUTOSTOP
        } else {
            0
        };
        self.dev
            .update_word_bits(REG_CHGCNTL4, CHGCNTL4_AUTOSTOP, value)
            .map_err(|e| {
                error!("sm5714: unable to set autostop register");
                e.into()
            })
    }

    pub fn status1(&mut self) -> Result<Status1, PowerSupplyError> {
        Ok(Status1::from_bits_retain(self.dev.read_word(REG_STATUS1)?))
    }

    pub fn status2(&mut self) -> Result<Status2, PowerSupplyError> {
        Ok(Status2::from_bits_retain(self.dev.read_word(REG_STATUS2)?))
    }

    /// Battery detected.
    pub fn is_present(&mut self) -> Result<bool, PowerSupplyError> {
        Ok(!self.status2()?.contains(Status2::NO_BATTERY))
    }

    /// Input supply attached.
    pub fn is_online(&mut self) -> Result<bool, PowerSupplyError> {
        Ok(self.status1()?.contains(Status1::VBUS_POK))
    }

    pub fn status(&mut self) -> Result<ChargeStatus, PowerSupplyError> {
        let st1 = self.status1()?;
        let st2 = self.status2()?;
        // STATUS3 is only traced
        let st3 = self.dev.read_word(REG_STATUS3)?;
        trace!("sm5714: status {:x} {:x} {:x}", st1.bits(), st2.bits(), st3);

        let status = if st2.contains(Status2::TOP_OFF) {
            ChargeStatus::Full
        } else if st2.contains(Status2::CHARGE_ON) {
            ChargeStatus::Charging
        } else if st1.contains(Status1::VBUS_POK) {
            ChargeStatus::NotCharging
        } else {
            ChargeStatus::Discharging
        };
        Ok(status)
    }

    pub fn health(&mut self) -> Result<Health, PowerSupplyError> {
        let st1 = self.status1()?;
        let health = if st1.contains(Status1::VBUS_POK) {
            Health::Good
        } else if st1.contains(Status1::VBUS_OVP) {
            Health::Overvoltage
        } else {
            // undervoltage is not distinguished
            Health::Unknown
        };
        Ok(health)
    }

    /// Read a property as its power-supply integer value.
    pub fn get_property(&mut self, prop: Property) -> Result<i32, PowerSupplyError> {
        match prop {
            Property::Present => Ok(i32::from(self.is_present()?)),
            Property::Online => Ok(i32::from(self.is_online()?)),
            Property::Status => Ok(i32::from(u8::from(self.status()?))),
            Property::Health => Ok(i32::from(u8::from(self.health()?))),
            _ => Err(PowerSupplyError::InvalidProperty(prop)),
        }
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
    use std::vec::Vec;

    const ADR: u8 = 0x49;

    fn status_reads(st1: u16, st2: u16) -> Vec<I2cTransaction> {
        vec![
            I2cTransaction::write_read(ADR, vec![REG_STATUS1], st1.to_le_bytes().to_vec()),
            I2cTransaction::write_read(ADR, vec![REG_STATUS2], st2.to_le_bytes().to_vec()),
            I2cTransaction::write_read(ADR, vec![REG_STATUS3], vec![0x00, 0x00]),
        ]
    }

    #[test]
    fn test_charge_status_priority() {
        let cases = [
            (0x0001, 0x0028, ChargeStatus::Full),
            (0x0001, 0x0008, ChargeStatus::Charging),
            (0x0001, 0x0000, ChargeStatus::NotCharging),
            (0x0000, 0x0000, ChargeStatus::Discharging),
        ];
        let expectations: Vec<_> = cases
            .iter()
            .flat_map(|&(st1, st2, _)| status_reads(st1, st2))
            .collect();
        let mut i2c = I2cMock::new(&expectations);
        let mut charger = Sm5714Charger::new(i2c.clone(), ADR, ChargerConfig::default());

        for (_, _, expected) in cases {
            assert_eq!(charger.status().unwrap(), expected);
        }
        i2c.done();
    }

    #[test]
    fn test_health_and_presence() {
        let expectations = [
            I2cTransaction::write_read(ADR, vec![REG_STATUS1], vec![0x05, 0x00]),
            I2cTransaction::write_read(ADR, vec![REG_STATUS1], vec![0x04, 0x00]),
            I2cTransaction::write_read(ADR, vec![REG_STATUS1], vec![0x02, 0x00]),
            I2cTransaction::write_read(ADR, vec![REG_STATUS2], vec![0x04, 0x00]),
            I2cTransaction::write_read(ADR, vec![REG_STATUS1], vec![0x01, 0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut charger = Sm5714Charger::new(i2c.clone(), ADR, ChargerConfig::default());

        assert_eq!(charger.get_property(Property::Health), Ok(1));
        assert_eq!(charger.health().unwrap(), Health::Overvoltage);
        assert_eq!(charger.get_property(Property::Health), Ok(0));
        assert_eq!(charger.get_property(Property::Present), Ok(0));
        assert_eq!(charger.get_property(Property::Online), Ok(1));
        assert_eq!(
            charger.get_property(Property::Capacity),
            Err(PowerSupplyError::InvalidProperty(Property::Capacity))
        );
        i2c.done();
    }

    #[test]
    fn test_init_sets_autostop() {
        let expectations = [
            I2cTransaction::write_read(ADR, vec![REG_CHGCNTL4], vec![0x01, 0x80]),
            I2cTransaction::write(ADR, vec![REG_CHGCNTL4, 0x41, 0x80]),
            I2cTransaction::write_read(ADR, vec![REG_CHGCNTL4], vec![0x00, 0x00])
                .with_error(ErrorKind::Other),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut charger = Sm5714Charger::new(
            i2c.clone(),
            ADR,
            ChargerConfig {
                use_autostop: true,
            },
        );

        charger.init().unwrap();
        assert_eq!(
            charger.init(),
            Err(PowerSupplyError::I2CError(ErrorKind::Other))
        );
        i2c.done();
    }
}
