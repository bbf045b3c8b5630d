use embedded_hal::i2c::{I2c, SevenBitAddress};

/// Byte/word register access over a blocking I2C bus.
///
/// Each call is one bus transaction. Errors are returned as-is; nothing here
/// retries.
#[derive(Debug)]
pub struct BlockingRegisterDevice<I2C> {
    i2c: I2C,
    pub adr: SevenBitAddress,
}

impl<I2C> BlockingRegisterDevice<I2C>
where
    I2C: I2c,
{
    pub fn new(i2c: I2C, adr: SevenBitAddress) -> Self {
        Self { i2c, adr }
    }

    /// Give the bus back.
    pub fn release(self) -> I2C {
        self.i2c
    }

    pub fn read_register(&mut self, reg: u8) -> Result<u8, I2C::Error> {
        let mut buffer = [0u8; 1];
        self.i2c.write_read(self.adr, &[reg], &mut buffer)?;
        Ok(buffer[0])
    }

    /// Block read of `buffer.len()` bytes starting at `reg` (or issued by
    /// command `reg`).
    pub fn read_register_buffer(&mut self, reg: u8, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c.write_read(self.adr, &[reg], buffer)
    }

    /// Raw write; the first byte is the register or command.
    pub fn write_register(&mut self, buffer: &[u8]) -> Result<(), I2C::Error> {
        self.i2c.write(self.adr, buffer)
    }

    /// Single command byte with no payload.
    pub fn write_byte(&mut self, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.adr, &[value])
    }

    /// 16-bit little-endian register read.
    pub fn read_word(&mut self, reg: u8) -> Result<u16, I2C::Error> {
        let mut buffer = [0u8; 2];
        self.i2c.write_read(self.adr, &[reg], &mut buffer)?;
        Ok(u16::from_le_bytes(buffer))
    }

    /// 16-bit little-endian register write.
    pub fn write_word(&mut self, reg: u8, value: u16) -> Result<(), I2C::Error> {
        let [lo, hi] = value.to_le_bytes();
        self.i2c.write(self.adr, &[reg, lo, hi])
    }

    /// Read-modify-write of the bits selected by `mask`. The write is
    /// skipped when the register already holds the requested bits.
    pub fn update_word_bits(&mut self, reg: u8, mask: u16, value: u16) -> Result<(), I2C::Error> {
        let current = self.read_word(reg)?;
        let updated = (current & !mask) | (value & mask);
        if updated != current {
            self.write_word(reg, updated)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};
    use std::vec;

    const ADR: u8 = 0x49;

    #[test]
    fn test_word_access_is_little_endian() {
        let expectations = [
            I2cTransaction::write_read(ADR, vec![0x0D], vec![0x34, 0x12]),
            I2cTransaction::write(ADR, vec![0x8C, 0x07, 0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut dev = BlockingRegisterDevice::new(i2c.clone(), ADR);

        assert_eq!(dev.read_word(0x0D).unwrap(), 0x1234);
        dev.write_word(0x8C, 0x0007).unwrap();
        i2c.done();
    }

    #[test]
    fn test_update_word_bits_skips_redundant_write() {
        let expectations = [
            I2cTransaction::write_read(ADR, vec![0x1A], vec![0x40, 0x00]),
            I2cTransaction::write_read(ADR, vec![0x1A], vec![0x41, 0x00]),
            I2cTransaction::write(ADR, vec![0x1A, 0x01, 0x00]),
        ];
        let mut i2c = I2cMock::new(&expectations);
        let mut dev = BlockingRegisterDevice::new(i2c.clone(), ADR);

        dev.update_word_bits(0x1A, 1 << 6, 1 << 6).unwrap();
        dev.update_word_bits(0x1A, 1 << 6, 0).unwrap();
        i2c.done();
    }
}
