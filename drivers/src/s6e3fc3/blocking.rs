use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use super::*;

/// S6E3FC3 panel driver.
///
/// Tracks whether the power-up sequence has completed. The reset line is
/// optional; when present, driving it high holds the panel in reset.
pub struct S6e3fc3<DSI, RST, DELAY> {
    dsi: DSI,
    rst_pin: Option<RST>,
    delay: DELAY,
    prepared: bool,
    brightness: u16,
}

impl<DSI, RST, DELAY> S6e3fc3<DSI, RST, DELAY>
where
    DSI: DsiHost,
    RST: OutputPin,
    DELAY: DelayNs,
{
    pub fn new(dsi: DSI, rst_pin: Option<RST>, delay: DELAY) -> Self {
        Self {
            dsi,
            rst_pin,
            delay,
            prepared: false,
            brightness: BACKLIGHT_DEFAULT,
        }
    }

    pub fn is_prepared(&self) -> bool {
        self.prepared
    }

    /// Link parameters for the DSI host.
    pub fn link(&self) -> DsiLink {
        S6E3FC3_LINK
    }

    /// Modes offered to the display pipeline.
    pub fn get_modes(&self) -> &'static [DisplayMode] {
        core::slice::from_ref(&S6E3FC3_MODE)
    }

    /// Power up the panel. Does nothing if already prepared.
    ///
    /// On failure the panel is held in reset and stays unprepared.
    pub fn prepare(&mut self) -> Result<(), PanelError<DSI::Error>> {
        if self.prepared {
            return Ok(());
        }

        if let Err(e) = self.on() {
            error!("s6e3fc3: failed to initialize panel");
            self.assert_reset();
            return Err(e);
        }

        self.prepared = true;
        Ok(())
    }

    /// Power down the panel. Does nothing if not prepared.
    ///
    /// The panel always ends unprepared; on failure it is also held in reset.
    pub fn unprepare(&mut self) -> Result<(), PanelError<DSI::Error>> {
        if !self.prepared {
            return Ok(());
        }
        self.prepared = false;

        if let Err(e) = self.off() {
            error!("s6e3fc3: failed to un-initialize panel");
            self.assert_reset();
            return Err(e);
        }
        Ok(())
    }

    pub fn max_brightness(&self) -> u16 {
        BACKLIGHT_MAX
    }

    /// Last level successfully written, or the default.
    pub fn brightness(&self) -> u16 {
        self.brightness
    }

    /// Write a backlight level. High-speed mode is used for the transfer.
    pub fn set_brightness(&mut self, level: u16) -> Result<(), PanelError<DSI::Error>> {
        if level > BACKLIGHT_MAX {
            return Err(PanelError::InvalidBrightness(level));
        }

        self.dsi.set_low_power_mode(false);
        self.dsi
            .dcs_write(DCS_SET_DISPLAY_BRIGHTNESS, &level.to_le_bytes())
            .map_err(PanelError::Dsi)?;
        self.dsi.set_low_power_mode(true);

        self.brightness = level;
        Ok(())
    }

    /// Read the level back from the panel.
    pub fn get_brightness(&mut self) -> Result<u16, PanelError<DSI::Error>> {
        let mut buf = [0u8; 2];
        self.dsi.set_low_power_mode(false);
        self.dsi
            .dcs_read(DCS_GET_DISPLAY_BRIGHTNESS, &mut buf)
            .map_err(PanelError::Dsi)?;
        self.dsi.set_low_power_mode(true);

        Ok(u16::from_le_bytes(buf))
    }

    /// Give back the DSI host and the reset pin.
    pub fn release(self) -> (DSI, Option<RST>) {
        (self.dsi, self.rst_pin)
    }

    fn on(&mut self) -> Result<(), PanelError<DSI::Error>> {
        self.dsi.set_low_power_mode(true);

        if let Err(e) = self.dsi.dcs_write(DCS_EXIT_SLEEP_MODE, &[]) {
            error!("s6e3fc3: failed to exit sleep mode");
            return Err(PanelError::Dsi(e));
        }
        self.delay.delay_ms(EXIT_SLEEP_DELAY_MS);

        for cmd in PANEL_INIT_CMDS {
            self.dsi
                .generic_write(cmd.addr, cmd.params)
                .map_err(PanelError::Dsi)?;
        }
        self.delay.delay_ms(INIT_SETTLE_DELAY_MS);
        Ok(())
    }

    fn off(&mut self) -> Result<(), PanelError<DSI::Error>> {
        self.dsi.set_low_power_mode(true);

        self.dsi
            .generic_write(LEVEL2_KEY_UNLOCK.addr, LEVEL2_KEY_UNLOCK.params)
            .map_err(PanelError::Dsi)?;

        if let Err(e) = self.dsi.dcs_write(DCS_SET_DISPLAY_OFF, &[]) {
            error!("s6e3fc3: failed to set display off");
            return Err(PanelError::Dsi(e));
        }
        self.delay.delay_ms(DISPLAY_OFF_DELAY_MS);

        if let Err(e) = self.dsi.dcs_write(DCS_ENTER_SLEEP_MODE, &[]) {
            error!("s6e3fc3: failed to enter sleep mode");
            return Err(PanelError::Dsi(e));
        }
        self.delay.delay_ms(ENTER_SLEEP_DELAY_MS);

        self.dsi
            .generic_write(LEVEL2_KEY_LOCK.addr, LEVEL2_KEY_LOCK.params)
            .map_err(PanelError::Dsi)
    }

    fn assert_reset(&mut self) {
        if let Some(rst) = self.rst_pin.as_mut() {
            if rst.set_high().is_err() {
                error!("s6e3fc3: failed to assert reset");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinState, Transaction as PinTransaction,
    };
    use std::vec;
    use std::vec::Vec;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Op {
        Generic(u8, Vec<u8>),
        Dcs(u8, Vec<u8>),
        Read(u8),
        LowPower(bool),
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    struct TransferFailed;

    /// Records every packet; the `fail_at`-th transfer (0-based) fails.
    #[derive(Default)]
    struct FakeHost {
        ops: Vec<Op>,
        transfers: usize,
        fail_at: Option<usize>,
        brightness: [u8; 2],
    }

    impl FakeHost {
        fn failing_at(n: usize) -> Self {
            Self {
                fail_at: Some(n),
                ..Default::default()
            }
        }

        fn transfer(&mut self, op: Op) -> Result<(), TransferFailed> {
            let n = self.transfers;
            self.transfers += 1;
            if self.fail_at == Some(n) {
                return Err(TransferFailed);
            }
            self.ops.push(op);
            Ok(())
        }
    }

    impl DsiHost for FakeHost {
        type Error = TransferFailed;

        fn generic_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error> {
            self.transfer(Op::Generic(cmd, params.to_vec()))
        }

        fn dcs_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error> {
            self.transfer(Op::Dcs(cmd, params.to_vec()))
        }

        fn dcs_read(&mut self, cmd: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
            self.transfer(Op::Read(cmd))?;
            buf.copy_from_slice(&self.brightness);
            Ok(())
        }

        fn set_low_power_mode(&mut self, enable: bool) {
            self.ops.push(Op::LowPower(enable));
        }
    }

    #[derive(Default)]
    struct RecordingDelay {
        total_ms: u32,
    }

    impl DelayNs for RecordingDelay {
        fn delay_ns(&mut self, ns: u32) {
            self.total_ms += ns / 1_000_000;
        }

        fn delay_ms(&mut self, ms: u32) {
            self.total_ms += ms;
        }
    }

    fn new_panel<'a>(
        host: &'a mut FakeHost,
        rst: Option<PinMock>,
        delay: &'a mut RecordingDelay,
    ) -> S6e3fc3<&'a mut FakeHost, PinMock, &'a mut RecordingDelay> {
        S6e3fc3::new(host, rst, delay)
    }

    #[test]
    fn test_prepare_sends_init_sequence_once() {
        let mut host = FakeHost::default();
        let mut delay = RecordingDelay::default();
        let mut panel = new_panel(&mut host, None, &mut delay);

        panel.prepare().unwrap();
        assert!(panel.is_prepared());
        panel.prepare().unwrap();
        drop(panel);

        assert_eq!(host.ops[0], Op::LowPower(true));
        assert_eq!(host.ops[1], Op::Dcs(DCS_EXIT_SLEEP_MODE, vec![]));
        assert_eq!(host.ops[2], Op::Generic(0xF0, vec![0x5A, 0x5A]));
        assert_eq!(host.ops.last(), Some(&Op::Generic(0xF0, vec![0xA5, 0xA5])));
        assert_eq!(host.ops.len(), 2 + PANEL_INIT_CMDS.len());
        assert_eq!(delay.total_ms, EXIT_SLEEP_DELAY_MS + INIT_SETTLE_DELAY_MS);
    }

    #[test]
    fn test_prepare_failure_asserts_reset() {
        // exit-sleep succeeds, third table entry fails
        let mut host = FakeHost::failing_at(3);
        let mut delay = RecordingDelay::default();
        let mut rst = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut panel = new_panel(&mut host, Some(rst.clone()), &mut delay);

        assert_eq!(panel.prepare(), Err(PanelError::Dsi(TransferFailed)));
        assert!(!panel.is_prepared());
        drop(panel);

        assert_eq!(host.ops.len(), 4);
        assert_eq!(delay.total_ms, EXIT_SLEEP_DELAY_MS);
        rst.done();
    }

    #[test]
    fn test_prepare_failure_at_every_transfer() {
        assert_eq!(PANEL_INIT_CMDS.len(), 19);
        // exit-sleep plus one transfer per table entry
        for n in 0..=PANEL_INIT_CMDS.len() {
            let mut host = FakeHost::failing_at(n);
            let mut delay = RecordingDelay::default();
            let mut rst = PinMock::new(&[PinTransaction::set(PinState::High)]);
            let mut panel = new_panel(&mut host, Some(rst.clone()), &mut delay);

            assert_eq!(panel.prepare(), Err(PanelError::Dsi(TransferFailed)), "transfer {n}");
            assert!(!panel.is_prepared());
            drop(panel);

            assert_eq!(host.transfers, n + 1);
            rst.done();
        }
    }

    #[test]
    fn test_unprepare_sequence_and_failure() {
        let mut host = FakeHost::default();
        let mut delay = RecordingDelay::default();
        let mut panel = new_panel(&mut host, None, &mut delay);

        // not prepared: no traffic
        panel.unprepare().unwrap();
        panel.prepare().unwrap();
        panel.unprepare().unwrap();
        assert!(!panel.is_prepared());
        drop(panel);

        let tail = &host.ops[host.ops.len() - 5..];
        assert_eq!(
            tail,
            [
                Op::LowPower(true),
                Op::Generic(0x9F, vec![0xA5, 0xA5]),
                Op::Dcs(DCS_SET_DISPLAY_OFF, vec![]),
                Op::Dcs(DCS_ENTER_SLEEP_MODE, vec![]),
                Op::Generic(0x9F, vec![0x5A, 0x5A]),
            ]
        );

        // display-off fails during the power-down sequence
        let transfers = 1 + PANEL_INIT_CMDS.len() + 1;
        let mut host = FakeHost::failing_at(transfers);
        let mut delay = RecordingDelay::default();
        let mut rst = PinMock::new(&[PinTransaction::set(PinState::High)]);
        let mut panel = new_panel(&mut host, Some(rst.clone()), &mut delay);

        panel.prepare().unwrap();
        assert_eq!(panel.unprepare(), Err(PanelError::Dsi(TransferFailed)));
        assert!(!panel.is_prepared());
        rst.done();
    }

    #[test]
    fn test_brightness() {
        let mut host = FakeHost {
            brightness: [0x2C, 0x01],
            ..Default::default()
        };
        let mut delay = RecordingDelay::default();
        let mut panel = new_panel(&mut host, None, &mut delay);

        assert_eq!(panel.brightness(), BACKLIGHT_DEFAULT);
        assert_eq!(
            panel.set_brightness(BACKLIGHT_MAX + 1),
            Err(PanelError::InvalidBrightness(487))
        );
        panel.set_brightness(300).unwrap();
        assert_eq!(panel.brightness(), 300);
        assert_eq!(panel.get_brightness(), Ok(300));
        drop(panel);

        assert_eq!(
            host.ops,
            [
                Op::LowPower(false),
                Op::Dcs(DCS_SET_DISPLAY_BRIGHTNESS, vec![0x2C, 0x01]),
                Op::LowPower(true),
                Op::LowPower(false),
                Op::Read(DCS_GET_DISPLAY_BRIGHTNESS),
                Op::LowPower(true),
            ]
        );
    }

    #[test]
    fn test_mode_timing() {
        let mut host = FakeHost::default();
        let mut delay = RecordingDelay::default();
        let panel = new_panel(&mut host, None, &mut delay);

        let modes = panel.get_modes();
        assert_eq!(modes.len(), 1);
        let mode = modes[0];
        assert_eq!(mode.clock, 289_989);
        assert_eq!((mode.htotal, mode.vtotal), (1332, 2419));
        assert_eq!(mode.refresh_hz(), 90);
        assert!(mode.mode_type.contains(ModeType::DRIVER | ModeType::PREFERRED));
        assert_eq!(panel.link().lanes, 4);
    }
}
