use core::cell::RefCell;
use core::fmt::Write;

use bitflags::bitflags;
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use embedded_hal::i2c::{Error as _, I2c};

use super::contact::{ContactOutcome, ContactReport, ContactTable, ReportKind};
use super::event::{left_event_count, CoordinateEvent, Event, Frame, StatusEvent, StatusKind};
use super::input::{InputSink, Key, SlotEvent};
use super::*;
use crate::register::BlockingRegisterDevice;

bitflags! {
    /// Device-reported conditions seen since the last
    /// [`Fts5cu56a::take_device_status`].
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct DeviceStatus: u8 {
        const QUEUE_FULL = 1 << 0;
        const ESD = 1 << 1;
        const CORE_ERROR = 1 << 2;
        const IC_RESET = 1 << 3;
        const WET_MODE = 1 << 4;
        const NOISE_MODE = 1 << 5;
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for DeviceStatus {
    fn format(&self, f: defmt::Formatter) {
        self.iter_names().for_each(|(name, _)| {
            defmt::write!(f, "{} ", name);
        });
    }
}

/// Read-only and read-write attributes exposed to the diagnostic surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Attribute {
    ChipId,
    ChipVersion,
    FwVersion,
    ConfigId,
    ConfigVersion,
    Status,
    HoverEnable,
}

impl Attribute {
    pub const ALL: [Attribute; 7] = [
        Attribute::ChipId,
        Attribute::ChipVersion,
        Attribute::FwVersion,
        Attribute::ConfigId,
        Attribute::ConfigVersion,
        Attribute::Status,
        Attribute::HoverEnable,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Attribute::ChipId => "chip_id",
            Attribute::ChipVersion => "chip_version",
            Attribute::FwVersion => "fw_ver",
            Attribute::ConfigId => "config_id",
            Attribute::ConfigVersion => "config_version",
            Attribute::Status => "status",
            Attribute::HoverEnable => "hover_enable",
        }
    }

    pub fn is_writable(self) -> bool {
        self == Attribute::HoverEnable
    }
}

/// Snapshot of the contact counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchStats {
    pub touch_count: u32,
    pub multi_count: u32,
    pub all_finger_count: u32,
}

struct Inner<I2C, S, PWR, LED, DELAY> {
    dev: BlockingRegisterDevice<I2C>,
    sink: S,
    supply: Option<PWR>,
    /// Touch-key LED supply, only kept when touch keys are wired.
    led: Option<LED>,
    led_on: bool,
    delay: DELAY,
    contacts: ContactTable,
    info: DeviceInfo,
    device_status: DeviceStatus,
    frames: [u8; EVENT_SIZE * FIFO_MAX],
    use_key: bool,
    hover_enabled: bool,
    running: bool,
    irq_enabled: bool,
}

/// FTS5CU56A driver.
///
/// All state sits behind one lock, so the interrupt path and the
/// configuration calls can be issued from different contexts through `&self`.
/// The bus is blocking; pick a raw mutex that may be held across it.
pub struct Fts5cu56a<M, I2C, S, PWR, LED, DELAY> {
    inner: Mutex<M, RefCell<Inner<I2C, S, PWR, LED, DELAY>>>,
}

impl<M, I2C, S, PWR, LED, DELAY> Fts5cu56a<M, I2C, S, PWR, LED, DELAY>
where
    M: RawMutex,
    I2C: I2c,
    S: InputSink,
    PWR: OutputPin,
    LED: OutputPin,
    DELAY: DelayNs,
{
    /// Create a new FTS5CU56A instance. The device stays untouched until
    /// [`power_on`](Self::power_on).
    ///
    /// `led` drives the touch-key backlight supply; it is ignored unless
    /// `config.use_key` is set.
    pub fn new(
        i2c: I2C,
        sink: S,
        supply: Option<PWR>,
        led: Option<LED>,
        delay: DELAY,
        config: TouchConfig,
    ) -> Self {
        let led = if config.use_key { led } else { None };
        if config.use_key && led.is_none() {
            warn!("fts5cu56a: unable to use touchkey leds");
        }
        Self {
            inner: Mutex::new(RefCell::new(Inner {
                dev: BlockingRegisterDevice::new(i2c, config.address),
                sink,
                supply,
                led,
                led_on: false,
                delay,
                contacts: ContactTable::new(),
                info: DeviceInfo::default(),
                device_status: DeviceStatus::empty(),
                frames: [0u8; EVENT_SIZE * FIFO_MAX],
                use_key: config.use_key,
                hover_enabled: config.hover_enabled,
                running: false,
                irq_enabled: false,
            })),
        }
    }

    /// Service one interrupt: drain the event queue, apply every frame and
    /// emit one synchronised multi-touch frame.
    ///
    /// Returns the number of frames processed. Only a failure of the first
    /// read is returned; everything after it is best-effort.
    pub fn handle_interrupt(&self) -> Result<usize, TouchSensorError> {
        self.inner.lock(|inner| inner.borrow_mut().drain_events())
    }

    /// Enable the supplies, read the identification blocks and start
    /// scanning. The interrupt is serviced from here on.
    pub fn power_on(&self) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            let result = inner.power_on();
            if result.is_err() {
                inner.irq_enabled = false;
            }
            result
        })
    }

    pub fn power_off(&self) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| inner.borrow_mut().power_off())
    }

    /// Input device opened: start multi-touch sensing.
    pub fn open(&self) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            inner.dev.write_byte(CMD_MS_MT_SENSE_ON)?;
            inner.running = true;

            if inner.hover_enabled && inner.dev.write_byte(CMD_SS_HOVER_SENSE_ON).is_err() {
                warn!("fts5cu56a: failed to enable hover");
            }
            // Touch screen stays usable without the keys
            if inner.use_key && inner.dev.write_byte(CMD_MS_KEY_SENSE_ON).is_err() {
                warn!("fts5cu56a: failed to enable touchkey");
            }
            Ok(())
        })
    }

    /// Input device closed: stop sensing. Failures are only logged.
    pub fn close(&self) {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if let Err(e) = inner.dev.write_byte(CMD_MS_MT_SENSE_OFF) {
                warn!("fts5cu56a: failed to disable touchscreen: {:?}", e.kind());
            }
            inner.running = false;

            if inner.hover_enabled {
                if let Err(e) = inner.dev.write_byte(CMD_SS_HOVER_SENSE_OFF) {
                    warn!("fts5cu56a: failed to disable hover: {:?}", e.kind());
                }
            }
            if inner.use_key {
                if let Err(e) = inner.dev.write_byte(CMD_MS_KEY_SENSE_OFF) {
                    warn!("fts5cu56a: failed to disable touchkey: {:?}", e.kind());
                }
            }
        })
    }

    /// System sleep: cut power.
    pub fn suspend(&self) -> Result<(), TouchSensorError> {
        self.power_off()
    }

    /// System wake: full power-on sequence.
    pub fn resume(&self) -> Result<(), TouchSensorError> {
        self.power_on()
    }

    pub fn runtime_suspend(&self) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            inner.borrow_mut().dev.write_byte(CMD_SLEEP_IN).map_err(|e| {
                warn!("fts5cu56a: failed to suspend device: {:?}", e.kind());
                e.into()
            })
        })
    }

    pub fn runtime_resume(&self) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            inner.borrow_mut().dev.write_byte(CMD_SLEEP_OUT).map_err(|e| {
                error!("fts5cu56a: failed to resume device: {:?}", e.kind());
                e.into()
            })
        })
    }

    /// Identification cached at the last power-on.
    pub fn device_info(&self) -> DeviceInfo {
        self.inner.lock(|inner| inner.borrow().info)
    }

    pub fn chip_id(&self) -> u16 {
        self.device_info().chip_id
    }

    pub fn chip_version(&self) -> u8 {
        self.device_info().chip_version
    }

    pub fn fw_version(&self) -> u16 {
        self.device_info().fw_version
    }

    pub fn config_id(&self) -> u8 {
        self.device_info().config_id
    }

    pub fn config_version(&self) -> u8 {
        self.device_info().config_version
    }

    pub fn stats(&self) -> TouchStats {
        self.inner.lock(|inner| {
            let inner = inner.borrow();
            TouchStats {
                touch_count: inner.contacts.count(),
                multi_count: inner.contacts.multi_count(),
                all_finger_count: inner.contacts.all_finger_count(),
            }
        })
    }

    /// Return and clear the conditions reported by the controller.
    pub fn take_device_status(&self) -> DeviceStatus {
        self.inner.lock(|inner| core::mem::take(&mut inner.borrow_mut().device_status))
    }

    /// Raw status byte, read from the device.
    pub fn read_status(&self) -> Result<u8, TouchSensorError> {
        self.inner.lock(|inner| {
            let mut status = [0u8; 4];
            inner
                .borrow_mut()
                .dev
                .read_register_buffer(CMD_READ_STATUS, &mut status)?;
            Ok(status[0])
        })
    }

    /// Touch-key LED state last set successfully.
    pub fn touchkey_led(&self) -> bool {
        self.inner.lock(|inner| inner.borrow().led_on)
    }

    /// Switch the touch-key LED supply. Without an LED this does nothing.
    pub fn set_touchkey_led(&self, on: bool) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            let inner = &mut *inner;
            let Some(led) = inner.led.as_mut() else {
                return Ok(());
            };
            if on == inner.led_on {
                return Ok(());
            }
            let result = if on { led.set_high() } else { led.set_low() };
            if result.is_err() {
                warn!("fts5cu56a: failed to switch ledvdd");
                return Err(TouchSensorError::LedError);
            }
            inner.led_on = on;
            Ok(())
        })
    }

    pub fn hover_enabled(&self) -> bool {
        self.inner.lock(|inner| inner.borrow().hover_enabled)
    }

    /// Toggle hover sensing. The command is only sent while the device is
    /// running; the flag changes only if that command succeeded.
    pub fn set_hover_enabled(&self, enable: bool) -> Result<(), TouchSensorError> {
        self.inner.lock(|inner| {
            let mut inner = inner.borrow_mut();
            if enable && inner.hover_enabled {
                return Ok(());
            }
            if inner.running {
                let cmd = if enable {
                    CMD_SS_HOVER_SENSE_ON
                } else {
                    CMD_SS_HOVER_SENSE_OFF
                };
                inner.dev.write_byte(cmd)?;
            }
            inner.hover_enabled = enable;
            Ok(())
        })
    }

    /// Render an attribute the way the sysfs surface presents it.
    pub fn show<W: Write>(&self, attr: Attribute, out: &mut W) -> Result<(), TouchSensorError> {
        let info = self.device_info();
        match attr {
            Attribute::ChipId => write_alt_hex(out, u32::from(info.chip_id)),
            Attribute::ChipVersion => writeln!(out, "{}", info.chip_version),
            Attribute::FwVersion => writeln!(out, "{}", info.fw_version),
            Attribute::ConfigId => write_alt_hex(out, u32::from(info.config_id)),
            Attribute::ConfigVersion => writeln!(out, "{}", info.config_version),
            Attribute::Status => {
                let status = self.read_status()?;
                write_alt_hex(out, u32::from(status))
            }
            Attribute::HoverEnable => writeln!(out, "{}", u8::from(self.hover_enabled())),
        }
        .map_err(|_| TouchSensorError::FormatError)
    }

    /// Parse and apply a write to a writable attribute.
    pub fn store(&self, attr: Attribute, input: &str) -> Result<(), TouchSensorError> {
        match attr {
            Attribute::HoverEnable => {
                let value = parse_unsigned(input).ok_or(TouchSensorError::InvalidInput)?;
                self.set_hover_enabled(value != 0)
            }
            _ => Err(TouchSensorError::InvalidInput),
        }
    }
}

/// `%#x`: zero has no prefix.
fn write_alt_hex<W: Write>(out: &mut W, value: u32) -> core::fmt::Result {
    if value == 0 {
        writeln!(out, "0")
    } else {
        writeln!(out, "{:#x}", value)
    }
}

/// Unsigned integer with C-style radix detection (`0x` hex, leading `0`
/// octal, decimal otherwise). One trailing newline is accepted.
fn parse_unsigned(input: &str) -> Option<u64> {
    let s = input.strip_suffix('\n').unwrap_or(input);
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if s.len() > 1 && s.starts_with('0') {
        u64::from_str_radix(&s[1..], 8).ok()
    } else {
        s.parse().ok()
    }
}

/// Coarse screen-edge position for logs: E/C/e across, S/C/N along.
fn location(x: u16, y: u16) -> (&'static str, &'static str) {
    let column = if x < 60 {
        "E."
    } else if x < MAX_COORD - 60 {
        "C."
    } else {
        "e."
    };
    let row = if y < 48 {
        "S"
    } else if y < MAX_COORD - 96 {
        "C"
    } else {
        "N"
    };
    (column, row)
}

impl<I2C, S, PWR, LED, DELAY> Inner<I2C, S, PWR, LED, DELAY>
where
    I2C: I2c,
    S: InputSink,
    PWR: OutputPin,
    DELAY: DelayNs,
{
    fn power_on(&mut self) -> Result<(), TouchSensorError> {
        if let Some(supply) = self.supply.as_mut() {
            supply.set_high().map_err(|_| TouchSensorError::SupplyError)?;
        }
        // Reset time is below 10ms
        self.delay.delay_ms(POWER_ON_DELAY_MS);

        let mut reg = [0u8; 8];
        self.dev.read_register_buffer(CMD_READ_FW_VERSION, &mut reg)?;
        self.info.fw_version = u16::from_be_bytes([reg[0], reg[1]]);
        self.info.config_id = 0;
        self.info.config_version = reg[3];
        info!("fts5cu56a: fw_ver {:x}", self.info.fw_version);

        self.dev.read_register_buffer(CMD_READ_DEVICE_ID, &mut reg)?;
        self.info.chip_id = u16::from_be_bytes([reg[2], reg[3]]);
        self.info.chip_version = reg[4];

        self.dev.write_register(&SYSTEM_RESET_CMD)?;
        self.delay.delay_ms(POWER_ON_DELAY_MS);

        self.irq_enabled = true;

        self.dev.write_register(&TOUCH_TYPE_CMD)?;
        self.dev.write_byte(CMD_FORCE_CALIBRATION)?;
        self.dev.write_byte(CMD_CLEAR_ALL_EVENT)?;
        self.dev.write_register(&SCAN_ENABLE_CMD)?;
        Ok(())
    }

    fn power_off(&mut self) -> Result<(), TouchSensorError> {
        self.irq_enabled = false;
        if let Some(supply) = self.supply.as_mut() {
            supply.set_low().map_err(|_| TouchSensorError::SupplyError)?;
        }
        Ok(())
    }

    fn drain_events(&mut self) -> Result<usize, TouchSensorError> {
        if !self.irq_enabled {
            debug!("fts5cu56a: interrupt while powered down");
            return Ok(0);
        }

        self.frames.fill(0);
        if let Err(e) = self
            .dev
            .read_register_buffer(CMD_READ_ONE_EVENT, &mut self.frames[..EVENT_SIZE])
        {
            error!("fts5cu56a: failed to read event: {:?}", e.kind());
            return Err(e.into());
        }

        let mut first = [0u8; EVENT_SIZE];
        first.copy_from_slice(&self.frames[..EVENT_SIZE]);
        let mut left_event = i32::from(left_event_count(&first)).min(FIFO_MAX as i32 - 1);

        if left_event > 0 {
            let end = EVENT_SIZE * (left_event as usize + 1);
            if let Err(e) = self
                .dev
                .read_register_buffer(CMD_READ_ALL_EVENT, &mut self.frames[EVENT_SIZE..end])
            {
                warn!("fts5cu56a: failed to read queued events: {:?}", e.kind());
                self.frames[EVENT_SIZE..].fill(0);
                left_event = 0;
            }
        }

        // Runs until the counter goes negative, i.e. left_event + 1 frames
        let mut event_num = 0usize;
        loop {
            let start = event_num * EVENT_SIZE;
            let mut frame: Frame = [0u8; EVENT_SIZE];
            frame.copy_from_slice(&self.frames[start..start + EVENT_SIZE]);
            self.process_frame(event_num, &frame);

            event_num += 1;
            left_event -= 1;
            if left_event < 0 {
                break;
            }
        }

        self.sink.sync();
        Ok(event_num)
    }

    fn process_frame(&mut self, index: usize, frame: &Frame) {
        trace!("fts5cu56a: [{}] {:?}", index, &frame[..8]);

        match Event::decode(frame) {
            Event::Coordinate(coord) => self.apply_coordinate(&coord),
            Event::Status(status) => self.record_status(&status, frame),
            Event::Gesture(gesture) => {
                debug!(
                    "fts5cu56a: [GESTURE] type:{:x} sf:{:x} id:{:x} | {:?}",
                    gesture.gesture_type,
                    gesture.sf,
                    gesture.gesture_id,
                    gesture.data
                );
            }
            Event::Vendor(raw) => debug!("fts5cu56a: echo event {:?}", raw),
            Event::Unknown(raw) => debug!("fts5cu56a: unknown event {:?}", raw),
        }
    }

    fn record_status(&mut self, status: &StatusEvent, frame: &Frame) {
        if u8::from(status.status_type) > 0 {
            debug!("fts5cu56a: STATUS {:?}", &frame[..8]);
        }

        match status.kind() {
            StatusKind::Error(ErrorCode::QueueFull) => {
                warn!("fts5cu56a: IC event queue is full");
                self.device_status |= DeviceStatus::QUEUE_FULL;
            }
            StatusKind::Error(ErrorCode::Esd) => {
                warn!("fts5cu56a: ESD detected, reset required");
                self.device_status |= DeviceStatus::ESD;
            }
            StatusKind::Error(ErrorCode::CoreError) => {
                warn!("fts5cu56a: core error {:?}", status.data);
                self.device_status |= DeviceStatus::CORE_ERROR;
            }
            StatusKind::Information(InfoCode::Ready) if status.is_ic_reset() => {
                info!("fts5cu56a: IC reset");
                self.device_status |= DeviceStatus::IC_RESET;
            }
            StatusKind::Information(InfoCode::WetMode) => {
                debug!("fts5cu56a: wet mode {}", status.data[0]);
                self.device_status |= DeviceStatus::WET_MODE;
            }
            StatusKind::Information(InfoCode::NoiseMode) => {
                debug!("fts5cu56a: noise mode {}", status.data[0]);
                self.device_status |= DeviceStatus::NOISE_MODE;
            }
            _ => {}
        }
    }

    fn apply_coordinate(&mut self, coord: &CoordinateEvent) {
        let report = match self.contacts.apply_coordinate(coord) {
            ContactOutcome::Report(report) => report,
            ContactOutcome::Suppressed(reason) => {
                debug!("fts5cu56a: tID:{} dropped: {:?}", coord.touch_id, reason);
                return;
            }
        };

        self.sink.report_slot(&SlotEvent::from(&report));
        match report.kind {
            ReportKind::Down | ReportKind::Move => {
                self.sink.report_key(Key::Touch, true);
                self.sink.report_key(Key::ToolFinger, true);
            }
            ReportKind::Up if !report.touch_present => {
                self.sink.report_key(Key::Touch, false);
                self.sink.report_key(Key::ToolFinger, false);
            }
            ReportKind::Up => {}
        }

        self.log_report(&report);
    }

    fn log_report(&self, report: &ContactReport) {
        let Some(slot) = self.contacts.slot(report.slot) else {
            return;
        };
        let (column, row) = location(report.x, report.y);
        match report.kind {
            ReportKind::Down => debug!(
                "fts5cu56a: [P] tID:{} x:{} y:{} z:{} major:{} minor:{} loc:{}{} tc:{} type:{} p:{} nlvl:{} maxS:{} hid:{}",
                report.slot,
                report.x,
                report.y,
                slot.z,
                report.major,
                report.minor,
                column,
                row,
                self.contacts.count(),
                u8::from(slot.touch_type),
                slot.palm_count,
                slot.noise_level,
                slot.max_strength,
                slot.hover_id_num
            ),
            ReportKind::Up => debug!(
                "fts5cu56a: [R] tID:{} loc:{}{} dd:{},{} tc:{} lx:{} ly:{} mx:{} my:{}",
                report.slot,
                column,
                row,
                i32::from(slot.x) - i32::from(slot.p_x),
                i32::from(slot.y) - i32::from(slot.p_y),
                self.contacts.count(),
                slot.x,
                slot.y,
                slot.max_energy_x,
                slot.max_energy_y
            ),
            ReportKind::Move => {}
        }

        if slot.touch_type != slot.prev_touch_type {
            debug!(
                "fts5cu56a: tID:{} ttype({}->{}) : {}",
                report.slot,
                slot.prev_touch_type.mnemonic(),
                slot.touch_type.mnemonic(),
                match report.kind {
                    ReportKind::Down => Action::Press.mnemonic(),
                    ReportKind::Move => Action::Move.mnemonic(),
                    ReportKind::Up => Action::Release.mnemonic(),
                }
            );
        }
    }
}
