//! Samsung S6E3FC3 AMOLED panel (AMS667YM01 module) on a MIPI-DSI link.

use bitflags::bitflags;

pub mod blocking;

/// Highest backlight level accepted by the panel.
pub const BACKLIGHT_MAX: u16 = 486;
/// Level restored at power-on.
pub const BACKLIGHT_DEFAULT: u16 = 486;

pub(crate) const DCS_ENTER_SLEEP_MODE: u8 = 0x10;
pub(crate) const DCS_EXIT_SLEEP_MODE: u8 = 0x11;
pub(crate) const DCS_SET_DISPLAY_OFF: u8 = 0x28;
pub(crate) const DCS_SET_DISPLAY_BRIGHTNESS: u8 = 0x51;
pub(crate) const DCS_GET_DISPLAY_BRIGHTNESS: u8 = 0x52;

pub(crate) const EXIT_SLEEP_DELAY_MS: u32 = 30;
pub(crate) const INIT_SETTLE_DELAY_MS: u32 = 90;
pub(crate) const DISPLAY_OFF_DELAY_MS: u32 = 20;
pub(crate) const ENTER_SLEEP_DELAY_MS: u32 = 120;

/// Generic-write packet: command byte plus parameters.
pub(crate) struct PanelCommand<'a> {
    pub(crate) addr: u8,
    pub(crate) params: &'a [u8],
}

/// Vendor register unlock for the power-down sequence.
pub(crate) const LEVEL2_KEY_UNLOCK: PanelCommand = PanelCommand {
    addr: 0x9F,
    params: &[0xA5, 0xA5],
};
pub(crate) const LEVEL2_KEY_LOCK: PanelCommand = PanelCommand {
    addr: 0x9F,
    params: &[0x5A, 0x5A],
};

/// Initialization sequence sent after exit-sleep.
pub(crate) const PANEL_INIT_CMDS: &[PanelCommand] = &[
    PanelCommand {
        addr: 0xF0,
        params: &[0x5A, 0x5A],
    }, // level 1 key unlock
    LEVEL2_KEY_UNLOCK,
    PanelCommand {
        addr: 0xF2,
        params: &[
            0x00, 0x05, 0x0E, 0x58, 0x54, 0x00, 0x0C, 0x00, 0x04, 0x30, 0xB8, 0x30, 0xB8, 0x0C,
            0x04, 0xBC, 0x26, 0xE8, 0x0C, 0x00, 0x04, 0x10, 0x00, 0x10, 0x26, 0xA8, 0x10, 0x00,
            0x10, 0x10, 0x34, 0x10, 0x00, 0x40, 0x30, 0xC8, 0x00, 0xC8, 0x00, 0x00, 0xCE,
        ],
    },
    PanelCommand {
        addr: 0xF7,
        params: &[0x0F],
    }, // update
    PanelCommand {
        addr: 0x35,
        params: &[0x00],
    }, // tearing effect on
    PanelCommand {
        addr: 0x2A,
        params: &[0x00, 0x00, 0x04, 0x37],
    }, // columns 0..1079
    PanelCommand {
        addr: 0x2B,
        params: &[0x00, 0x00, 0x09, 0x5F],
    }, // rows 0..2399
    PanelCommand {
        addr: 0xC2,
        params: &[0x1B, 0x41, 0xB0, 0x0E, 0x00, 0x3C, 0x5A, 0x00, 0x00],
    },
    PanelCommand {
        addr: 0xE5,
        params: &[0x15],
    },
    PanelCommand {
        addr: 0xED,
        params: &[0x44, 0x4C, 0x20],
    },
    PanelCommand {
        addr: 0xCC,
        params: &[0x5C, 0x51],
    },
    PanelCommand {
        addr: 0xB0,
        params: &[0x00, 0x27, 0xF2],
    }, // global parameter offset
    PanelCommand {
        addr: 0xF2,
        params: &[0x00],
    },
    PanelCommand {
        addr: 0xB0,
        params: &[0x00, 0x92, 0x63],
    },
    PanelCommand {
        addr: 0x63,
        params: &[0x04],
    },
    PanelCommand {
        addr: 0x60,
        params: &[0x08, 0x00],
    },
    PanelCommand {
        addr: 0xF7,
        params: &[0x0F],
    },
    LEVEL2_KEY_LOCK,
    PanelCommand {
        addr: 0xF0,
        params: &[0xA5, 0xA5],
    }, // level 1 key lock
];

/// DSI host the panel is attached to.
pub trait DsiHost {
    type Error: core::fmt::Debug;

    /// Generic long/short write of `cmd` followed by `params`.
    fn generic_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error>;

    /// DCS write of `cmd` followed by `params`.
    fn dcs_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error>;

    /// DCS read of `cmd` into `buf`.
    fn dcs_read(&mut self, cmd: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Send subsequent packets in low-power (LP) mode instead of HS mode.
    fn set_low_power_mode(&mut self, enable: bool);
}

impl<T: DsiHost + ?Sized> DsiHost for &mut T {
    type Error = T::Error;

    fn generic_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error> {
        T::generic_write(self, cmd, params)
    }

    fn dcs_write(&mut self, cmd: u8, params: &[u8]) -> Result<(), Self::Error> {
        T::dcs_write(self, cmd, params)
    }

    fn dcs_read(&mut self, cmd: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        T::dcs_read(self, cmd, buf)
    }

    fn set_low_power_mode(&mut self, enable: bool) {
        T::set_low_power_mode(self, enable)
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ModeType: u8 {
        const PREFERRED = 1 << 3;
        const DRIVER = 1 << 6;
    }
}

/// Video timing of one display mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayMode {
    /// Pixel clock in kHz.
    pub clock: u32,
    pub hdisplay: u16,
    pub hsync_start: u16,
    pub hsync_end: u16,
    pub htotal: u16,
    pub vdisplay: u16,
    pub vsync_start: u16,
    pub vsync_end: u16,
    pub vtotal: u16,
    pub width_mm: u16,
    pub height_mm: u16,
    pub mode_type: ModeType,
}

impl DisplayMode {
    /// Vertical refresh rate in Hz, rounded to nearest.
    pub fn refresh_hz(&self) -> u32 {
        let pixels = u32::from(self.htotal) * u32::from(self.vtotal);
        (self.clock * 1000 + pixels / 2) / pixels
    }
}

pub const S6E3FC3_MODE: DisplayMode = DisplayMode {
    clock: (1080 + 80 + 84 + 88) * (2400 + 15 + 2 + 2) * 90 / 1000,
    hdisplay: 1080,
    hsync_start: 1080 + 80,
    hsync_end: 1080 + 80 + 84,
    htotal: 1080 + 80 + 84 + 88,
    vdisplay: 2400,
    vsync_start: 2400 + 15,
    vsync_end: 2400 + 15 + 2,
    vtotal: 2400 + 15 + 2 + 2,
    width_mm: 70,
    height_mm: 155,
    mode_type: ModeType::DRIVER.union(ModeType::PREFERRED),
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PixelFormat {
    Rgb888,
}

/// DSI link parameters the host must configure before attaching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DsiLink {
    pub lanes: u8,
    pub format: PixelFormat,
}

pub const S6E3FC3_LINK: DsiLink = DsiLink {
    lanes: 4,
    format: PixelFormat::Rgb888,
};

/// Errors that can occur when driving the S6E3FC3
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelError<E> {
    /// DSI transfer failed.
    Dsi(E),
    /// The reset line could not be driven.
    PinError,
    /// Requested level is above [`BACKLIGHT_MAX`].
    InvalidBrightness(u16),
}

#[cfg(feature = "defmt")]
impl<E> defmt::Format for PanelError<E> {
    fn format(&self, f: defmt::Formatter) {
        match self {
            PanelError::Dsi(_) => defmt::write!(f, "Dsi"),
            PanelError::PinError => defmt::write!(f, "PinError"),
            PanelError::InvalidBrightness(level) => defmt::write!(f, "InvalidBrightness({})", level),
        }
    }
}
