//! MPL3115A2 register map, bit masks and the typed CTRL_REG1 value.
//!
//! Addresses and masks follow the Freescale/NXP MPL3115A2 datasheet
//! (Rev. 4.0, table 11 "Register address map").

use serde::{Deserialize, Serialize};

// =============================================================================
// I2C Address
// =============================================================================

/// 7-bit I2C address. The 8-bit write/read forms are 0xC0 / 0xC1.
pub const I2C_ADDR: u8 = 0x60;

/// Fixed value of the WHO_AM_I register.
pub const DEVICE_ID: u8 = 0xC4;

// =============================================================================
// Register Addresses
// =============================================================================

// Status and live data
pub const STATUS: u8 = 0x00;
pub const OUT_P_MSB: u8 = 0x01;
pub const OUT_P_CSB: u8 = 0x02;
pub const OUT_P_LSB: u8 = 0x03;
pub const OUT_T_MSB: u8 = 0x04;
pub const OUT_T_LSB: u8 = 0x05;
pub const DR_STATUS: u8 = 0x06;

// Delta data
pub const OUT_P_DELTA_MSB: u8 = 0x07;
pub const OUT_P_DELTA_CSB: u8 = 0x08;
pub const OUT_P_DELTA_LSB: u8 = 0x09;
pub const OUT_T_DELTA_MSB: u8 = 0x0A;
pub const OUT_T_DELTA_LSB: u8 = 0x0B;

// Identification and system
pub const WHO_AM_I: u8 = 0x0C;
pub const F_STATUS: u8 = 0x0D;
pub const F_DATA: u8 = 0x0E;
pub const F_SETUP: u8 = 0x0F;
pub const TIME_DLY: u8 = 0x10;
pub const SYSMOD: u8 = 0x11;
pub const INT_SOURCE: u8 = 0x12;
pub const PT_DATA_CFG: u8 = 0x13;

// Barometric reference, alarm targets and windows
pub const BAR_IN_MSB: u8 = 0x14;
pub const BAR_IN_LSB: u8 = 0x15;
pub const P_TGT_MSB: u8 = 0x16;
pub const P_TGT_LSB: u8 = 0x17;
pub const T_TGT: u8 = 0x18;
pub const P_WND_MSB: u8 = 0x19;
pub const P_WND_LSB: u8 = 0x1A;
pub const T_WND: u8 = 0x1B;

// Autonomously tracked extrema
pub const P_MIN_MSB: u8 = 0x1C;
pub const P_MIN_CSB: u8 = 0x1D;
pub const P_MIN_LSB: u8 = 0x1E;
pub const T_MIN_MSB: u8 = 0x1F;
pub const T_MIN_LSB: u8 = 0x20;
pub const P_MAX_MSB: u8 = 0x21;
pub const P_MAX_CSB: u8 = 0x22;
pub const P_MAX_LSB: u8 = 0x23;
pub const T_MAX_MSB: u8 = 0x24;
pub const T_MAX_LSB: u8 = 0x25;

// Control
pub const CTRL_REG1: u8 = 0x26;
pub const CTRL_REG2: u8 = 0x27;
pub const CTRL_REG3: u8 = 0x28;
pub const CTRL_REG4: u8 = 0x29;
pub const CTRL_REG5: u8 = 0x2A;

// User offsets
pub const OFF_P: u8 = 0x2B;
pub const OFF_T: u8 = 0x2C;
pub const OFF_H: u8 = 0x2D;

/// Highest implemented register address.
pub const LAST_REGISTER: u8 = OFF_H;

/// Address the device moves to after an access to `addr` when the host keeps
/// clocking bytes in one transaction.
///
/// Most registers increment by one; the live data, delta and offset banks
/// wrap back to the start of their group.
pub const fn auto_increment(addr: u8) -> u8 {
    match addr {
        OUT_T_LSB => STATUS,
        OUT_T_DELTA_LSB => DR_STATUS,
        F_DATA => F_DATA,
        OFF_H => WHO_AM_I,
        _ => addr.wrapping_add(1),
    }
}

// =============================================================================
// DR_STATUS / STATUS masks
// =============================================================================

pub const DR_PTOW: u8 = 0x80;
pub const DR_POW: u8 = 0x40;
pub const DR_TOW: u8 = 0x20;
pub const DR_PTDR: u8 = 0x08;
pub const DR_PDR: u8 = 0x04;
pub const DR_TDR: u8 = 0x02;

// =============================================================================
// CTRL_REG1 masks
// =============================================================================

/// Active (periodic sampling) when set, standby otherwise.
pub const CTRL_REG1_SBYB: u8 = 0x01;
/// One-shot trigger. Self-clears when the acquisition completes.
pub const CTRL_REG1_OST: u8 = 0x02;
/// Software reset. Self-clears after boot.
pub const CTRL_REG1_RST: u8 = 0x04;
/// Oversampling ratio field, bits [5:3].
pub const CTRL_REG1_OS_MASK: u8 = 0x38;
pub const CTRL_REG1_OS_SHIFT: u8 = 3;
/// Raw ADC output.
pub const CTRL_REG1_RAW: u8 = 0x40;
/// Altimeter mode when set, barometer mode otherwise.
pub const CTRL_REG1_ALT: u8 = 0x80;

// =============================================================================
// INT_SOURCE masks
// =============================================================================

pub const SRC_DRDY: u8 = 0x80;
pub const SRC_FIFO: u8 = 0x40;
pub const SRC_PW: u8 = 0x20;
pub const SRC_TW: u8 = 0x10;
pub const SRC_PTH: u8 = 0x08;
pub const SRC_TTH: u8 = 0x04;
pub const SRC_PCHG: u8 = 0x02;
pub const SRC_TCHG: u8 = 0x01;

// =============================================================================
// CTRL_REG3 / CTRL_REG4 / CTRL_REG5 masks
// =============================================================================

pub const CTRL_REG3_IPOL1: u8 = 0x20;
pub const CTRL_REG3_PP_OD1: u8 = 0x10;
pub const CTRL_REG3_IPOL2: u8 = 0x02;
pub const CTRL_REG3_PP_OD2: u8 = 0x01;

// The enable (CTRL_REG4) and routing (CTRL_REG5) registers share one layout.
pub const INT_DRDY: u8 = 0x80;
pub const INT_FIFO: u8 = 0x40;
pub const INT_PW: u8 = 0x20;
pub const INT_TW: u8 = 0x10;
pub const INT_PTH: u8 = 0x08;
pub const INT_TTH: u8 = 0x04;
pub const INT_PCHG: u8 = 0x02;
pub const INT_TCHG: u8 = 0x01;

// =============================================================================
// Enums
// =============================================================================

/// Which physical meaning the shared OUT_P / P_MIN / P_MAX / P_TGT registers
/// carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeviceMode {
    /// Registers hold absolute pressure in Pa. Power-on default.
    #[default]
    Barometer,
    /// Registers hold altitude in metres.
    Altimeter,
}

/// Oversampling ratio, CTRL_REG1 bits [5:3].
///
/// Higher ratios lower noise at the cost of acquisition time
/// (6 ms at 1x up to 512 ms at 128x).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Oversampling {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
}

impl Oversampling {
    /// Map a sample count to its ratio. Anything other than a power of two
    /// between 1 and 128 yields `None`.
    pub const fn from_ratio(ratio: u8) -> Option<Self> {
        match ratio {
            1 => Some(Self::X1),
            2 => Some(Self::X2),
            4 => Some(Self::X4),
            8 => Some(Self::X8),
            16 => Some(Self::X16),
            32 => Some(Self::X32),
            64 => Some(Self::X64),
            128 => Some(Self::X128),
            _ => None,
        }
    }

    /// Number of internal samples averaged per reading.
    pub const fn ratio(self) -> u8 {
        1 << (self as u8)
    }

    /// Convert from the 3-bit register field.
    pub const fn from_field(field: u8) -> Self {
        match field & 0x07 {
            0 => Self::X1,
            1 => Self::X2,
            2 => Self::X4,
            3 => Self::X8,
            4 => Self::X16,
            5 => Self::X32,
            6 => Self::X64,
            _ => Self::X128,
        }
    }
}

// =============================================================================
// CTRL_REG1 value object
// =============================================================================

/// Snapshot of CTRL_REG1.
///
/// The register packs the mode bit, the oversampling field, the one-shot and
/// reset triggers and the active/standby bit. Every setter returns a copy
/// with only its own bits changed, so a read-modify-write never disturbs
/// fields it does not own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CtrlReg1(pub u8);

impl CtrlReg1 {
    pub const fn bits(self) -> u8 {
        self.0
    }

    const fn with_flag(self, mask: u8, set: bool) -> Self {
        if set {
            Self(self.0 | mask)
        } else {
            Self(self.0 & !mask)
        }
    }

    pub const fn mode(self) -> DeviceMode {
        if self.0 & CTRL_REG1_ALT != 0 {
            DeviceMode::Altimeter
        } else {
            DeviceMode::Barometer
        }
    }

    pub const fn with_mode(self, mode: DeviceMode) -> Self {
        self.with_flag(CTRL_REG1_ALT, matches!(mode, DeviceMode::Altimeter))
    }

    pub const fn oversampling(self) -> Oversampling {
        Oversampling::from_field((self.0 & CTRL_REG1_OS_MASK) >> CTRL_REG1_OS_SHIFT)
    }

    pub const fn with_oversampling(self, os: Oversampling) -> Self {
        Self((self.0 & !CTRL_REG1_OS_MASK) | ((os as u8) << CTRL_REG1_OS_SHIFT))
    }

    /// An acquisition triggered through OST is still running.
    pub const fn one_shot_pending(self) -> bool {
        self.0 & CTRL_REG1_OST != 0
    }

    pub const fn with_one_shot(self) -> Self {
        self.with_flag(CTRL_REG1_OST, true)
    }

    pub const fn reset_pending(self) -> bool {
        self.0 & CTRL_REG1_RST != 0
    }

    pub const fn active(self) -> bool {
        self.0 & CTRL_REG1_SBYB != 0
    }

    pub const fn with_active(self, active: bool) -> Self {
        self.with_flag(CTRL_REG1_SBYB, active)
    }

    pub const fn raw_output(self) -> bool {
        self.0 & CTRL_REG1_RAW != 0
    }
}

// =============================================================================
// Status registers
// =============================================================================

/// Decoded STATUS / DR_STATUS register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataReadyStatus(pub u8);

impl DataReadyStatus {
    /// New pressure/altitude or temperature data is available.
    pub const fn any_ready(self) -> bool {
        self.0 & DR_PTDR != 0
    }

    pub const fn pressure_ready(self) -> bool {
        self.0 & DR_PDR != 0
    }

    pub const fn temperature_ready(self) -> bool {
        self.0 & DR_TDR != 0
    }

    /// A previous sample was overwritten before it was read.
    pub const fn any_overwritten(self) -> bool {
        self.0 & DR_PTOW != 0
    }

    pub const fn pressure_overwritten(self) -> bool {
        self.0 & DR_POW != 0
    }

    pub const fn temperature_overwritten(self) -> bool {
        self.0 & DR_TOW != 0
    }
}

/// Decoded INT_SOURCE register. All interrupt sources are ORed onto the
/// pins, so this is how the host tells them apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterruptSource(pub u8);

impl InterruptSource {
    pub const fn data_ready(self) -> bool {
        self.0 & SRC_DRDY != 0
    }

    pub const fn fifo(self) -> bool {
        self.0 & SRC_FIFO != 0
    }

    /// Reading is within target ± window for pressure/altitude.
    pub const fn pressure_window(self) -> bool {
        self.0 & SRC_PW != 0
    }

    pub const fn temperature_window(self) -> bool {
        self.0 & SRC_TW != 0
    }

    /// Reading crossed target, target - window or target + window.
    pub const fn pressure_threshold(self) -> bool {
        self.0 & SRC_PTH != 0
    }

    pub const fn temperature_threshold(self) -> bool {
        self.0 & SRC_TTH != 0
    }

    pub const fn pressure_change(self) -> bool {
        self.0 & SRC_PCHG != 0
    }

    pub const fn temperature_change(self) -> bool {
        self.0 & SRC_TCHG != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

/// Interrupt pin behaviour, enables and routing (CTRL_REG3..CTRL_REG5).
///
/// `routing` bits set to 1 send the matching source to INT1, 0 to INT2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InterruptConfig {
    pub pin_action: u8,
    pub enabled: u8,
    pub routing: u8,
}

impl InterruptConfig {
    /// Register image starting at CTRL_REG3, ready for one auto-increment write.
    pub const fn to_registers(self) -> [u8; 3] {
        [self.pin_action, self.enabled, self.routing]
    }
}
