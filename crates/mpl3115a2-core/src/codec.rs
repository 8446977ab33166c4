//! Register codec: fixed-point data registers to physical values, and
//! engineering inputs to packed register bytes.
//!
//! Everything here is pure. The device session owns all bus traffic and only
//! hands byte windows in and out of these functions.
//!
//! Data registers are left-aligned fixed-point fields, most significant byte
//! at the lowest address:
//!
//! | Quantity             | Bytes | Whole        | Fraction       |
//! |----------------------|-------|--------------|----------------|
//! | Pressure (live/min/max) | 3  | 18, unsigned | 2 (0.25 Pa)    |
//! | Pressure delta       | 3     | 18, signed   | 2 (0.25 Pa)    |
//! | Altitude (all banks) | 3     | 16, signed   | 4 (0.0625 m)   |
//! | Temperature (all)    | 2     | 8, signed    | 4 (0.0625 °C)  |

use serde::{Deserialize, Serialize};

/// Physical quantity handled by the sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Quantity {
    /// Absolute pressure in Pa (barometer mode).
    Pressure,
    /// Altitude in metres (altimeter mode).
    Altitude,
    /// Temperature in °C. Independent of the device mode.
    Temperature,
}

/// Which of the autonomously tracked extrema to access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Extremum {
    Min,
    Max,
}

// =============================================================================
// Bit layouts
// =============================================================================

/// Shape of a fixed-point data register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitLayout {
    pub whole_bits: u8,
    pub fraction_bits: u8,
    /// Whole part is two's complement.
    pub signed: bool,
}

impl BitLayout {
    /// OUT_P, P_MIN, P_MAX in barometer mode.
    pub const PRESSURE: Self = Self::new(18, 2, false);
    /// OUT_P_DELTA in barometer mode.
    pub const PRESSURE_DELTA: Self = Self::new(18, 2, true);
    /// OUT_P, OUT_P_DELTA, P_MIN, P_MAX in altimeter mode.
    pub const ALTITUDE: Self = Self::new(16, 4, true);
    /// OUT_T, OUT_T_DELTA, T_MIN, T_MAX.
    pub const TEMPERATURE: Self = Self::new(8, 4, true);

    pub const fn new(whole_bits: u8, fraction_bits: u8, signed: bool) -> Self {
        Self {
            whole_bits,
            fraction_bits,
            signed,
        }
    }

    pub const fn total_bits(self) -> u8 {
        self.whole_bits + self.fraction_bits
    }

    /// Number of register bytes the field spans.
    pub const fn byte_count(self) -> usize {
        (self.total_bits() as usize).div_ceil(8)
    }

    /// Unused low-order bits in the last byte.
    const fn padding_bits(self) -> u32 {
        (self.byte_count() * 8) as u32 - self.total_bits() as u32
    }

    /// Layout of the live / min / max bank for `kind`.
    pub const fn for_sample(kind: Quantity) -> Self {
        match kind {
            Quantity::Pressure => Self::PRESSURE,
            Quantity::Altitude => Self::ALTITUDE,
            Quantity::Temperature => Self::TEMPERATURE,
        }
    }

    /// Layout of the delta bank for `kind`.
    pub const fn for_delta(kind: Quantity) -> Self {
        match kind {
            Quantity::Pressure => Self::PRESSURE_DELTA,
            Quantity::Altitude => Self::ALTITUDE,
            Quantity::Temperature => Self::TEMPERATURE,
        }
    }

    const fn whole_min(self) -> i32 {
        if self.signed {
            -(1 << (self.whole_bits - 1))
        } else {
            0
        }
    }

    const fn whole_max(self) -> i32 {
        if self.signed {
            (1 << (self.whole_bits - 1)) - 1
        } else {
            (1 << self.whole_bits) - 1
        }
    }
}

// =============================================================================
// Physical values
// =============================================================================

/// A decoded register value: a signed whole part plus an unsigned fraction
/// counted in steps of `2^-fraction_bits`.
///
/// The fraction always moves the value away from zero: a negative whole part
/// has its fraction subtracted, so `-3` with a fraction of `0.25` reads as
/// `-3.25`. This is how the device reports negative readings and must not be
/// "fixed" into plain two's complement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicalValue {
    whole: i32,
    fraction: u16,
    fraction_bits: u8,
}

impl PhysicalValue {
    pub const fn new(whole: i32, fraction: u16, fraction_bits: u8) -> Self {
        Self {
            whole,
            fraction: fraction & ((1 << fraction_bits) - 1),
            fraction_bits,
        }
    }

    pub const fn whole(self) -> i32 {
        self.whole
    }

    /// Fraction as a count of quanta.
    pub const fn fraction(self) -> u16 {
        self.fraction
    }

    pub const fn fraction_bits(self) -> u8 {
        self.fraction_bits
    }

    /// Size of one fraction quantum (0.25 or 0.0625).
    pub fn step(self) -> f32 {
        1.0 / (1u32 << self.fraction_bits) as f32
    }

    pub fn as_f32(self) -> f32 {
        let whole = self.whole as f32;
        let fraction = self.fraction as f32 * self.step();
        if self.whole < 0 {
            whole - fraction
        } else {
            whole + fraction
        }
    }

    /// Quantize a reading into `layout`, truncating toward zero and
    /// saturating at the register limits.
    ///
    /// Inverse of [`PhysicalValue::as_f32`] for values with a non-zero whole
    /// part; `-0.5` has no representation and comes back as `+0.5`.
    pub fn from_f32(value: f32, layout: BitLayout) -> Self {
        let truncated = value as i32;
        let whole = truncated.clamp(layout.whole_min(), layout.whole_max());
        let max_fraction = (1u32 << layout.fraction_bits) - 1;

        let fraction = if whole != truncated {
            // Saturated: pin to the register limit on the same side.
            if whole == 0 { 0 } else { max_fraction }
        } else {
            let magnitude = if value < 0.0 { -value } else { value };
            let remainder = (magnitude - whole.unsigned_abs() as f32).clamp(0.0, 1.0);
            ((remainder * (1u32 << layout.fraction_bits) as f32) as u32).min(max_fraction)
        };

        Self::new(whole, fraction as u16, layout.fraction_bits)
    }
}

impl From<PhysicalValue> for f32 {
    fn from(value: PhysicalValue) -> Self {
        value.as_f32()
    }
}

/// Sign-extend the low `bits` bits of `raw` into an `i32`.
pub const fn sign_extend(raw: u32, bits: u8) -> i32 {
    let shift = u32::BITS - bits as u32;
    ((raw << shift) as i32) >> shift
}

/// Decode a data register window.
///
/// `raw` must hold at least `layout.byte_count()` bytes; extra bytes are
/// ignored.
pub fn decode(raw: &[u8], layout: BitLayout) -> PhysicalValue {
    let field = raw
        .iter()
        .take(layout.byte_count())
        .fold(0u32, |acc, &byte| (acc << 8) | byte as u32)
        >> layout.padding_bits();

    let fraction_mask = (1u32 << layout.fraction_bits) - 1;
    let fraction = (field & fraction_mask) as u16;
    let whole_field = field >> layout.fraction_bits;

    let whole = if layout.signed {
        sign_extend(whole_field, layout.whole_bits)
    } else {
        whole_field as i32
    };

    PhysicalValue::new(whole, fraction, layout.fraction_bits)
}

/// Pack `value` into the register image for `layout`. Writes
/// `layout.byte_count()` bytes into `out`.
pub fn encode_sample(value: PhysicalValue, layout: BitLayout, out: &mut [u8]) {
    let whole_mask = (1u32 << layout.whole_bits) - 1;
    let fraction =
        ((value.fraction as u32) << layout.fraction_bits) >> value.fraction_bits;
    let field = (((value.whole as u32) & whole_mask) << layout.fraction_bits) | fraction;
    let aligned = field << layout.padding_bits();

    let count = layout.byte_count();
    for (i, byte) in out.iter_mut().take(count).enumerate() {
        *byte = (aligned >> (8 * (count - 1 - i))) as u8;
    }
}

// =============================================================================
// Operating ranges
// =============================================================================

/// Inclusive range of valid engineering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatingRange {
    pub min: i32,
    pub max: i32,
}

impl OperatingRange {
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    pub const fn contains(self, value: i32) -> bool {
        value >= self.min && value <= self.max
    }

    pub const fn clamp(self, value: i32) -> i32 {
        if value < self.min {
            self.min
        } else if value > self.max {
            self.max
        } else {
            value
        }
    }
}

/// Pressure alarm targets, windows and the barometric reference (Pa).
pub const PRESSURE_RANGE: OperatingRange = OperatingRange::new(50_000, 110_000);
/// Altitude alarm targets and windows (m).
pub const ALTITUDE_RANGE: OperatingRange = OperatingRange::new(-550, 5_000);
/// Temperature alarm targets and windows (°C).
pub const TEMPERATURE_RANGE: OperatingRange = OperatingRange::new(-40, 85);

impl Quantity {
    /// Range an alarm target, and target ± window, must stay within.
    pub const fn alarm_range(self) -> OperatingRange {
        match self {
            Self::Pressure => PRESSURE_RANGE,
            Self::Altitude => ALTITUDE_RANGE,
            Self::Temperature => TEMPERATURE_RANGE,
        }
    }

    /// Range accepted by the user offset register, in engineering units.
    pub const fn offset_range(self) -> (f32, f32) {
        match self {
            Self::Pressure => (-512.0, 508.0),
            Self::Altitude => (-128.0, 127.0),
            Self::Temperature => (-8.0, 7.9375),
        }
    }

    /// Engineering units per offset register LSB.
    pub const fn offset_step(self) -> f32 {
        match self {
            Self::Pressure => 4.0,
            Self::Altitude => 1.0,
            Self::Temperature => 0.0625,
        }
    }

    pub const fn unit(self) -> &'static str {
        match self {
            Self::Pressure => "Pa",
            Self::Altitude => "m",
            Self::Temperature => "°C",
        }
    }
}

// =============================================================================
// User offsets (OFF_P, OFF_H, OFF_T)
// =============================================================================

/// Clamp `value` to the offset range of `kind` and scale it into the signed
/// offset byte, truncating toward zero.
pub fn encode_offset(kind: Quantity, value: f32) -> u8 {
    let (min, max) = kind.offset_range();
    let steps = value.clamp(min, max) / kind.offset_step();
    steps as i8 as u8
}

pub fn decode_offset(kind: Quantity, raw: u8) -> f32 {
    raw as i8 as f32 * kind.offset_step()
}

// =============================================================================
// Alarm targets (P_TGT, T_TGT)
// =============================================================================

/// Pressure target in 2 Pa units, big-endian.
pub fn encode_pressure_target(pascals: i32) -> [u8; 2] {
    ((PRESSURE_RANGE.clamp(pascals) / 2) as u16).to_be_bytes()
}

pub fn decode_pressure_target(raw: [u8; 2]) -> i32 {
    u16::from_be_bytes(raw) as i32 * 2
}

/// Altitude target in metres, two's complement big-endian.
pub fn encode_altitude_target(metres: i32) -> [u8; 2] {
    (ALTITUDE_RANGE.clamp(metres) as i16).to_be_bytes()
}

pub fn decode_altitude_target(raw: [u8; 2]) -> i32 {
    i16::from_be_bytes(raw) as i32
}

pub fn encode_temperature_target(celsius: i32) -> u8 {
    TEMPERATURE_RANGE.clamp(celsius) as i8 as u8
}

pub fn decode_temperature_target(raw: u8) -> i32 {
    raw as i8 as i32
}

// =============================================================================
// Alarm windows (P_WND, T_WND)
// =============================================================================

/// Window the device should actually be given for `target`.
///
/// Negative requests become zero. A window that would put `target - window`
/// or `target + window` outside the operating range of `kind`, or that
/// equals the target, is replaced by zero so the alarm degenerates to a
/// single trigger at the target.
pub const fn constrain_window(kind: Quantity, target: i32, window: i32) -> i32 {
    let window = if window < 0 { 0 } else { window };
    let range = kind.alarm_range();
    let (low, high) = (target as i64 - window as i64, target as i64 + window as i64);

    if low < range.min as i64 || high > range.max as i64 || window == target {
        0
    } else {
        window
    }
}

/// Pressure window in 2 Pa units, big-endian.
pub fn encode_pressure_window(pascals: i32) -> [u8; 2] {
    ((pascals.clamp(0, u16::MAX as i32 * 2) / 2) as u16).to_be_bytes()
}

pub fn decode_pressure_window(raw: [u8; 2]) -> i32 {
    u16::from_be_bytes(raw) as i32 * 2
}

pub fn encode_altitude_window(metres: i32) -> [u8; 2] {
    (metres.clamp(0, u16::MAX as i32) as u16).to_be_bytes()
}

pub fn decode_altitude_window(raw: [u8; 2]) -> i32 {
    u16::from_be_bytes(raw) as i32
}

pub fn encode_temperature_window(celsius: i32) -> u8 {
    celsius.clamp(0, u8::MAX as i32) as u8
}

pub fn decode_temperature_window(raw: u8) -> i32 {
    raw as i32
}

// =============================================================================
// Barometric reference (BAR_IN)
// =============================================================================

/// Sea-level equivalent pressure used for altitude calculation, in 2 Pa
/// units, big-endian. Power-on default is 101 326 Pa.
pub fn encode_barometric_reference(pascals: u32) -> [u8; 2] {
    let clamped = pascals.clamp(PRESSURE_RANGE.min as u32, PRESSURE_RANGE.max as u32);
    ((clamped / 2) as u16).to_be_bytes()
}

pub fn decode_barometric_reference(raw: [u8; 2]) -> u32 {
    u16::from_be_bytes(raw) as u32 * 2
}
