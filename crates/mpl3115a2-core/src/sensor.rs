//! Typed sensor readings for data-logging hosts.
//!
//! Hosts that store fixed-size integer sample rows read the device through
//! [`Sensor`] instead of calling the session operations one by one.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use crate::codec::{PhysicalValue, Quantity};
use crate::device::Mpl3115a2;
use crate::error::Error;
use crate::registers::DeviceMode;

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array.
    fn to_array(self) -> [i32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, Error>>;
}

/// One pressure-or-altitude sample plus temperature, in thousandths of the
/// SI unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpl3115a2Readings {
    /// Which quantity `barometric_milli` holds.
    pub mode: DeviceMode,
    /// mPa in barometer mode, mm in altimeter mode.
    pub barometric_milli: i32,
    pub temperature_milli_celsius: i32,
}

impl SensorReadings<2> for Mpl3115a2Readings {
    fn to_array(self) -> [i32; 2] {
        [self.barometric_milli, self.temperature_milli_celsius]
    }
}

/// Convert to thousandths with integer arithmetic, truncating sub-milli
/// fraction steps.
pub fn to_milli(value: PhysicalValue) -> i32 {
    let fraction = (value.fraction() as i32 * 1000) >> value.fraction_bits();
    let whole = value.whole() * 1000;
    if value.whole() < 0 {
        whole - fraction
    } else {
        whole + fraction
    }
}

impl<I, D> Sensor<2> for Mpl3115a2<I, D>
where
    I: I2c,
    D: DelayNs,
{
    type Readings = Mpl3115a2Readings;

    /// Sample in the session's current mode, then temperature.
    async fn read(&mut self) -> Result<Mpl3115a2Readings, Error> {
        let mode = self.mode();
        let primary = match mode {
            DeviceMode::Barometer => Quantity::Pressure,
            DeviceMode::Altimeter => Quantity::Altitude,
        };

        let barometric = Mpl3115a2::read(self, primary).await?;
        let temperature = Mpl3115a2::read(self, Quantity::Temperature).await?;

        Ok(Mpl3115a2Readings {
            mode,
            barometric_milli: to_milli(barometric),
            temperature_milli_celsius: to_milli(temperature),
        })
    }
}
