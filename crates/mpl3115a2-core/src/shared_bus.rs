//! One async I2C bus, several owners.
//!
//! The MPL3115A2 usually sits on a bus with other sensors. Each owner gets
//! a [`SharedI2cDevice`] handle from `embassy-embedded-hal`; the bus mutex is
//! held for the whole of a transaction so a register-pointer write and its
//! repeated-start read are never split by another owner.
//!
//! ```ignore
//! static BUS: StaticCell<SharedBus<Board::I2c>> = StaticCell::new();
//! let bus = BUS.init(Mutex::new(i2c));
//!
//! let mut baro = Mpl3115a2::new(SharedI2cDevice::new(bus), delay);
//! let other = OtherSensor::new(SharedI2cDevice::new(bus));
//! ```

use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;

/// Bus type shared between handles.
pub type SharedBus<T> = Mutex<CriticalSectionRawMutex, T>;

/// Handle to a [`SharedBus`].
pub type SharedI2cDevice<'a, T> = I2cDevice<'a, CriticalSectionRawMutex, T>;
