//! Hardware-independent async driver for the MPL3115A2
//!
//! The MPL3115A2 is an I2C barometric pressure / altitude / temperature
//! sensor. This crate turns its fixed-point data registers into physical
//! values and turns trim offsets, alarm settings and control options into
//! packed register writes.
//!
//! It is `#![no_std]` and only depends on the `embedded-hal-async` traits, so
//! it runs on embedded targets and against the desktop simulator alike.

#![cfg_attr(not(test), no_std)]

pub mod codec;
pub mod config;
pub mod device;
pub mod error;
pub mod registers;
pub mod sensor;
#[cfg(feature = "shared-bus")]
pub mod shared_bus;

pub use codec::{Extremum, PhysicalValue, Quantity};
pub use config::Mpl3115a2Config;
pub use device::{Mpl3115a2, ResetState};
pub use error::Error;
pub use registers::{DeviceMode, InterruptConfig, Oversampling};
pub use sensor::{Mpl3115a2Readings, Sensor, SensorReadings};
#[cfg(feature = "shared-bus")]
pub use shared_bus::SharedI2cDevice;
