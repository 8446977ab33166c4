//! Desktop stand-in for MPL3115A2 hardware.
//!
//! [`SimulatedMpl3115a2`] implements the async I2C trait on top of a register
//! file, so the real `mpl3115a2-core` driver can be exercised on a host, in
//! integration tests or from the `mpl3115a2-simulator` binary.

pub mod device;
pub mod environment;

pub use device::SimulatedMpl3115a2;
pub use environment::{Conditions, Environment, FixedEnvironment, SinusoidalEnvironment};
