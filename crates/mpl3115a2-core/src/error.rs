//! Driver error type

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

/// Errors that can occur during MPL3115A2 operations
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// An I2C transaction failed
    #[error("I2C bus error: {0}")]
    Bus(ErrorKind),
    /// A hardware condition did not appear within the configured number of polls
    #[error("Timed out waiting for {operation}")]
    Timeout { operation: &'static str },
    /// WHO_AM_I returned something other than the MPL3115A2 identity
    #[error("Unexpected device identity 0x{found:02X}")]
    UnexpectedDevice { found: u8 },
}
