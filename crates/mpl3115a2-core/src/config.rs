use serde::{Deserialize, Serialize};

use crate::registers::{DeviceMode, Oversampling};

/// Session configuration.
///
/// `mode` and `oversampling` are applied by `Mpl3115a2::init`; the polling
/// limits bound every wait on a self-clearing hardware bit.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mpl3115a2Config {
    pub mode: DeviceMode,
    pub oversampling: Oversampling,
    /// Delay between two polls of a self-clearing bit.
    pub poll_interval_us: u32,
    /// Polls of CTRL_REG1 before an acquisition is declared stuck.
    pub max_poll_attempts: u32,
    /// Identity reads before a software reset is declared failed.
    pub reset_poll_attempts: u32,
}

impl Default for Mpl3115a2Config {
    fn default() -> Self {
        Self {
            mode: DeviceMode::Barometer,
            oversampling: Oversampling::X1,
            // 128x oversampling takes up to 512 ms, so 1 ms x 1000 polls covers
            // every ratio with margin.
            poll_interval_us: 1_000,
            max_poll_attempts: 1_000,
            // Boot after reset completes within 1 ms.
            reset_poll_attempts: 20,
        }
    }
}
