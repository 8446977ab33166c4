//! MPL3115A2 device session.
//!
//! Owns the bus handle, the delay used between polls, and the host-side view
//! of the device mode and reset progress. Every operation is a short
//! sequence of `write` / `write_read` transactions; raw register windows are
//! handed to [`crate::codec`] for conversion.

use embedded_hal::i2c::ErrorKind;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::{Error as _, I2c};
use log::{debug, error, info, warn};

use crate::codec::{self, BitLayout, Extremum, PhysicalValue, Quantity};
use crate::config::Mpl3115a2Config;
use crate::error::Error;
use crate::registers::*;

/// Progress of a software reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResetState {
    #[default]
    Idle,
    /// RST was written; waiting for WHO_AM_I to answer again.
    ResetIssued,
}

impl Quantity {
    /// Device mode the shared pressure/altitude registers must be in to carry
    /// this quantity. Temperature works in either mode.
    pub const fn required_mode(self) -> Option<DeviceMode> {
        match self {
            Self::Pressure => Some(DeviceMode::Barometer),
            Self::Altitude => Some(DeviceMode::Altimeter),
            Self::Temperature => None,
        }
    }

    const fn offset_register(self) -> u8 {
        match self {
            Self::Pressure => OFF_P,
            Self::Altitude => OFF_H,
            Self::Temperature => OFF_T,
        }
    }
}

/// MPL3115A2 driver over an async I2C bus.
///
/// The session starts in barometer mode with no reset in flight, matching the
/// device's power-on state. Reading a pressure or altitude quantity while the
/// session is in the other mode switches the device mode first.
pub struct Mpl3115a2<I, D> {
    i2c: I,
    delay: D,
    config: Mpl3115a2Config,
    mode: DeviceMode,
    reset_state: ResetState,
}

impl<I, D> Mpl3115a2<I, D>
where
    I: I2c,
    D: DelayNs,
{
    /// Create a driver with the default configuration.
    pub fn new(i2c: I, delay: D) -> Self {
        Self::with_config(i2c, delay, Mpl3115a2Config::default())
    }

    pub fn with_config(i2c: I, delay: D, config: Mpl3115a2Config) -> Self {
        Self {
            i2c,
            delay,
            config,
            mode: DeviceMode::Barometer,
            reset_state: ResetState::Idle,
        }
    }

    /// Give back the bus and delay.
    pub fn release(self) -> (I, D) {
        (self.i2c, self.delay)
    }

    pub fn config(&self) -> &Mpl3115a2Config {
        &self.config
    }

    /// Mode last written to the device by this session.
    pub fn mode(&self) -> DeviceMode {
        self.mode
    }

    pub fn reset_state(&self) -> ResetState {
        self.reset_state
    }

    // =========================================================================
    // Private I2C Helper Methods
    // =========================================================================

    async fn read_registers(&mut self, addr: u8, buf: &mut [u8]) -> Result<(), Error> {
        self.i2c
            .write_read(I2C_ADDR, &[addr], buf)
            .await
            .map_err(|e| {
                error!("MPL3115A2 read at 0x{:02X} failed: {:?}", addr, e);
                Error::Bus(e.kind())
            })
    }

    async fn read_byte(&mut self, addr: u8) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_registers(addr, &mut buf).await?;
        Ok(buf[0])
    }

    async fn read_pair(&mut self, addr: u8) -> Result<[u8; 2], Error> {
        let mut buf = [0u8; 2];
        self.read_registers(addr, &mut buf).await?;
        Ok(buf)
    }

    /// Write up to three bytes starting at `addr`, relying on auto-increment.
    async fn write_registers(&mut self, addr: u8, data: &[u8]) -> Result<(), Error> {
        let mut frame = [0u8; 4];
        let len = data.len().min(frame.len() - 1);
        frame[0] = addr;
        frame[1..=len].copy_from_slice(&data[..len]);

        self.i2c
            .write(I2C_ADDR, &frame[..=len])
            .await
            .map_err(|e| {
                error!("MPL3115A2 write at 0x{:02X} failed: {:?}", addr, e);
                Error::Bus(e.kind())
            })
    }

    async fn write_byte(&mut self, addr: u8, data: u8) -> Result<(), Error> {
        self.write_registers(addr, &[data]).await
    }

    async fn read_value(&mut self, addr: u8, layout: BitLayout) -> Result<PhysicalValue, Error> {
        let mut buf = [0u8; 3];
        let raw = &mut buf[..layout.byte_count()];
        self.read_registers(addr, raw).await?;
        Ok(codec::decode(raw, layout))
    }

    // =========================================================================
    // CTRL_REG1
    // =========================================================================

    pub async fn ctrl_reg1(&mut self) -> Result<CtrlReg1, Error> {
        self.read_byte(CTRL_REG1).await.map(CtrlReg1)
    }

    /// Read CTRL_REG1, apply `f`, write the result back.
    async fn modify_ctrl_reg1<F>(&mut self, f: F) -> Result<CtrlReg1, Error>
    where
        F: FnOnce(CtrlReg1) -> CtrlReg1,
    {
        let updated = f(self.ctrl_reg1().await?);
        self.write_byte(CTRL_REG1, updated.bits()).await?;
        Ok(updated)
    }

    /// Switch between barometer and altimeter mode.
    pub async fn set_mode(&mut self, mode: DeviceMode) -> Result<(), Error> {
        self.modify_ctrl_reg1(|reg| reg.with_mode(mode)).await?;
        self.mode = mode;
        debug!("MPL3115A2: mode set to {:?}", mode);
        Ok(())
    }

    async fn ensure_mode_for(&mut self, kind: Quantity) -> Result<(), Error> {
        if let Some(mode) = kind.required_mode()
            && mode != self.mode
        {
            debug!(
                "MPL3115A2: {:?} requested in {:?} mode, switching",
                kind, self.mode
            );
            self.set_mode(mode).await?;
        }
        Ok(())
    }

    /// Set the oversampling ratio from a sample count (1, 2, 4 ... 128).
    ///
    /// Any other count selects 1x. Returns the ratio written.
    pub async fn set_oversampling(&mut self, ratio: u8) -> Result<Oversampling, Error> {
        let os = Oversampling::from_ratio(ratio).unwrap_or_else(|| {
            warn!("MPL3115A2: unsupported oversampling ratio {}, using 1x", ratio);
            Oversampling::X1
        });
        self.modify_ctrl_reg1(|reg| reg.with_oversampling(os)).await?;
        Ok(os)
    }

    pub async fn oversampling(&mut self) -> Result<Oversampling, Error> {
        Ok(self.ctrl_reg1().await?.oversampling())
    }

    /// Device is sampling periodically (active) rather than on demand (standby).
    pub async fn is_active(&mut self) -> Result<bool, Error> {
        Ok(self.ctrl_reg1().await?.active())
    }

    pub async fn set_active(&mut self, active: bool) -> Result<(), Error> {
        self.modify_ctrl_reg1(|reg| reg.with_active(active)).await?;
        Ok(())
    }

    // =========================================================================
    // Identity, status and initialization
    // =========================================================================

    pub async fn who_am_i(&mut self) -> Result<u8, Error> {
        self.read_byte(WHO_AM_I).await
    }

    pub async fn verify_identity(&mut self) -> Result<(), Error> {
        let found = self.who_am_i().await?;
        if found != DEVICE_ID {
            error!(
                "MPL3115A2: WHO_AM_I returned 0x{:02X}, expected 0x{:02X}",
                found, DEVICE_ID
            );
            return Err(Error::UnexpectedDevice { found });
        }
        Ok(())
    }

    /// Check the device identity and apply the configured mode and
    /// oversampling in a single CTRL_REG1 update.
    pub async fn init(&mut self) -> Result<(), Error> {
        self.verify_identity().await?;

        let Mpl3115a2Config {
            mode, oversampling, ..
        } = self.config;
        self.modify_ctrl_reg1(|reg| reg.with_mode(mode).with_oversampling(oversampling))
            .await?;
        self.mode = mode;

        info!(
            "MPL3115A2: initialized in {:?} mode, {}x oversampling",
            mode,
            oversampling.ratio()
        );
        Ok(())
    }

    pub async fn status(&mut self) -> Result<DataReadyStatus, Error> {
        self.read_byte(STATUS).await.map(DataReadyStatus)
    }

    // =========================================================================
    // Measurements
    // =========================================================================

    /// Start a one-shot acquisition of pressure/altitude and temperature.
    pub async fn one_shot_measure(&mut self) -> Result<(), Error> {
        self.modify_ctrl_reg1(CtrlReg1::with_one_shot).await?;
        Ok(())
    }

    /// Poll CTRL_REG1 until OST self-clears.
    async fn wait_for_conversion(&mut self) -> Result<(), Error> {
        for attempt in 0..self.config.max_poll_attempts {
            if attempt > 0 {
                self.delay.delay_us(self.config.poll_interval_us).await;
            }
            if !self.ctrl_reg1().await?.one_shot_pending() {
                return Ok(());
            }
        }

        error!(
            "MPL3115A2: acquisition still running after {} polls",
            self.config.max_poll_attempts
        );
        Err(Error::Timeout {
            operation: "one-shot acquisition",
        })
    }

    /// Take a fresh sample of `kind`.
    ///
    /// Pressure and altitude share the output registers, so asking for the
    /// one the device is not configured for switches the mode before the
    /// acquisition is triggered.
    pub async fn read(&mut self, kind: Quantity) -> Result<PhysicalValue, Error> {
        self.ensure_mode_for(kind).await?;
        self.one_shot_measure().await?;
        self.wait_for_conversion().await?;

        let addr = match kind {
            Quantity::Pressure | Quantity::Altitude => OUT_P_MSB,
            Quantity::Temperature => OUT_T_MSB,
        };
        let value = self.read_value(addr, BitLayout::for_sample(kind)).await?;
        debug!(
            "MPL3115A2: {:?} = {} {}",
            kind,
            value.as_f32(),
            kind.unit()
        );
        Ok(value)
    }

    /// Change between the last two samples, as tracked by the device.
    ///
    /// Does not start an acquisition.
    pub async fn read_change(&mut self, kind: Quantity) -> Result<PhysicalValue, Error> {
        self.ensure_mode_for(kind).await?;

        let addr = match kind {
            Quantity::Pressure | Quantity::Altitude => OUT_P_DELTA_MSB,
            Quantity::Temperature => OUT_T_DELTA_MSB,
        };
        self.read_value(addr, BitLayout::for_delta(kind)).await
    }

    /// Lowest or highest value recorded since the bank was last cleared.
    pub async fn read_extremum(
        &mut self,
        kind: Quantity,
        which: Extremum,
    ) -> Result<PhysicalValue, Error> {
        self.ensure_mode_for(kind).await?;
        self.read_value(extremum_register(kind, which), BitLayout::for_sample(kind))
            .await
    }

    /// Clear a min/max bank by overwriting it with zeros.
    pub async fn reset_extremum(&mut self, kind: Quantity, which: Extremum) -> Result<(), Error> {
        let len = BitLayout::for_sample(kind).byte_count();
        let zeros = [0u8; 3];
        self.write_registers(extremum_register(kind, which), &zeros[..len])
            .await
    }

    // =========================================================================
    // Alarms
    // =========================================================================

    /// Set the alarm target for `kind`, clamped to the operating range.
    ///
    /// Pressure and altitude share P_TGT; which one the device compares
    /// against follows the device mode.
    pub async fn set_alarm_target(&mut self, kind: Quantity, value: i32) -> Result<(), Error> {
        let range = kind.alarm_range();
        if !range.contains(value) {
            warn!(
                "MPL3115A2: {:?} target {} {} clamped to {}",
                kind,
                value,
                kind.unit(),
                range.clamp(value)
            );
        }

        match kind {
            Quantity::Pressure => {
                self.write_registers(P_TGT_MSB, &codec::encode_pressure_target(value))
                    .await
            }
            Quantity::Altitude => {
                self.write_registers(P_TGT_MSB, &codec::encode_altitude_target(value))
                    .await
            }
            Quantity::Temperature => {
                self.write_byte(T_TGT, codec::encode_temperature_target(value))
                    .await
            }
        }
    }

    /// Target currently held by the device for `kind`.
    pub async fn alarm_target(&mut self, kind: Quantity) -> Result<i32, Error> {
        match kind {
            Quantity::Pressure => Ok(codec::decode_pressure_target(
                self.read_pair(P_TGT_MSB).await?,
            )),
            Quantity::Altitude => Ok(codec::decode_altitude_target(
                self.read_pair(P_TGT_MSB).await?,
            )),
            Quantity::Temperature => Ok(codec::decode_temperature_target(
                self.read_byte(T_TGT).await?,
            )),
        }
    }

    /// Set the alarm window for `kind` around the target currently in the
    /// device.
    ///
    /// The target is read back on every call. If `target ± value` leaves the
    /// operating range, or `value` equals the target, a zero window is
    /// written instead. Returns the window stored, in engineering units.
    pub async fn set_alarm_window(&mut self, kind: Quantity, value: i32) -> Result<i32, Error> {
        let target = self.alarm_target(kind).await?;
        let window = codec::constrain_window(kind, target, value);
        if window != value {
            warn!(
                "MPL3115A2: {:?} window {} {} around target {} is out of range, disabling window",
                kind,
                value,
                kind.unit(),
                target
            );
        }

        match kind {
            Quantity::Pressure => {
                let raw = codec::encode_pressure_window(window);
                self.write_registers(P_WND_MSB, &raw).await?;
                Ok(codec::decode_pressure_window(raw))
            }
            Quantity::Altitude => {
                let raw = codec::encode_altitude_window(window);
                self.write_registers(P_WND_MSB, &raw).await?;
                Ok(codec::decode_altitude_window(raw))
            }
            Quantity::Temperature => {
                let raw = codec::encode_temperature_window(window);
                self.write_byte(T_WND, raw).await?;
                Ok(codec::decode_temperature_window(raw))
            }
        }
    }

    pub async fn alarm_window(&mut self, kind: Quantity) -> Result<i32, Error> {
        match kind {
            Quantity::Pressure => Ok(codec::decode_pressure_window(
                self.read_pair(P_WND_MSB).await?,
            )),
            Quantity::Altitude => Ok(codec::decode_altitude_window(
                self.read_pair(P_WND_MSB).await?,
            )),
            Quantity::Temperature => Ok(codec::decode_temperature_window(
                self.read_byte(T_WND).await?,
            )),
        }
    }

    /// Configure interrupt pin behaviour, enables and routing in one write.
    pub async fn configure_interrupts(&mut self, config: InterruptConfig) -> Result<(), Error> {
        self.write_registers(CTRL_REG3, &config.to_registers()).await
    }

    pub async fn interrupt_source(&mut self) -> Result<InterruptSource, Error> {
        self.read_byte(INT_SOURCE).await.map(InterruptSource)
    }

    // =========================================================================
    // Offsets and reference
    // =========================================================================

    /// Write the user offset for `kind`, clamped to the register range.
    /// Returns the offset actually stored.
    pub async fn trim_offset(&mut self, kind: Quantity, value: f32) -> Result<f32, Error> {
        let (min, max) = kind.offset_range();
        let raw = codec::encode_offset(kind, value);
        let stored = codec::decode_offset(kind, raw);
        if value < min || value > max {
            warn!(
                "MPL3115A2: {:?} offset {} {} clamped to {}",
                kind,
                value,
                kind.unit(),
                stored
            );
        }

        self.write_byte(kind.offset_register(), raw).await?;
        Ok(stored)
    }

    pub async fn offset(&mut self, kind: Quantity) -> Result<f32, Error> {
        let raw = self.read_byte(kind.offset_register()).await?;
        Ok(codec::decode_offset(kind, raw))
    }

    /// Sea-level equivalent pressure at the current location, used by the
    /// device for altitude calculation.
    pub async fn set_barometric_reference(&mut self, pascals: u32) -> Result<(), Error> {
        self.write_registers(BAR_IN_MSB, &codec::encode_barometric_reference(pascals))
            .await
    }

    pub async fn barometric_reference(&mut self) -> Result<u32, Error> {
        Ok(codec::decode_barometric_reference(
            self.read_pair(BAR_IN_MSB).await?,
        ))
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Issue a software reset if none is in flight, then check whether the
    /// device has finished booting.
    ///
    /// Returns `true` once WHO_AM_I reads back the device ID; the session
    /// mode returns to barometer, the device default. The device does not
    /// acknowledge while booting, which counts as "not yet".
    pub async fn soft_reset(&mut self) -> Result<bool, Error> {
        if self.reset_state == ResetState::Idle {
            info!("MPL3115A2: issuing software reset");
            self.reset_state = ResetState::ResetIssued;
            match self.write_byte(CTRL_REG1, CTRL_REG1_RST).await {
                Ok(()) => {}
                // the device may drop the ACK on the RST byte itself
                Err(Error::Bus(ErrorKind::NoAcknowledge(_))) => {
                    debug!("MPL3115A2: RST write not acknowledged");
                }
                Err(e) => return Err(e),
            }
        }

        let mut id = [0u8; 1];
        match self.i2c.write_read(I2C_ADDR, &[WHO_AM_I], &mut id).await {
            Ok(()) => {}
            Err(e) if matches!(e.kind(), ErrorKind::NoAcknowledge(_)) => {
                debug!("MPL3115A2: not acknowledging, still booting");
                return Ok(false);
            }
            Err(e) => {
                error!("MPL3115A2 identity read after reset failed: {:?}", e);
                return Err(Error::Bus(e.kind()));
            }
        }

        if id[0] != DEVICE_ID {
            debug!("MPL3115A2: WHO_AM_I = 0x{:02X} after reset", id[0]);
            return Ok(false);
        }

        self.reset_state = ResetState::Idle;
        self.mode = DeviceMode::Barometer;
        info!("MPL3115A2: reset complete");
        Ok(true)
    }

    /// Reset the device and wait until it is ready again.
    pub async fn reset(&mut self) -> Result<(), Error> {
        for attempt in 0..self.config.reset_poll_attempts {
            if attempt > 0 {
                self.delay.delay_us(self.config.poll_interval_us).await;
            }
            if self.soft_reset().await? {
                return Ok(());
            }
        }

        error!(
            "MPL3115A2: device not ready after {} reset polls",
            self.config.reset_poll_attempts
        );
        Err(Error::Timeout {
            operation: "software reset",
        })
    }
}

const fn extremum_register(kind: Quantity, which: Extremum) -> u8 {
    match (kind, which) {
        (Quantity::Pressure | Quantity::Altitude, Extremum::Min) => P_MIN_MSB,
        (Quantity::Pressure | Quantity::Altitude, Extremum::Max) => P_MAX_MSB,
        (Quantity::Temperature, Extremum::Min) => T_MIN_MSB,
        (Quantity::Temperature, Extremum::Max) => T_MAX_MSB,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal::i2c::NoAcknowledgeSource;
    use embedded_hal_mock::eh1::i2c::{Mock as I2cMock, Transaction as I2cTransaction};

    /// Delay that returns immediately.
    struct NoopDelay;

    impl DelayNs for NoopDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }

    fn driver(expectations: &[I2cTransaction]) -> Mpl3115a2<I2cMock, NoopDelay> {
        Mpl3115a2::new(I2cMock::new(expectations), NoopDelay)
    }

    fn finish(dev: Mpl3115a2<I2cMock, NoopDelay>) {
        let (mut i2c, _) = dev.release();
        i2c.done();
    }

    fn read(reg: u8, response: &[u8]) -> I2cTransaction {
        I2cTransaction::write_read(I2C_ADDR, vec![reg], response.to_vec())
    }

    fn write(bytes: &[u8]) -> I2cTransaction {
        I2cTransaction::write(I2C_ADDR, bytes.to_vec())
    }

    #[test]
    fn read_pressure_triggers_and_polls() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_OST]),
            read(CTRL_REG1, &[0x00]),
            read(OUT_P_MSB, &[0x62, 0x1A, 0x70]),
        ]);

        let value = block_on(dev.read(Quantity::Pressure)).unwrap();
        assert_eq!(value.as_f32(), 100_457.75);
        assert_eq!(dev.mode(), DeviceMode::Barometer);
        finish(dev);
    }

    #[test]
    fn one_shot_preserves_other_ctrl_reg1_bits() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0xB8]),
            write(&[CTRL_REG1, 0xBA]),
        ]);

        block_on(dev.one_shot_measure()).unwrap();
        finish(dev);
    }

    #[test]
    fn altitude_read_in_barometer_mode_switches_first() {
        let mut dev = driver(&[
            // mode switch
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_ALT]),
            // acquisition
            read(CTRL_REG1, &[CTRL_REG1_ALT]),
            write(&[CTRL_REG1, CTRL_REG1_ALT | CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_ALT]),
            read(OUT_P_MSB, &[0x01, 0x2C, 0x80]),
        ]);

        assert_eq!(dev.mode(), DeviceMode::Barometer);
        let value = block_on(dev.read(Quantity::Altitude)).unwrap();
        assert_eq!(value.as_f32(), 300.5);
        assert_eq!(dev.mode(), DeviceMode::Altimeter);
        finish(dev);
    }

    #[test]
    fn temperature_read_never_switches_mode() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_ALT]),
            read(CTRL_REG1, &[CTRL_REG1_ALT]),
            write(&[CTRL_REG1, CTRL_REG1_ALT | CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_ALT]),
            read(OUT_T_MSB, &[0xFB, 0x40]),
        ]);

        block_on(dev.set_mode(DeviceMode::Altimeter)).unwrap();
        let value = block_on(dev.read(Quantity::Temperature)).unwrap();
        assert_eq!(value.as_f32(), -5.25);
        assert_eq!(dev.mode(), DeviceMode::Altimeter);
        finish(dev);
    }

    #[test]
    fn acquisition_poll_is_bounded() {
        let config = Mpl3115a2Config {
            max_poll_attempts: 3,
            ..Default::default()
        };
        let expectations = [
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_OST]),
            read(CTRL_REG1, &[CTRL_REG1_OST]),
        ];
        let mut dev = Mpl3115a2::with_config(I2cMock::new(&expectations), NoopDelay, config);

        let err = block_on(dev.read(Quantity::Temperature)).unwrap_err();
        assert_eq!(
            err,
            Error::Timeout {
                operation: "one-shot acquisition"
            }
        );
        finish(dev);
    }

    #[test]
    fn bus_errors_are_surfaced() {
        let mut dev = driver(&[read(CTRL_REG1, &[0x00]).with_error(ErrorKind::Other)]);

        let err = block_on(dev.read(Quantity::Pressure)).unwrap_err();
        assert_eq!(err, Error::Bus(ErrorKind::Other));
        finish(dev);
    }

    #[test]
    fn failed_mode_write_keeps_session_mode() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_ALT]).with_error(ErrorKind::Other),
        ]);

        assert!(block_on(dev.set_mode(DeviceMode::Altimeter)).is_err());
        assert_eq!(dev.mode(), DeviceMode::Barometer);
        finish(dev);
    }

    #[test]
    fn change_reads_switch_mode_except_for_temperature() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_ALT]),
            read(OUT_P_DELTA_MSB, &[0xFF, 0xFF, 0x00]),
            read(OUT_T_DELTA_MSB, &[0x01, 0x80]),
        ]);

        let altitude = block_on(dev.read_change(Quantity::Altitude)).unwrap();
        assert_eq!(altitude.as_f32(), -1.0);
        let temperature = block_on(dev.read_change(Quantity::Temperature)).unwrap();
        assert_eq!(temperature.as_f32(), 1.5);
        assert_eq!(dev.mode(), DeviceMode::Altimeter);
        finish(dev);
    }

    #[test]
    fn pressure_change_is_signed() {
        let mut dev = driver(&[read(OUT_P_DELTA_MSB, &[0xFF, 0xFF, 0xD0])]);

        let value = block_on(dev.read_change(Quantity::Pressure)).unwrap();
        assert_eq!(value.as_f32(), -1.25);
        finish(dev);
    }

    #[test]
    fn extremum_reads_and_resets() {
        let mut dev = driver(&[
            read(P_MAX_MSB, &[0x62, 0x1A, 0x70]),
            read(T_MIN_MSB, &[0xF6, 0x00]),
            write(&[P_MIN_MSB, 0x00, 0x00, 0x00]),
            write(&[T_MAX_MSB, 0x00, 0x00]),
        ]);

        let max = block_on(dev.read_extremum(Quantity::Pressure, Extremum::Max)).unwrap();
        assert_eq!(max.as_f32(), 100_457.75);
        let min = block_on(dev.read_extremum(Quantity::Temperature, Extremum::Min)).unwrap();
        assert_eq!(min.as_f32(), -10.0);

        block_on(dev.reset_extremum(Quantity::Pressure, Extremum::Min)).unwrap();
        block_on(dev.reset_extremum(Quantity::Temperature, Extremum::Max)).unwrap();
        finish(dev);
    }

    #[test]
    fn altitude_extremum_switches_mode() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, CTRL_REG1_ALT]),
            read(P_MIN_MSB, &[0xFF, 0xCE, 0x00]),
        ]);

        let min = block_on(dev.read_extremum(Quantity::Altitude, Extremum::Min)).unwrap();
        assert_eq!(min.as_f32(), -50.0);
        assert_eq!(dev.mode(), DeviceMode::Altimeter);
        finish(dev);
    }

    #[test]
    fn unsupported_oversampling_falls_back_to_1x() {
        let mut dev = driver(&[
            read(CTRL_REG1, &[0xB9]),
            write(&[CTRL_REG1, 0x81]),
            read(CTRL_REG1, &[0xB9]),
            write(&[CTRL_REG1, 0x81]),
            read(CTRL_REG1, &[0x81]),
            write(&[CTRL_REG1, 0xB9]),
        ]);

        assert_eq!(block_on(dev.set_oversampling(3)).unwrap(), Oversampling::X1);
        assert_eq!(block_on(dev.set_oversampling(1)).unwrap(), Oversampling::X1);
        assert_eq!(block_on(dev.set_oversampling(128)).unwrap(), Oversampling::X128);
        finish(dev);
    }

    #[test]
    fn pressure_window_within_range_is_kept() {
        let mut dev = driver(&[
            read(P_TGT_MSB, &[0xC3, 0x50]),
            write(&[P_WND_MSB, 0x01, 0xF4]),
        ]);

        assert_eq!(block_on(dev.set_alarm_window(Quantity::Pressure, 1_000)).unwrap(), 1_000);
        finish(dev);
    }

    #[test]
    fn pressure_window_out_of_range_is_zeroed() {
        let mut dev = driver(&[
            read(P_TGT_MSB, &[0xC3, 0x50]),
            write(&[P_WND_MSB, 0x00, 0x00]),
        ]);

        assert_eq!(block_on(dev.set_alarm_window(Quantity::Pressure, 65_000)).unwrap(), 0);
        finish(dev);
    }

    #[test]
    fn altitude_and_temperature_windows_use_live_target() {
        let [msb, lsb] = (-500i16).to_be_bytes();
        let mut dev = driver(&[
            read(P_TGT_MSB, &[msb, lsb]),
            write(&[P_WND_MSB, 0x00, 0x00]),
            read(T_TGT, &[20]),
            write(&[T_WND, 10]),
            read(T_TGT, &[80]),
            write(&[T_WND, 0]),
        ]);

        assert_eq!(block_on(dev.set_alarm_window(Quantity::Altitude, 100)).unwrap(), 0);
        assert_eq!(block_on(dev.set_alarm_window(Quantity::Temperature, 10)).unwrap(), 10);
        assert_eq!(block_on(dev.set_alarm_window(Quantity::Temperature, 10)).unwrap(), 0);
        finish(dev);
    }

    #[test]
    fn huge_windows_are_zeroed_for_every_quantity() {
        let [msb, lsb] = (-550i16).to_be_bytes();
        let mut dev = driver(&[
            read(P_TGT_MSB, &[0xC3, 0x50]),
            write(&[P_WND_MSB, 0x00, 0x00]),
            read(P_TGT_MSB, &[msb, lsb]),
            write(&[P_WND_MSB, 0x00, 0x00]),
            read(T_TGT, &[0xF6]),
            write(&[T_WND, 0]),
        ]);

        for kind in [Quantity::Pressure, Quantity::Altitude, Quantity::Temperature] {
            assert_eq!(block_on(dev.set_alarm_window(kind, i32::MAX)).unwrap(), 0);
        }
        finish(dev);
    }

    #[test]
    fn alarm_targets_are_clamped() {
        let mut dev = driver(&[
            write(&[P_TGT_MSB, 0xD6, 0xD8]),
            write(&[P_TGT_MSB, 0x13, 0x88]),
            write(&[T_TGT, 0xD8]),
            read(P_TGT_MSB, &[0xD6, 0xD8]),
        ]);

        block_on(dev.set_alarm_target(Quantity::Pressure, 120_000)).unwrap();
        block_on(dev.set_alarm_target(Quantity::Altitude, 5_000)).unwrap();
        block_on(dev.set_alarm_target(Quantity::Temperature, -50)).unwrap();
        assert_eq!(block_on(dev.alarm_target(Quantity::Pressure)).unwrap(), 110_000);
        finish(dev);
    }

    #[test]
    fn trim_offsets_are_clamped() {
        let mut dev = driver(&[
            write(&[OFF_T, 0x7F]),
            write(&[OFF_P, 0x80]),
            write(&[OFF_H, 0x0A]),
            read(OFF_T, &[0xF0]),
        ]);

        assert_eq!(block_on(dev.trim_offset(Quantity::Temperature, 10.0)).unwrap(), 7.9375);
        assert_eq!(block_on(dev.trim_offset(Quantity::Pressure, -600.0)).unwrap(), -512.0);
        assert_eq!(block_on(dev.trim_offset(Quantity::Altitude, 10.0)).unwrap(), 10.0);
        assert_eq!(block_on(dev.offset(Quantity::Temperature)).unwrap(), -1.0);
        finish(dev);
    }

    #[test]
    fn barometric_reference_round_trip() {
        let mut dev = driver(&[
            write(&[BAR_IN_MSB, 0xC5, 0xE7]),
            read(BAR_IN_MSB, &[0xC5, 0xE7]),
        ]);

        block_on(dev.set_barometric_reference(101_326)).unwrap();
        assert_eq!(block_on(dev.barometric_reference()).unwrap(), 101_326);
        finish(dev);
    }

    #[test]
    fn soft_reset_reports_progress() {
        let mut dev = driver(&[
            write(&[CTRL_REG1, CTRL_REG1_RST]),
            read(WHO_AM_I, &[0x00])
                .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            read(WHO_AM_I, &[DEVICE_ID]),
        ]);

        assert!(!block_on(dev.soft_reset()).unwrap());
        assert_eq!(dev.reset_state(), ResetState::ResetIssued);

        // the second call must not write RST again
        assert!(block_on(dev.soft_reset()).unwrap());
        assert_eq!(dev.reset_state(), ResetState::Idle);
        assert_eq!(dev.mode(), DeviceMode::Barometer);
        finish(dev);
    }

    #[test]
    fn soft_reset_tolerates_nack_on_reset_write() {
        let mut dev = driver(&[
            write(&[CTRL_REG1, CTRL_REG1_RST])
                .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data)),
            read(WHO_AM_I, &[0x00])
                .with_error(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)),
            read(WHO_AM_I, &[DEVICE_ID]),
        ]);

        assert!(!block_on(dev.soft_reset()).unwrap());
        assert_eq!(dev.reset_state(), ResetState::ResetIssued);
        assert!(block_on(dev.soft_reset()).unwrap());
        assert_eq!(dev.reset_state(), ResetState::Idle);
        finish(dev);
    }

    #[test]
    fn reset_write_bus_fault_is_reported() {
        let mut dev = driver(&[
            write(&[CTRL_REG1, CTRL_REG1_RST]).with_error(ErrorKind::ArbitrationLoss),
        ]);

        assert_eq!(
            block_on(dev.reset()).unwrap_err(),
            Error::Bus(ErrorKind::ArbitrationLoss)
        );
        assert_eq!(dev.reset_state(), ResetState::ResetIssued);
        finish(dev);
    }

    #[test]
    fn reset_times_out() {
        let config = Mpl3115a2Config {
            reset_poll_attempts: 2,
            ..Default::default()
        };
        let expectations = [
            write(&[CTRL_REG1, CTRL_REG1_RST]),
            read(WHO_AM_I, &[0x00]),
            read(WHO_AM_I, &[0x00]),
        ];
        let mut dev = Mpl3115a2::with_config(I2cMock::new(&expectations), NoopDelay, config);

        let err = block_on(dev.reset()).unwrap_err();
        assert_eq!(
            err,
            Error::Timeout {
                operation: "software reset"
            }
        );
        assert_eq!(dev.reset_state(), ResetState::ResetIssued);
        finish(dev);
    }

    #[test]
    fn init_applies_config() {
        let config = Mpl3115a2Config {
            mode: DeviceMode::Altimeter,
            oversampling: Oversampling::X16,
            ..Default::default()
        };
        let expectations = [
            read(WHO_AM_I, &[DEVICE_ID]),
            read(CTRL_REG1, &[0x00]),
            write(&[CTRL_REG1, 0xA0]),
        ];
        let mut dev = Mpl3115a2::with_config(I2cMock::new(&expectations), NoopDelay, config);

        block_on(dev.init()).unwrap();
        assert_eq!(dev.mode(), DeviceMode::Altimeter);
        finish(dev);
    }

    #[test]
    fn init_rejects_other_devices() {
        let mut dev = driver(&[read(WHO_AM_I, &[0x00])]);

        assert_eq!(
            block_on(dev.init()).unwrap_err(),
            Error::UnexpectedDevice { found: 0x00 }
        );
        finish(dev);
    }

    #[test]
    fn interrupts_and_status() {
        let config = InterruptConfig {
            pin_action: CTRL_REG3_IPOL1,
            enabled: INT_PTH | INT_TTH,
            routing: INT_PTH,
        };
        let mut dev = driver(&[
            write(&[CTRL_REG3, CTRL_REG3_IPOL1, INT_PTH | INT_TTH, INT_PTH]),
            read(INT_SOURCE, &[SRC_PTH]),
            read(STATUS, &[DR_PTDR | DR_TDR]),
            read(CTRL_REG1, &[CTRL_REG1_SBYB]),
        ]);

        block_on(dev.configure_interrupts(config)).unwrap();
        assert!(block_on(dev.interrupt_source()).unwrap().pressure_threshold());
        let status = block_on(dev.status()).unwrap();
        assert!(status.temperature_ready());
        assert!(!status.pressure_ready());
        assert!(block_on(dev.is_active()).unwrap());
        finish(dev);
    }
}
