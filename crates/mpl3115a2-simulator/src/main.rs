//! Desktop simulator for the MPL3115A2 driver.
//!
//! Runs the real driver against a simulated sensor on a shared bus and logs
//! every step. Set `RUST_LOG=debug` to see register-level activity, or
//! `RUST_LOG=trace` for the simulated bus itself.

use std::time::Duration;

use embassy_futures::block_on;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info, warn};

use mpl3115a2_core::registers::{CTRL_REG3_PP_OD1, INT_PTH, INT_TTH};
use mpl3115a2_core::shared_bus::SharedBus;
use mpl3115a2_core::{
    DeviceMode, Error, Extremum, InterruptConfig, Mpl3115a2, Mpl3115a2Config, Oversampling,
    Quantity, Sensor, SensorReadings, SharedI2cDevice,
};
use mpl3115a2_simulator::{SimulatedMpl3115a2, SinusoidalEnvironment};

// ---------------------------------------------------------------------------
// Simulation constants
// ---------------------------------------------------------------------------

/// Samples taken before the simulator exits.
const SAMPLE_COUNT: usize = 10;

/// Wall-clock pause between samples.
const SAMPLE_INTERVAL: Duration = Duration::from_millis(500);

/// Simulated seconds that pass per conversion.
const ENVIRONMENT_STEP_SECS: f64 = 30.0;

/// Sea-level equivalent pressure for altitude output.
const SEA_LEVEL_PA: u32 = 101_325;

// ---------------------------------------------------------------------------
// Host delay
// ---------------------------------------------------------------------------

/// Blocking delay for the host; fine under `block_on`.
struct StdDelay;

impl DelayNs for StdDelay {
    async fn delay_ns(&mut self, ns: u32) {
        std::thread::sleep(Duration::from_nanos(ns.into()));
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

async fn configure<I: I2c, D: DelayNs>(driver: &mut Mpl3115a2<I, D>) -> Result<(), Error> {
    driver.reset().await?;
    driver.init().await?;
    driver.set_barometric_reference(SEA_LEVEL_PA).await?;

    let trimmed = driver.trim_offset(Quantity::Temperature, -0.5).await?;
    info!("Temperature offset: {} °C", trimmed);

    driver
        .set_alarm_target(Quantity::Pressure, SEA_LEVEL_PA as i32)
        .await?;
    let window = driver.set_alarm_window(Quantity::Pressure, 400).await?;
    driver.set_alarm_target(Quantity::Temperature, 22).await?;
    let t_window = driver.set_alarm_window(Quantity::Temperature, 2).await?;
    info!(
        "Alarms: pressure {} ± {} Pa, temperature 22 ± {} °C",
        SEA_LEVEL_PA, window, t_window
    );

    driver
        .configure_interrupts(InterruptConfig {
            pin_action: CTRL_REG3_PP_OD1,
            enabled: INT_PTH | INT_TTH,
            routing: INT_PTH | INT_TTH,
        })
        .await
}

async fn sample<I: I2c, D: DelayNs>(
    driver: &mut Mpl3115a2<I, D>,
    index: usize,
) -> Result<(), Error> {
    let pressure = driver.read(Quantity::Pressure).await?;
    let altitude = driver.read(Quantity::Altitude).await?;
    let temperature = driver.read(Quantity::Temperature).await?;
    let change = driver.read_change(Quantity::Temperature).await?;

    info!(
        "[{:>2}] p = {:.2} Pa  h = {:.2} m  T = {:.4} °C (Δ {:+.4})",
        index,
        pressure.as_f32(),
        altitude.as_f32(),
        temperature.as_f32(),
        change.as_f32()
    );

    let source = driver.interrupt_source().await?;
    if source.pressure_threshold() {
        warn!("Pressure crossed its alarm threshold");
    }
    if source.temperature_threshold() {
        warn!("Temperature crossed its alarm threshold");
    }
    Ok(())
}

async fn summarize<I: I2c, D: DelayNs>(driver: &mut Mpl3115a2<I, D>) -> Result<(), Error> {
    driver.set_mode(DeviceMode::Barometer).await?;
    let min = driver.read_extremum(Quantity::Pressure, Extremum::Min).await?;
    let max = driver.read_extremum(Quantity::Pressure, Extremum::Max).await?;
    let t_min = driver.read_extremum(Quantity::Temperature, Extremum::Min).await?;
    let t_max = driver.read_extremum(Quantity::Temperature, Extremum::Max).await?;
    info!(
        "Pressure range {:.2}..{:.2} Pa, temperature range {:.4}..{:.4} °C",
        min.as_f32(),
        max.as_f32(),
        t_min.as_f32(),
        t_max.as_f32()
    );

    let readings = Sensor::<2>::read(driver).await?;
    info!("Sensor row (milli-units): {:?}", readings.to_array());
    Ok(())
}

async fn run<I: I2c, D: DelayNs>(driver: &mut Mpl3115a2<I, D>) -> Result<(), Error> {
    configure(driver).await?;
    for index in 0..SAMPLE_COUNT {
        sample(driver, index).await?;
        std::thread::sleep(SAMPLE_INTERVAL);
    }
    summarize(driver).await
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::init();
    info!("Starting MPL3115A2 simulator");

    let bus: SharedBus<_> = Mutex::new(SimulatedMpl3115a2::new(SinusoidalEnvironment::new(
        ENVIRONMENT_STEP_SECS,
    )));

    let config = Mpl3115a2Config {
        oversampling: Oversampling::X16,
        ..Default::default()
    };
    let mut driver = Mpl3115a2::with_config(SharedI2cDevice::new(&bus), StdDelay, config);

    if let Err(e) = block_on(run(&mut driver)) {
        error!("Simulator stopped: {}", e);
        std::process::exit(1);
    }

    let conversions = block_on(bus.lock()).conversions();
    info!("Simulator exiting after {} conversions", conversions);
}
