//! Synthetic surroundings for the simulated sensor.

/// Conditions at the sensor at the moment a conversion runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Conditions {
    pub pressure_pa: f64,
    pub temperature_c: f64,
}

/// Source of [`Conditions`], queried once per conversion.
pub trait Environment {
    fn sample(&mut self) -> Conditions;
}

/// Conditions that only change when the caller changes them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedEnvironment {
    pub conditions: Conditions,
}

impl FixedEnvironment {
    pub const fn new(pressure_pa: f64, temperature_c: f64) -> Self {
        Self {
            conditions: Conditions {
                pressure_pa,
                temperature_c,
            },
        }
    }
}

impl Environment for FixedEnvironment {
    fn sample(&mut self) -> Conditions {
        self.conditions
    }
}

/// Generates conditions that vary over time.
///
/// Every sample advances a fake clock by `step_secs`, so the output does not
/// depend on how fast the host polls.
#[derive(Debug, Clone)]
pub struct SinusoidalEnvironment {
    /// Monotonic seconds counter.
    elapsed_secs: f64,
    step_secs: f64,
}

impl SinusoidalEnvironment {
    pub fn new(step_secs: f64) -> Self {
        Self {
            elapsed_secs: 0.0,
            step_secs,
        }
    }

    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }
}

impl Environment for SinusoidalEnvironment {
    fn sample(&mut self) -> Conditions {
        self.elapsed_secs += self.step_secs;
        let t = self.elapsed_secs;

        // Pressure: weather-scale swing of about ±8 hPa plus gusts
        let pressure_pa = 101_325.0 + 800.0 * (t / 300.0).sin() + 40.0 * (t / 17.0).cos();

        // Temperature: 19–25 °C sinusoidal with slow drift
        let temperature_c = 22.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos();

        Conditions {
            pressure_pa,
            temperature_c,
        }
    }
}

/// Altitude in metres for `pressure_pa`, given the sea-level equivalent
/// pressure `reference_pa` (international barometric formula).
pub fn altitude_for(pressure_pa: f64, reference_pa: f64) -> f64 {
    44_330.77 * (1.0 - (pressure_pa / reference_pa).powf(0.190_263_2))
}
