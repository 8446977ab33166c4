//! In-memory model of the MPL3115A2 register file.
//!
//! The model answers on the real bus address, walks the register pointer with
//! the device's auto-increment rules and reproduces the behaviour the driver
//! depends on:
//!
//! - writing OST starts a conversion; OST reads back set for a configurable
//!   number of CTRL_REG1 polls, then clears once the sample is published
//! - writing RST restores power-on defaults; the device then refuses to
//!   acknowledge for a configurable number of transactions
//! - the delta, min/max and data-ready registers are maintained per sample
//! - target/window thresholds raise INT_SOURCE flags
//!
//! Samples are published in the same fixed-point convention the driver
//! decodes, so a reading round-trips through the driver unchanged apart
//! from quantization. INT_SOURCE clears when read.

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::i2c::{ErrorType, I2c, Operation, SevenBitAddress};
use log::{debug, trace};

use mpl3115a2_core::codec::{self, BitLayout, PhysicalValue, Quantity};
use mpl3115a2_core::registers::*;

use crate::environment::{Environment, altitude_for};

const REGISTER_COUNT: usize = LAST_REGISTER as usize + 1;

/// CTRL_REG1 polls that read OST as set after a trigger.
pub const DEFAULT_CONVERSION_POLLS: u32 = 2;

/// Transactions refused after a software reset.
pub const DEFAULT_BOOT_TRANSACTIONS: u32 = 1;

/// Last published sample of one bank, in engineering units.
#[derive(Debug, Clone, Copy)]
struct Published {
    kind: Quantity,
    primary: f32,
    temperature: f32,
}

pub struct SimulatedMpl3115a2<E> {
    registers: [u8; REGISTER_COUNT],
    pointer: u8,
    environment: E,
    conversion_polls: u32,
    boot_transactions: u32,
    /// CTRL_REG1 polls left before the running conversion completes.
    busy_polls: Option<u32>,
    /// Transactions left to refuse while booting.
    booting: u32,
    last: Option<Published>,
    conversions: u32,
}

impl<E: Environment> SimulatedMpl3115a2<E> {
    pub fn new(environment: E) -> Self {
        let mut device = Self {
            registers: [0; REGISTER_COUNT],
            pointer: 0,
            environment,
            conversion_polls: DEFAULT_CONVERSION_POLLS,
            boot_transactions: DEFAULT_BOOT_TRANSACTIONS,
            busy_polls: None,
            booting: 0,
            last: None,
            conversions: 0,
        };
        device.restore_defaults();
        device
    }

    /// Number of CTRL_REG1 polls that still report a conversion in progress.
    pub fn with_conversion_polls(mut self, polls: u32) -> Self {
        self.conversion_polls = polls;
        self
    }

    /// Number of transactions refused after a software reset.
    pub fn with_boot_transactions(mut self, transactions: u32) -> Self {
        self.boot_transactions = transactions;
        self
    }

    pub fn environment(&self) -> &E {
        &self.environment
    }

    pub fn environment_mut(&mut self) -> &mut E {
        &mut self.environment
    }

    /// Current register contents, without read side effects.
    pub fn register(&self, addr: u8) -> u8 {
        self.registers.get(addr as usize).copied().unwrap_or(0)
    }

    /// Completed conversions since power-on.
    pub fn conversions(&self) -> u32 {
        self.conversions
    }

    pub fn is_booting(&self) -> bool {
        self.booting > 0
    }

    fn restore_defaults(&mut self) {
        self.registers = [0; REGISTER_COUNT];
        self.registers[WHO_AM_I as usize] = DEVICE_ID;
        // 101 326 Pa in 2 Pa units
        self.registers[BAR_IN_MSB as usize] = 0xC5;
        self.registers[BAR_IN_LSB as usize] = 0xE7;
        self.pointer = 0;
        self.busy_polls = None;
        self.last = None;
    }

    fn ctrl_reg1(&self) -> CtrlReg1 {
        CtrlReg1(self.register(CTRL_REG1))
    }

    // =========================================================================
    // Register access
    // =========================================================================

    fn read_register(&mut self, addr: u8) -> u8 {
        let Some(&value) = self.registers.get(addr as usize) else {
            return 0;
        };

        match addr {
            STATUS => self.register(DR_STATUS),
            OUT_P_MSB => {
                self.clear_ready(DR_PDR | DR_POW);
                value
            }
            OUT_T_MSB => {
                self.clear_ready(DR_TDR | DR_TOW);
                value
            }
            INT_SOURCE => {
                self.registers[INT_SOURCE as usize] = 0;
                value
            }
            CTRL_REG1 => {
                self.tick_conversion();
                value
            }
            _ => value,
        }
    }

    fn write_register(&mut self, addr: u8, value: u8) {
        match addr {
            STATUS..=OUT_T_DELTA_LSB | WHO_AM_I | INT_SOURCE => {
                trace!("write to read-only register 0x{:02X} ignored", addr);
            }
            CTRL_REG1 if value & CTRL_REG1_RST != 0 => {
                debug!("simulator: software reset");
                self.restore_defaults();
                self.booting = self.boot_transactions;
            }
            CTRL_REG1 => {
                let start = value & CTRL_REG1_OST != 0 && self.busy_polls.is_none();
                self.registers[CTRL_REG1 as usize] = value;
                if start {
                    self.start_conversion();
                }
            }
            _ => {
                if let Some(slot) = self.registers.get_mut(addr as usize) {
                    *slot = value;
                }
            }
        }
    }

    fn clear_ready(&mut self, flags: u8) {
        let status = &mut self.registers[DR_STATUS as usize];
        *status &= !flags;
        if *status & (DR_PDR | DR_TDR) == 0 {
            *status &= !(DR_PTDR | DR_PTOW);
        }
    }

    // =========================================================================
    // Conversions
    // =========================================================================

    fn start_conversion(&mut self) {
        if self.conversion_polls == 0 {
            self.complete_conversion();
        } else {
            self.busy_polls = Some(self.conversion_polls);
        }
    }

    fn tick_conversion(&mut self) {
        match self.busy_polls {
            Some(polls) if polls > 1 => self.busy_polls = Some(polls - 1),
            Some(_) => self.complete_conversion(),
            None => {}
        }
    }

    fn complete_conversion(&mut self) {
        self.busy_polls = None;
        self.registers[CTRL_REG1 as usize] &= !CTRL_REG1_OST;

        let conditions = self.environment.sample();
        let kind = match self.ctrl_reg1().mode() {
            DeviceMode::Barometer => Quantity::Pressure,
            DeviceMode::Altimeter => Quantity::Altitude,
        };
        let reference = codec::decode_barometric_reference([
            self.register(BAR_IN_MSB),
            self.register(BAR_IN_LSB),
        ]);

        let primary = match kind {
            Quantity::Altitude => {
                altitude_for(conditions.pressure_pa, reference as f64) as f32
                    + self.offset(Quantity::Altitude)
            }
            _ => conditions.pressure_pa as f32 + self.offset(Quantity::Pressure),
        };
        let temperature = conditions.temperature_c as f32 + self.offset(Quantity::Temperature);

        let sample = Published {
            kind,
            primary,
            temperature,
        };
        self.publish(sample);
        self.conversions += 1;
        debug!(
            "simulator: conversion {} {:?} = {}, T = {}",
            self.conversions, kind, primary, temperature
        );
    }

    fn offset(&self, kind: Quantity) -> f32 {
        let addr = match kind {
            Quantity::Pressure => OFF_P,
            Quantity::Altitude => OFF_H,
            Quantity::Temperature => OFF_T,
        };
        codec::decode_offset(kind, self.register(addr))
    }

    fn store(&mut self, addr: u8, value: f32, layout: BitLayout) {
        let start = addr as usize;
        let end = start + layout.byte_count();
        codec::encode_sample(
            PhysicalValue::from_f32(value, layout),
            layout,
            &mut self.registers[start..end],
        );
    }

    fn load(&self, addr: u8, layout: BitLayout) -> Option<f32> {
        let start = addr as usize;
        let raw = &self.registers[start..start + layout.byte_count()];
        if raw.iter().all(|&b| b == 0) {
            // cleared bank, seeded by the next sample
            None
        } else {
            Some(codec::decode(raw, layout).as_f32())
        }
    }

    fn publish(&mut self, sample: Published) {
        let primary_layout = BitLayout::for_sample(sample.kind);
        let temperature_layout = BitLayout::TEMPERATURE;

        self.store(OUT_P_MSB, sample.primary, primary_layout);
        self.store(OUT_T_MSB, sample.temperature, temperature_layout);

        // Deltas restart when the mode changes.
        let previous = self.last.filter(|last| last.kind == sample.kind);
        let (primary_delta, temperature_delta) = previous
            .map(|p| (sample.primary - p.primary, sample.temperature - p.temperature))
            .unwrap_or((0.0, 0.0));
        self.store(
            OUT_P_DELTA_MSB,
            primary_delta,
            BitLayout::for_delta(sample.kind),
        );
        self.store(OUT_T_DELTA_MSB, temperature_delta, temperature_layout);

        self.track_extremum(P_MIN_MSB, sample.primary, primary_layout, f32::min);
        self.track_extremum(P_MAX_MSB, sample.primary, primary_layout, f32::max);
        self.track_extremum(T_MIN_MSB, sample.temperature, temperature_layout, f32::min);
        self.track_extremum(T_MAX_MSB, sample.temperature, temperature_layout, f32::max);

        self.update_status();
        self.update_interrupts(previous, sample);
        self.last = Some(sample);
    }

    fn track_extremum(
        &mut self,
        addr: u8,
        value: f32,
        layout: BitLayout,
        pick: fn(f32, f32) -> f32,
    ) {
        let tracked = self
            .load(addr, layout)
            .map_or(value, |current| pick(current, value));
        self.store(addr, tracked, layout);
    }

    fn update_status(&mut self) {
        let status = &mut self.registers[DR_STATUS as usize];
        if *status & DR_PDR != 0 {
            *status |= DR_POW | DR_PTOW;
        }
        if *status & DR_TDR != 0 {
            *status |= DR_TOW | DR_PTOW;
        }
        *status |= DR_PDR | DR_TDR | DR_PTDR;
    }

    // =========================================================================
    // Interrupts
    // =========================================================================

    fn update_interrupts(&mut self, previous: Option<Published>, sample: Published) {
        let enabled = self.register(CTRL_REG4);
        let mut source = self.register(INT_SOURCE) | SRC_DRDY;

        let target_raw = [self.register(P_TGT_MSB), self.register(P_TGT_LSB)];
        let window_raw = [self.register(P_WND_MSB), self.register(P_WND_LSB)];
        let (target, window) = match sample.kind {
            Quantity::Altitude => (
                codec::decode_altitude_target(target_raw),
                codec::decode_altitude_window(window_raw),
            ),
            _ => (
                codec::decode_pressure_target(target_raw),
                codec::decode_pressure_window(window_raw),
            ),
        };
        let t_target = codec::decode_temperature_target(self.register(T_TGT));
        let t_window = codec::decode_temperature_window(self.register(T_WND));

        let prev_primary = previous.map(|p| p.primary);
        let prev_temperature = previous.map(|p| p.temperature);

        if target != 0 {
            if crossed(prev_primary, sample.primary, target, window) {
                source |= SRC_PTH;
            }
            if window != 0 && within(sample.primary, target, window) {
                source |= SRC_PW;
            }
        }
        if t_target != 0 {
            if crossed(prev_temperature, sample.temperature, t_target, t_window) {
                source |= SRC_TTH;
            }
            if t_window != 0 && within(sample.temperature, t_target, t_window) {
                source |= SRC_TW;
            }
        }
        if previous.is_some() {
            source |= SRC_PCHG | SRC_TCHG;
        }

        self.registers[INT_SOURCE as usize] = source & enabled;
    }
}

/// The reading moved across `target`, `target - window` or `target + window`.
fn crossed(previous: Option<f32>, current: f32, target: i32, window: i32) -> bool {
    let Some(previous) = previous else {
        return false;
    };
    [target - window, target, target + window]
        .iter()
        .map(|&level| level as f32)
        .any(|level| (previous < level) != (current < level))
}

fn within(value: f32, target: i32, window: i32) -> bool {
    ((target - window) as f32..=(target + window) as f32).contains(&value)
}

impl<E> ErrorType for SimulatedMpl3115a2<E> {
    type Error = ErrorKind;
}

impl<E: Environment> I2c<SevenBitAddress> for SimulatedMpl3115a2<E> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != I2C_ADDR {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        if self.booting > 0 {
            self.booting -= 1;
            trace!("simulator: booting, transaction refused");
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        let mut pointer_set = false;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        if pointer_set {
                            let addr = self.pointer;
                            self.write_register(addr, byte);
                            self.pointer = auto_increment(addr);
                        } else {
                            self.pointer = byte;
                            pointer_set = true;
                        }
                    }
                }
                Operation::Read(buffer) => {
                    for slot in buffer.iter_mut() {
                        let addr = self.pointer;
                        *slot = self.read_register(addr);
                        self.pointer = auto_increment(addr);
                    }
                }
            }
        }
        Ok(())
    }
}
