//! Conversion of raw format 5 fields to physical units.
//!
//! Values outside the documented sensor range are passed through as-is.

use crate::advertisement::{Format5Sample, PowerWord};

const TEMPERATURE_STEP: f64 = 0.005;
const HUMIDITY_STEP: f64 = 0.0025;
const PRESSURE_OFFSET: f64 = 50_000.0;
const MILLI: f64 = 1000.0;
const VOLTAGE_BASELINE: f64 = 1.6;
const TX_POWER_BASELINE: i16 = -40;
const TX_POWER_STEP: i16 = 2;

/// Temperature in degrees Celsius.
#[inline]
pub fn temperature_celsius(raw: i16) -> f64 {
    f64::from(raw) * TEMPERATURE_STEP
}

/// Relative humidity in percent.
#[inline]
pub fn humidity_percent(raw: u16) -> f64 {
    f64::from(raw) * HUMIDITY_STEP
}

/// Atmospheric pressure in Pascals.
#[inline]
pub fn pressure_pascals(raw: u16) -> f64 {
    f64::from(raw) + PRESSURE_OFFSET
}

/// Acceleration in g.
#[inline]
pub fn acceleration_g(raw: i16) -> f64 {
    f64::from(raw) / MILLI
}

/// Battery voltage in Volts.
#[inline]
pub fn battery_volts(power: PowerWord) -> f64 {
    VOLTAGE_BASELINE + f64::from(power.voltage_bits()) / MILLI
}

/// Transmit power in dBm.
#[inline]
pub fn tx_power_dbm(power: PowerWord) -> i16 {
    TX_POWER_BASELINE + TX_POWER_STEP * i16::from(power.tx_power_bits())
}

/// A format 5 sample in physical units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalSample {
    pub temperature: f64,
    pub humidity: f64,
    pub pressure: f64,
    pub acceleration: (f64, f64, f64),
    pub battery: f64,
    pub tx_power: i16,
    pub movement_counter: u8,
    pub measurement_sequence: u16,
}

/// Convert every field of `sample`.
pub fn convert(sample: &Format5Sample) -> PhysicalSample {
    PhysicalSample {
        temperature: temperature_celsius(sample.temperature),
        humidity: humidity_percent(sample.humidity),
        pressure: pressure_pascals(sample.pressure),
        acceleration: (
            acceleration_g(sample.acceleration_x),
            acceleration_g(sample.acceleration_y),
            acceleration_g(sample.acceleration_z),
        ),
        battery: battery_volts(sample.power),
        tx_power: tx_power_dbm(sample.power),
        movement_counter: sample.movement_counter,
        measurement_sequence: sample.measurement_sequence,
    }
}
