//! The fixed set of per-sensor metrics.
//!
//! Every place that needs to walk the metrics of a reading goes through
//! [`Metric::ALL`], and every per-metric decision is an exhaustive `match`, so
//! adding a metric fails to compile until all of them handle it.

use std::fmt;

/// Whether a metric holds a whole number or a floating point value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Integer,
    Float,
}

/// A metric value as extracted from a source record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl MetricValue {
    pub fn as_f64(self) -> f64 {
        match self {
            MetricValue::Integer(value) => value as f64,
            MetricValue::Float(value) => value,
        }
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(value) => write!(f, "{value}"),
            MetricValue::Float(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Temperature,
    Pressure,
    Humidity,
    AccelX,
    AccelY,
    AccelZ,
    Voltage,
    TxPower,
    Rssi,
    DataFormat,
    MovementCounter,
    MeasurementSequenceNumber,
}

impl Metric {
    pub const ALL: [Metric; 12] = [
        Metric::Temperature,
        Metric::Pressure,
        Metric::Humidity,
        Metric::AccelX,
        Metric::AccelY,
        Metric::AccelZ,
        Metric::Voltage,
        Metric::TxPower,
        Metric::Rssi,
        Metric::DataFormat,
        Metric::MovementCounter,
        Metric::MeasurementSequenceNumber,
    ];

    /// Lower-case metric name, also the field name in station records.
    pub fn name(self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Pressure => "pressure",
            Metric::Humidity => "humidity",
            Metric::AccelX => "accelx",
            Metric::AccelY => "accely",
            Metric::AccelZ => "accelz",
            Metric::Voltage => "voltage",
            Metric::TxPower => "txpower",
            Metric::Rssi => "rssi",
            Metric::DataFormat => "dataformat",
            Metric::MovementCounter => "movementcounter",
            Metric::MeasurementSequenceNumber => "measurementsequencenumber",
        }
    }

    pub fn kind(self) -> MetricKind {
        match self {
            Metric::Rssi
            | Metric::DataFormat
            | Metric::MovementCounter
            | Metric::MeasurementSequenceNumber => MetricKind::Integer,
            Metric::Temperature
            | Metric::Pressure
            | Metric::Humidity
            | Metric::AccelX
            | Metric::AccelY
            | Metric::AccelZ
            | Metric::Voltage
            | Metric::TxPower => MetricKind::Float,
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
