//! InfluxDB line protocol output formatter.

use crate::metric::{Metric, MetricValue};
use crate::output::OutputFormatter;
use crate::reading::CanonicalReading;
use std::collections::BTreeMap;
use std::fmt;
use time::OffsetDateTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    /// Written with the `i` suffix
    Integer(i64),
}

impl From<MetricValue> for FieldValue {
    fn from(value: MetricValue) -> Self {
        match value {
            MetricValue::Integer(n) => FieldValue::Integer(n),
            MetricValue::Float(x) => FieldValue::Float(x),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<OffsetDateTime>,
}

/// Backslash-escape `special` characters of `value`.
fn write_escaped(fmt: &mut fmt::Formatter, value: &str, special: &[char]) -> fmt::Result {
    for c in value.chars() {
        if special.contains(&c) {
            fmt.write_str("\\")?;
        }
        write!(fmt, "{c}")?;
    }
    Ok(())
}

/// Characters escaped in measurement names.
const MEASUREMENT_SPECIAL: &[char] = &[',', ' '];

/// Characters escaped in tag values.
const TAG_SPECIAL: &[char] = &[',', '=', ' '];

impl fmt::Display for DataPoint {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write_escaped(fmt, &self.measurement, MEASUREMENT_SPECIAL)?;
        for (key, value) in &self.tag_set {
            write!(fmt, ",{key}=")?;
            write_escaped(fmt, value, TAG_SPECIAL)?;
        }
        for (i, (key, value)) in self.field_set.iter().enumerate() {
            let separator = if i == 0 { ' ' } else { ',' };
            write!(fmt, "{separator}{key}={value}")?;
        }
        if let Some(time) = self.timestamp {
            write!(fmt, " {}", time.unix_timestamp_nanos())?;
        }
        Ok(())
    }
}

/// Renders readings as InfluxDB line protocol.
///
/// Field names and units follow the Telegraf RuuviTag conventions: humidity
/// as a fraction, pressure in kilopascals, battery voltage as
/// `battery_potential`. Counters and RSSI are integer fields. Readings
/// without a timestamp are written without one, so the server assigns its own.
/// Readings without any field have no line protocol form and are skipped.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    /// Percent to fraction (0-1).
    fn humidity_fraction(percent: f64) -> f64 {
        percent / 100.0
    }

    /// Pascals to kilopascals.
    fn pressure_kpa(pascals: f64) -> f64 {
        pascals / 1000.0
    }

    fn field_name(metric: Metric) -> &'static str {
        match metric {
            Metric::Temperature => "temperature",
            Metric::Pressure => "pressure",
            Metric::Humidity => "humidity",
            Metric::AccelX => "acceleration_x",
            Metric::AccelY => "acceleration_y",
            Metric::AccelZ => "acceleration_z",
            Metric::Voltage => "battery_potential",
            Metric::TxPower => "tx_power",
            Metric::Rssi => "rssi",
            Metric::DataFormat => "data_format",
            Metric::MovementCounter => "movement_counter",
            Metric::MeasurementSequenceNumber => "measurement_sequence_number",
        }
    }

    fn tag_set(&self, reading: &CanonicalReading) -> BTreeMap<String, String> {
        let mut tags = BTreeMap::new();
        tags.insert("id".to_string(), reading.sensor_id.clone());
        tags.insert("name".to_string(), reading.display_name.clone());
        tags
    }

    /// Build the field set. Absent values are omitted.
    fn field_set(&self, reading: &CanonicalReading) -> BTreeMap<String, FieldValue> {
        let mut fields: BTreeMap<String, FieldValue> = Metric::ALL
            .into_iter()
            .filter_map(|metric| {
                let value = match (metric, reading.metric(metric)?) {
                    (Metric::Humidity, v) => FieldValue::Float(Self::humidity_fraction(v.as_f64())),
                    (Metric::Pressure, v) => FieldValue::Float(Self::pressure_kpa(v.as_f64())),
                    (_, v) => v.into(),
                };
                Some((Self::field_name(metric).to_string(), value))
            })
            .collect();

        if let Some(station) = reading.station {
            let context = [
                ("station_battery_level", station.battery_level.map(FieldValue::Integer)),
                ("station_location_accuracy", station.location_accuracy.map(FieldValue::Float)),
                ("station_latitude", station.latitude.map(FieldValue::Float)),
                ("station_longitude", station.longitude.map(FieldValue::Float)),
            ];
            for (name, value) in context {
                if let Some(value) = value {
                    fields.insert(name.to_string(), value);
                }
            }
        }

        fields
    }

    fn to_data_point(&self, reading: &CanonicalReading) -> DataPoint {
        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set: self.tag_set(reading),
            field_set: self.field_set(reading),
            timestamp: reading.updated_at,
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &CanonicalReading) -> Option<String> {
        let data_point = self.to_data_point(reading);
        if data_point.field_set.is_empty() {
            return None;
        }
        Some(data_point.to_string())
    }
}
