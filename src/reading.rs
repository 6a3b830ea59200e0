//! Canonical per-sensor reading produced by both normalizers.

use crate::metric::{Metric, MetricValue};
use time::OffsetDateTime;

/// Station-wide values copied onto every reading of a station envelope.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StationContext {
    /// Battery level of the relaying phone in percent
    pub battery_level: Option<i64>,
    pub location_accuracy: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A reading from one sensor at one point in time.
///
/// Units:
/// - Temperature in Celsius
/// - Pressure in Pascals
/// - Humidity in percent
/// - Acceleration in g
/// - Battery voltage in Volts
/// - TX power and RSSI in dBm
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalReading {
    /// Station tag ID or gateway device address
    pub sensor_id: String,
    /// Human-readable name, falls back to the sensor ID
    pub display_name: String,
    pub temperature: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub acceleration_x: Option<f64>,
    pub acceleration_y: Option<f64>,
    pub acceleration_z: Option<f64>,
    pub battery_voltage: Option<f64>,
    pub tx_power: Option<f64>,
    /// Signal strength as seen by the receiving radio
    pub rssi: Option<i64>,
    pub data_format: Option<i64>,
    pub movement_counter: Option<i64>,
    pub measurement_sequence: Option<i64>,
    /// `None` when the source timestamp could not be parsed
    pub updated_at: Option<OffsetDateTime>,
    /// Present only for readings relayed by Ruuvi Station
    pub station: Option<StationContext>,
}

impl CanonicalReading {
    /// A reading with no measurements.
    pub fn new(sensor_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        CanonicalReading {
            sensor_id: sensor_id.into(),
            display_name: display_name.into(),
            temperature: None,
            pressure: None,
            humidity: None,
            acceleration_x: None,
            acceleration_y: None,
            acceleration_z: None,
            battery_voltage: None,
            tx_power: None,
            rssi: None,
            data_format: None,
            movement_counter: None,
            measurement_sequence: None,
            updated_at: None,
            station: None,
        }
    }

    pub fn metric(&self, metric: Metric) -> Option<MetricValue> {
        match metric {
            Metric::Temperature => self.temperature.map(MetricValue::Float),
            Metric::Pressure => self.pressure.map(MetricValue::Float),
            Metric::Humidity => self.humidity.map(MetricValue::Float),
            Metric::AccelX => self.acceleration_x.map(MetricValue::Float),
            Metric::AccelY => self.acceleration_y.map(MetricValue::Float),
            Metric::AccelZ => self.acceleration_z.map(MetricValue::Float),
            Metric::Voltage => self.battery_voltage.map(MetricValue::Float),
            Metric::TxPower => self.tx_power.map(MetricValue::Float),
            Metric::Rssi => self.rssi.map(MetricValue::Integer),
            Metric::DataFormat => self.data_format.map(MetricValue::Integer),
            Metric::MovementCounter => self.movement_counter.map(MetricValue::Integer),
            Metric::MeasurementSequenceNumber => {
                self.measurement_sequence.map(MetricValue::Integer)
            }
        }
    }

    pub fn set_metric(&mut self, metric: Metric, value: MetricValue) {
        let float = value.as_f64();
        let integer = match value {
            MetricValue::Integer(v) => v,
            MetricValue::Float(v) => v as i64,
        };
        match metric {
            Metric::Temperature => self.temperature = Some(float),
            Metric::Pressure => self.pressure = Some(float),
            Metric::Humidity => self.humidity = Some(float),
            Metric::AccelX => self.acceleration_x = Some(float),
            Metric::AccelY => self.acceleration_y = Some(float),
            Metric::AccelZ => self.acceleration_z = Some(float),
            Metric::Voltage => self.battery_voltage = Some(float),
            Metric::TxPower => self.tx_power = Some(float),
            Metric::Rssi => self.rssi = Some(integer),
            Metric::DataFormat => self.data_format = Some(integer),
            Metric::MovementCounter => self.movement_counter = Some(integer),
            Metric::MeasurementSequenceNumber => self.measurement_sequence = Some(integer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::MetricKind;

    #[test]
    fn test_new_reading_is_empty() {
        let reading = CanonicalReading::new("id", "name");
        assert_eq!(reading.sensor_id, "id");
        assert_eq!(reading.display_name, "name");
        for metric in Metric::ALL {
            assert_eq!(reading.metric(metric), None);
        }
        assert!(reading.updated_at.is_none());
        assert!(reading.station.is_none());
    }

    #[test]
    fn test_set_metric_round_trips_every_metric() {
        let mut reading = CanonicalReading::new("id", "id");
        for (i, metric) in Metric::ALL.into_iter().enumerate() {
            let value = match metric.kind() {
                MetricKind::Integer => MetricValue::Integer(i as i64),
                MetricKind::Float => MetricValue::Float(i as f64 + 0.5),
            };
            reading.set_metric(metric, value);
            assert_eq!(reading.metric(metric), Some(value), "{metric}");
        }
    }

    #[test]
    fn test_set_metric_fields() {
        let mut reading = CanonicalReading::new("id", "id");
        reading.set_metric(Metric::AccelY, MetricValue::Float(-0.004));
        reading.set_metric(Metric::MovementCounter, MetricValue::Integer(66));
        assert_eq!(reading.acceleration_y, Some(-0.004));
        assert_eq!(reading.movement_counter, Some(66));
        assert_eq!(reading.acceleration_x, None);
    }
}
