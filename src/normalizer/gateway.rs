//! Normalizer for Ruuvi Gateway envelopes.
//!
//! The gateway relays every advertisement it hears, keyed by device address:
//!
//! ```json
//! {"AA:BB:CC:DD:EE:FF": {"rssi": -72, "timestamp": 1700000000, "data": "0201061BFF9904..."}}
//! ```
//!
//! The HTTP payload posted by the gateway firmware wraps the same map as
//! `{"data": {"tags": {...}}}` and sends timestamps as strings; both forms
//! are accepted.

use super::{Diagnostic, NormalizeResult, Normalized, Schema, SchemaMismatch, resolve_name};
use crate::advertisement::{self, DATA_FORMAT_5, Format5Sample};
use crate::alias::NameLookup;
use crate::reading::CanonicalReading;
use crate::units;
use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// One relayed advertisement.
#[derive(Debug, Deserialize)]
struct GatewayEntry {
    /// Signal strength measured by the gateway radio
    rssi: i64,
    /// Receive time, seconds since the Unix epoch
    timestamp: UnixTime,
    /// Hex-encoded advertisement
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum UnixTime {
    Seconds(i64),
    Text(String),
}

impl UnixTime {
    fn to_datetime(&self) -> Option<OffsetDateTime> {
        let seconds = match self {
            UnixTime::Seconds(seconds) => *seconds,
            UnixTime::Text(text) => text.trim().parse().ok()?,
        };
        OffsetDateTime::from_unix_timestamp(seconds).ok()
    }

    fn raw(&self) -> String {
        match self {
            UnixTime::Seconds(seconds) => seconds.to_string(),
            UnixTime::Text(text) => text.clone(),
        }
    }
}

fn entries(value: &Value) -> Result<BTreeMap<String, GatewayEntry>, SchemaMismatch> {
    let tags = match value.pointer("/data/tags") {
        Some(tags) if tags.is_object() => tags,
        _ => value,
    };
    if !tags.is_object() {
        return Err(SchemaMismatch::new(
            Schema::Gateway,
            "expected an object keyed by device address",
        ));
    }
    BTreeMap::<String, GatewayEntry>::deserialize(tags)
        .map_err(|e| SchemaMismatch::new(Schema::Gateway, e.to_string()))
}

fn to_reading(sensor_id: &str, sample: &Format5Sample, names: &dyn NameLookup) -> CanonicalReading {
    let physical = units::convert(sample);
    let (x, y, z) = physical.acceleration;

    let mut reading = CanonicalReading::new(sensor_id, resolve_name(names, sensor_id, None));
    reading.temperature = Some(physical.temperature);
    reading.pressure = Some(physical.pressure);
    reading.humidity = Some(physical.humidity);
    reading.acceleration_x = Some(x);
    reading.acceleration_y = Some(y);
    reading.acceleration_z = Some(z);
    reading.battery_voltage = Some(physical.battery);
    reading.tx_power = Some(f64::from(physical.tx_power));
    reading.data_format = Some(i64::from(DATA_FORMAT_5));
    reading.movement_counter = Some(i64::from(physical.movement_counter));
    reading.measurement_sequence = Some(i64::from(physical.measurement_sequence));
    reading
}

/// Normalize a gateway envelope.
///
/// Entries whose advertisement does not decode are skipped and reported as
/// [`Diagnostic::Undecodable`]; the remaining entries still produce
/// readings. Readings are ordered by device address.
pub fn normalize(value: &Value, names: &dyn NameLookup) -> NormalizeResult {
    let mut normalized = Normalized::default();

    for (address, entry) in entries(value)? {
        let advertisement = match advertisement::decode_hex(&entry.data) {
            Ok(advertisement) => advertisement,
            Err(source) => {
                debug!("Skipping gateway entry {address}: {source}");
                normalized.diagnostics.push(Diagnostic::Undecodable {
                    sensor_id: address,
                    source,
                });
                continue;
            }
        };

        let mut reading = to_reading(&address, &advertisement.sample, names);
        reading.rssi = Some(entry.rssi);
        reading.updated_at = entry.timestamp.to_datetime();
        if reading.updated_at.is_none() {
            normalized.diagnostics.push(Diagnostic::TimestampUnparsable {
                sensor_id: address,
                value: entry.timestamp.raw(),
            });
        }
        normalized.readings.push(reading);
    }

    Ok(normalized)
}
