//! Normalizer for Ruuvi Station envelopes.
//!
//! The Ruuvi Station app posts values it already decoded on the phone:
//!
//! ```json
//! {
//!   "deviceId": "...", "batteryLevel": 64,
//!   "location": {"accuracy": 12.0, "latitude": 60.17, "longitude": 24.94},
//!   "tags": [{"id": "...", "name": "Office", "temperature": 21.5, "updateAt": "2020-04-09T15:01:59+0200", ...}]
//! }
//! ```
//!
//! Key casing is not stable across app versions, so keys match exactly first
//! and then ASCII case-insensitively.
//!
//! See: https://docs.ruuvi.com/ruuvi-station-app/gateway

use super::{Diagnostic, NormalizeResult, Normalized, Schema, SchemaMismatch, resolve_name};
use crate::alias::NameLookup;
use crate::metric::{Metric, MetricKind, MetricValue};
use crate::reading::{CanonicalReading, StationContext};
use log::debug;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::macros::format_description;

/// One tag record of a station envelope.
#[derive(Debug)]
struct StationTag {
    id: String,
    name: Option<String>,
    update_at: Option<String>,
    metrics: Vec<(Metric, MetricValue)>,
}

#[derive(Debug)]
struct StationEnvelope {
    context: StationContext,
    tags: Vec<StationTag>,
}

/// Typed, case-insensitive access to the fields of a JSON object.
struct Fields<'a> {
    map: &'a Map<String, Value>,
    path: String,
}

impl<'a> Fields<'a> {
    fn of(value: &'a Value, path: impl Into<String>) -> Result<Self, SchemaMismatch> {
        let path = path.into();
        match value.as_object() {
            Some(map) => Ok(Fields { map, path }),
            None => Err(mismatch(format!("{path}: expected an object, got {value}"))),
        }
    }

    /// Field value, `null` counts as absent.
    fn get(&self, name: &str) -> Option<&'a Value> {
        self.map
            .get(name)
            .or_else(|| {
                self.map
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, value)| value)
            })
            .filter(|value| !value.is_null())
    }

    fn typed<T>(
        &self,
        name: &str,
        expected: &str,
        convert: impl FnOnce(&'a Value) -> Option<T>,
    ) -> Result<Option<T>, SchemaMismatch> {
        match self.get(name) {
            None => Ok(None),
            Some(value) => convert(value).map(Some).ok_or_else(|| {
                mismatch(format!(
                    "{}.{name}: expected {expected}, got {value}",
                    self.path
                ))
            }),
        }
    }

    fn string(&self, name: &str) -> Result<Option<&'a str>, SchemaMismatch> {
        self.typed(name, "a string", Value::as_str)
    }

    fn integer(&self, name: &str) -> Result<Option<i64>, SchemaMismatch> {
        self.typed(name, "an integer", Value::as_i64)
    }

    fn float(&self, name: &str) -> Result<Option<f64>, SchemaMismatch> {
        self.typed(name, "a number", Value::as_f64)
    }

    fn metric(&self, metric: Metric) -> Result<Option<MetricValue>, SchemaMismatch> {
        Ok(match metric.kind() {
            MetricKind::Integer => self.integer(metric.name())?.map(MetricValue::Integer),
            MetricKind::Float => self.float(metric.name())?.map(MetricValue::Float),
        })
    }
}

fn mismatch(reason: String) -> SchemaMismatch {
    SchemaMismatch::new(Schema::Station, reason)
}

fn parse_tag(value: &Value, index: usize) -> Result<StationTag, SchemaMismatch> {
    let fields = Fields::of(value, format!("tags[{index}]"))?;

    let id = fields
        .string("id")?
        .ok_or_else(|| mismatch(format!("tags[{index}]: missing id")))?;

    let mut metrics = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        if let Some(value) = fields.metric(metric)? {
            metrics.push((metric, value));
        }
    }

    Ok(StationTag {
        id: id.to_string(),
        name: fields.string("name")?.map(str::to_string),
        update_at: fields.string("updateAt")?.map(str::to_string),
        metrics,
    })
}

fn parse_envelope(value: &Value) -> Result<StationEnvelope, SchemaMismatch> {
    let fields = Fields::of(value, "envelope")?;

    let tags = match fields.get("tags") {
        Some(Value::Array(tags)) => tags,
        Some(other) => return Err(mismatch(format!("tags: expected an array, got {other}"))),
        None => return Err(mismatch("missing tags".to_string())),
    };

    let mut context = StationContext {
        battery_level: fields.integer("batteryLevel")?,
        ..StationContext::default()
    };
    if let Some(location) = fields.get("location") {
        let location = Fields::of(location, "location")?;
        context.location_accuracy = location.float("accuracy")?;
        context.latitude = location.float("latitude")?;
        context.longitude = location.float("longitude")?;
    }

    let tags = tags
        .iter()
        .enumerate()
        .map(|(index, tag)| parse_tag(tag, index))
        .collect::<Result<_, _>>()?;

    Ok(StationEnvelope { context, tags })
}

/// Parse an `updateAt` timestamp: `2020-04-09T15:01:59+0200`, or the same
/// with a colon in the offset.
pub fn parse_update_at(text: &str) -> Option<OffsetDateTime> {
    let compact = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory][offset_minute]"
    );
    let extended = format_description!(
        "[year]-[month]-[day]T[hour]:[minute]:[second][offset_hour sign:mandatory]:[offset_minute]"
    );

    OffsetDateTime::parse(text, compact)
        .or_else(|_| OffsetDateTime::parse(text, extended))
        .ok()
}

/// Normalize a station envelope.
///
/// Every tag produces a reading. The station's battery level and location
/// are copied onto each of them. An unparsable `updateAt` leaves
/// `updated_at` empty and adds a [`Diagnostic::TimestampUnparsable`].
pub fn normalize(value: &Value, names: &dyn NameLookup) -> NormalizeResult {
    let envelope = parse_envelope(value)?;
    let mut normalized = Normalized::default();

    for tag in envelope.tags {
        let display_name = resolve_name(names, &tag.id, tag.name.as_deref());
        let mut reading = CanonicalReading::new(tag.id, display_name);
        for (metric, value) in tag.metrics {
            reading.set_metric(metric, value);
        }
        reading.station = Some(envelope.context);

        if let Some(update_at) = tag.update_at {
            reading.updated_at = parse_update_at(&update_at);
            if reading.updated_at.is_none() {
                debug!("Unable to parse {update_at:?} for tag {}", reading.sensor_id);
                normalized.diagnostics.push(Diagnostic::TimestampUnparsable {
                    sensor_id: reading.sensor_id.clone(),
                    value: update_at,
                });
            }
        }

        normalized.readings.push(reading);
    }

    Ok(normalized)
}
