//! Normalizers turning upstream JSON envelopes into canonical readings.
//!
//! Each upstream has its own normalizer. Both are side-effect-free functions
//! over an already parsed [`serde_json::Value`] returning a
//! [`NormalizeResult`]: either the envelope matched and produced readings
//! (plus non-fatal diagnostics), or it did not match the schema at all.

pub mod gateway;
pub mod station;

use crate::advertisement::DecodeError;
use crate::alias::NameLookup;
use crate::reading::CanonicalReading;
use std::fmt;
use thiserror::Error;

/// The upstream envelope schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// Ruuvi Station app: pre-decoded values per tag
    Station,
    /// Ruuvi Gateway: raw advertisements keyed by device address
    Gateway,
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Station => write!(f, "station"),
            Schema::Gateway => write!(f, "gateway"),
        }
    }
}

/// The payload as a whole does not have the shape of an envelope.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Not a {schema} envelope: {reason}")]
pub struct SchemaMismatch {
    pub schema: Schema,
    pub reason: String,
}

impl SchemaMismatch {
    pub(crate) fn new(schema: Schema, reason: impl Into<String>) -> Self {
        SchemaMismatch {
            schema,
            reason: reason.into(),
        }
    }
}

/// A problem with a single entry that did not stop the rest of the envelope.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The advertisement of a gateway entry could not be decoded; entry skipped
    #[error("{sensor_id}: {source}")]
    Undecodable {
        sensor_id: String,
        source: DecodeError,
    },
    /// The reading was produced without a timestamp
    #[error("{sensor_id}: unparsable timestamp {value:?}")]
    TimestampUnparsable { sensor_id: String, value: String },
}

/// Readings and diagnostics of one or more matched envelopes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Normalized {
    pub readings: Vec<CanonicalReading>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Normalized {
    pub fn append(&mut self, mut other: Normalized) {
        self.readings.append(&mut other.readings);
        self.diagnostics.append(&mut other.diagnostics);
    }
}

/// Result of running one normalizer over a payload.
pub type NormalizeResult = Result<Normalized, SchemaMismatch>;

/// Pick the display name: configured override, then the upstream name, then
/// the sensor ID itself.
fn resolve_name(names: &dyn NameLookup, sensor_id: &str, upstream: Option<&str>) -> String {
    names
        .display_name(sensor_id)
        .or(upstream.filter(|name| !name.is_empty()))
        .unwrap_or(sensor_id)
        .to_string()
}
