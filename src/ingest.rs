//! Ingestion dispatcher.
//!
//! A payload carries no tag saying which upstream sent it. It is parsed as
//! JSON once and offered to both normalizers; every normalizer whose schema
//! matches contributes its readings.

use crate::alias::NameLookup;
use crate::normalizer::{Normalized, Schema, SchemaMismatch, gateway, station};
use log::warn;
use serde_json::Value;
use thiserror::Error;

/// Bytes received from a transport, consumed once by [`ingest`].
pub type RawPayload = Vec<u8>;

/// Errors returned when a payload matches no known schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IngestError {
    #[error("Unrecognized payload: {station}; {gateway}")]
    Unrecognized {
        station: SchemaMismatch,
        gateway: SchemaMismatch,
    },
}

/// Result of ingesting one payload.
pub type IngestionOutcome = Result<Normalized, IngestError>;

/// Ingest one payload.
///
/// Station readings come first, then gateway readings. Malformed input is
/// reported through [`IngestError`]; this function does not panic.
pub fn ingest(payload: &[u8], names: &dyn NameLookup) -> IngestionOutcome {
    let value: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => {
            let reason = format!("invalid JSON: {e}");
            warn!("Rejecting payload of {} bytes: {reason}", payload.len());
            return Err(IngestError::Unrecognized {
                station: SchemaMismatch::new(Schema::Station, reason.clone()),
                gateway: SchemaMismatch::new(Schema::Gateway, reason),
            });
        }
    };

    match (
        station::normalize(&value, names),
        gateway::normalize(&value, names),
    ) {
        (Ok(mut from_station), Ok(from_gateway)) => {
            from_station.append(from_gateway);
            Ok(from_station)
        }
        (Ok(normalized), Err(_)) | (Err(_), Ok(normalized)) => Ok(normalized),
        (Err(station), Err(gateway)) => {
            warn!("Rejecting payload: {station}; {gateway}");
            Err(IngestError::Unrecognized { station, gateway })
        }
    }
}
