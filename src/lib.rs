//! `ruuvi-ingest` library.
//!
//! Turns RuuviTag telemetry from two upstreams into canonical readings:
//! Ruuvi Station posts pre-decoded values per tag, Ruuvi Gateway relays raw
//! BLE advertisements which are decoded with [`crate::advertisement`] and
//! converted with [`crate::units`].
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit codes.
//! The core “business logic” lives in [`crate::app`] where it can be tested
//! deterministically with an injected payload source + injected output streams.

pub mod advertisement;
pub mod alias;
pub mod app;
pub mod ingest;
pub mod mac_address;
pub mod metric;
pub mod normalizer;
pub mod output;
pub mod reading;
pub mod source;
pub mod units;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use advertisement::{BleAdvertisement, DecodeError, Format5Sample, PowerWord};
pub use alias::{Alias, AliasMap, NameLookup, NoAliases, parse_alias, to_map};
pub use ingest::{IngestError, IngestionOutcome, RawPayload, ingest};
pub use mac_address::MacAddress;
pub use metric::{Metric, MetricKind, MetricValue};
pub use normalizer::{Diagnostic, Normalized, Schema, SchemaMismatch};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use reading::{CanonicalReading, StationContext};
pub use source::{PayloadSource, StdinSource};
pub use units::PhysicalSample;
