//! Core application runner (business logic) for `ruuvi-ingest`.
//!
//! This module is decoupled from CLI parsing and process exit codes so it can
//! be tested deterministically.

use crate::advertisement::{self, DecodeError};
use crate::alias::{Alias, AliasMap};
use crate::ingest::ingest;
use crate::output::OutputFormatter;
use crate::output::influxdb::InfluxDbFormatter;
use crate::reading::CanonicalReading;
use crate::source::PayloadSource;
use crate::units;
use clap::Parser;
use log::info;
use std::io;
use std::io::Write;
use thiserror::Error;

/// Configuration for the core run loop.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// The name of the measurement in InfluxDB line protocol.
    #[arg(long, default_value = "ruuvi_measurement")]
    pub influxdb_measurement: String,

    /// Specify human-readable alias for a sensor id.
    /// Format: --alias DE:AD:BE:EF:00:00=Sauna
    #[arg(long = "alias", value_parser = crate::alias::parse_alias, value_name = "ALIAS")]
    pub aliases: Vec<Alias>,

    /// Verbose output, print rejected payloads and skipped entries
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Decode a single hex-encoded advertisement, print it and exit
    #[arg(long, value_name = "HEX")]
    pub decode_data: Option<String>,
}

/// Errors returned by the core run loop.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Write one reading. Returns `false` when the formatter had nothing to write.
fn write_reading(
    formatter: &dyn OutputFormatter,
    reading: &CanonicalReading,
    out: &mut dyn Write,
) -> io::Result<bool> {
    match formatter.format(reading) {
        Some(line) => writeln!(out, "{line}").map(|_| true),
        None => Ok(false),
    }
}

/// Run the core processing loop, writing formatted output to `out` and verbose errors to `err`.
///
/// - Every reading of an accepted payload is formatted and written as one line to `out`.
///   Readings without any value are skipped.
/// - Rejected payloads, per-entry diagnostics and skipped readings are written to
///   `err` only when `options.verbose` is true.
pub async fn run_with_io(
    options: Options,
    source: &dyn PayloadSource,
    out: &mut dyn Write,
    err: &mut dyn Write,
) -> Result<(), RunError> {
    let aliases: AliasMap = crate::alias::to_map(&options.aliases);
    let formatter = InfluxDbFormatter::new(options.influxdb_measurement);

    let mut payloads = source.start().await?;
    let mut accepted = 0usize;
    let mut rejected = 0usize;

    while let Some(payload) = payloads.recv().await {
        match ingest(&payload, &aliases) {
            Ok(normalized) => {
                accepted += 1;
                for reading in &normalized.readings {
                    let written = write_reading(&formatter, reading, out)?;
                    if !written && options.verbose {
                        writeln!(err, "{}: no values to write, reading skipped", reading.sensor_id)?;
                    }
                }
                if options.verbose {
                    for diagnostic in &normalized.diagnostics {
                        writeln!(err, "{diagnostic}")?;
                    }
                }
            }
            Err(ingest_err) => {
                rejected += 1;
                if options.verbose {
                    writeln!(err, "{ingest_err}")?;
                }
            }
        }
    }

    info!("Input closed: {accepted} payloads accepted, {rejected} rejected");
    Ok(())
}

/// Decode one hex-encoded advertisement and print the frame and its
/// physical values to `out`.
pub fn decode_data(hex: &str, out: &mut dyn Write) -> Result<(), RunError> {
    let advertisement = advertisement::decode_hex(hex)?;
    let physical = units::convert(&advertisement.sample);
    writeln!(out, "{advertisement:#?}")?;
    writeln!(out, "{physical:#?}")?;
    Ok(())
}
