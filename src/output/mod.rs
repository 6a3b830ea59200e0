//! Output formatters for canonical readings.
//!
//! This module provides a trait for formatting readings and an implementation
//! for InfluxDB line protocol.

pub mod influxdb;

use crate::reading::CanonicalReading;

/// Trait for formatting readings into output strings.
///
/// Implementations of this trait convert a `CanonicalReading` into a single
/// formatted line suitable for a specific output format, or `None` when the
/// reading has nothing the format can express.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading.
    ///
    /// # Arguments
    /// * `reading` - The reading to format, display name already resolved
    ///
    /// # Returns
    /// A formatted string representation of the reading, if it has one
    fn format(&self, reading: &CanonicalReading) -> Option<String>;
}
