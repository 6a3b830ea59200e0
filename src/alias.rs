//! Display name overrides for sensors.
//!
//! Both upstreams identify a sensor by a string: Ruuvi Station by its tag ID
//! and the gateway by the device address. Overrides are keyed by that string
//! and looked up through [`NameLookup`], which the normalizers receive as a
//! read-only capability.

use std::collections::BTreeMap;

/// Read-only `sensor id -> display name` lookup.
pub trait NameLookup: Send + Sync {
    fn display_name(&self, sensor_id: &str) -> Option<&str>;
}

/// A type alias for sensor-ID-to-name mappings.
pub type AliasMap = BTreeMap<String, String>;

impl NameLookup for AliasMap {
    fn display_name(&self, sensor_id: &str) -> Option<&str> {
        self.get(sensor_id).map(String::as_str)
    }
}

/// Lookup that never overrides anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoAliases;

impl NameLookup for NoAliases {
    fn display_name(&self, _sensor_id: &str) -> Option<&str> {
        None
    }
}

/// A parsed alias mapping a sensor ID to a human-readable name.
#[derive(Debug, Clone)]
pub struct Alias {
    /// Station tag ID or gateway device address (e.g., "AA:BB:CC:DD:EE:FF")
    pub sensor_id: String,
    /// The human-readable name (e.g., "Sauna")
    pub name: String,
}

/// Parse an alias from a string in the format "ID=NAME".
///
/// # Example
/// ```
/// use ruuvi_ingest::alias::parse_alias;
///
/// let alias = parse_alias("AA:BB:CC:DD:EE:FF=Kitchen").unwrap();
/// assert_eq!(alias.sensor_id, "AA:BB:CC:DD:EE:FF");
/// assert_eq!(alias.name, "Kitchen");
/// ```
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    match src.split_once('=') {
        Some((sensor_id, name)) if !sensor_id.is_empty() && !name.is_empty() => Ok(Alias {
            sensor_id: sensor_id.into(),
            name: name.into(),
        }),
        _ => Err("invalid alias: expected format ID=NAME".into()),
    }
}

/// Convert a slice of Alias values into an AliasMap. Later entries win.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.sensor_id.clone(), a.name.clone()))
        .collect()
}
