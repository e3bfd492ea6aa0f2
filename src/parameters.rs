//! Key/value parameter strings exchanged with the host.
//!
//! Parameters travel as `key=value` pairs joined by `;`, for example
//! `routing=2;screen_state=on`. Only the [`ROUTING_KEY`] is interpreted here;
//! every other key is carried along and ignored.

use std::collections::BTreeMap;
use std::fmt;

use crate::OutputDevice;

/// Key selecting the output device bitmask.
pub const ROUTING_KEY: &str = "routing";

/// Parsed parameter string.
///
/// # Example
///
/// ```
/// use pcm_bridge::{OutputDevice, Parameters};
///
/// let params = Parameters::parse("routing=8;volume=high");
/// assert_eq!(params.routing(), Some(OutputDevice::WiredHeadphone));
/// assert_eq!(params.get("volume"), Some("high"));
/// assert_eq!(params.to_string(), "routing=8;volume=high");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Parameters {
    pairs: BTreeMap<String, String>,
}

impl Parameters {
    /// Parses `key=value;key=value`.
    ///
    /// Empty segments are skipped, a key without `=` gets an empty value,
    /// surrounding whitespace is trimmed and a repeated key keeps its last
    /// value.
    pub fn parse(input: &str) -> Self {
        let pairs = input
            .split(';')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .map(|segment| match segment.split_once('=') {
                Some((key, value)) => (key.trim().to_string(), value.trim().to_string()),
                None => (segment.to_string(), String::new()),
            })
            .collect();
        Self { pairs }
    }

    /// Returns the value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    /// Sets `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.insert(key.into(), value.into());
    }

    /// Output device requested by the routing key.
    ///
    /// Returns `None` when the key is absent or its value is not a decimal
    /// device bitmask.
    pub fn routing(&self) -> Option<OutputDevice> {
        let raw = self.get(ROUTING_KEY)?;
        match raw.parse::<u32>() {
            Ok(bits) => Some(OutputDevice::from_bits(bits)),
            Err(_) => {
                tracing::warn!(value = raw, "ignoring non-numeric routing value");
                None
            }
        }
    }
}

impl fmt::Display for Parameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.pairs.iter().enumerate() {
            if i > 0 {
                f.write_str(";")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}
