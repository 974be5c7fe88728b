//! Parsing for byte offsets and sizes written by hand in config files.
//!
//! Flash maps are usually copied out of datasheets, so values show up as
//! plain numbers, hex strings (`0x8000`) or sizes with a unit (`16kB`).

use serde::de::{self, Deserializer};
use serde::Deserialize;

#[derive(Deserialize)]
#[serde(untagged)]
enum SizeRepr {
    Int(u64),
    Text(String),
}

/// Parse a size or offset string.
///
/// Accepts decimal, `0x`-prefixed hex, and an optional `kB` / `MB` suffix
/// (binary multiples, case-insensitive).
pub fn parse_size(text: &str) -> Result<usize, String> {
    let trimmed = text.trim();
    let lower = trimmed.to_ascii_lowercase();

    let (digits, multiplier) = if let Some(rest) = lower.strip_suffix("kb") {
        (rest.trim_end(), 1024usize)
    } else if let Some(rest) = lower.strip_suffix("mb") {
        (rest.trim_end(), 1024 * 1024)
    } else {
        (lower.as_str(), 1)
    };

    if digits.is_empty() {
        return Err(format!("invalid size '{trimmed}': missing number"));
    }

    let value = match digits.strip_prefix("0x") {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => digits.parse::<usize>(),
    }
    .map_err(|e| format!("invalid size '{trimmed}': {e}"))?;

    value.checked_mul(multiplier).ok_or_else(|| format!("invalid size '{trimmed}': too large"))
}

/// Serde adapter for fields written with [`parse_size`] syntax.
pub fn deserialize_size<'de, D>(deserializer: D) -> Result<usize, D::Error>
where
    D: Deserializer<'de>,
{
    match SizeRepr::deserialize(deserializer)? {
        SizeRepr::Int(value) => usize::try_from(value).map_err(de::Error::custom),
        SizeRepr::Text(text) => parse_size(&text).map_err(de::Error::custom),
    }
}
