//! Color codec between engine colors and 8-bit display colors.
//!
//! Engine builds disagree on how they report colors: some hand out
//! normalized channels (0.0-1.0), some 8-bit channels (0-255), some a
//! ready `#rrggbb` string. Controls always show `#rrggbb`.
//!
//! # Decode heuristic
//!
//! A numeric color is normalized when every RGB channel is `<= 1.0`,
//! otherwise it is 8-bit. This cannot tell a normalized `1.0` from an 8-bit
//! `1`: `[1, 1, 0]` decodes to `#ffff00`, never to `#010100`. Kept as is;
//! callers with 8-bit colors that dark get the bright interpretation.
//!
//! # Encode
//!
//! Always normalized, alpha fixed at 1.0. Alpha does not round-trip.

use super::attrs::AttrValue;
use std::fmt;

/// Opaque black, for shapes we cannot interpret.
pub const BLACK_HEX: &str = "#000000";

/// Hex string parse failure
#[derive(Debug, Clone, PartialEq)]
pub enum ColorParseError {
    /// Not exactly 6 hex digits after the optional `#`
    Length(usize),
    /// Non-hex character in input
    Digit(String),
}

impl fmt::Display for ColorParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColorParseError::Length(n) => write!(f, "Expected 6 hex digits, got {}", n),
            ColorParseError::Digit(s) => write!(f, "Invalid hex color: {}", s),
        }
    }
}

impl std::error::Error for ColorParseError {}

/// Engine value -> `#rrggbb`.
///
/// Strings pass through untouched (the engine already speaks display form).
pub fn decode_to_display(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => s.clone(),
        other => other
            .components()
            .and_then(|c| decode_channels(&c))
            .map(to_hex)
            .unwrap_or_else(|| BLACK_HEX.to_string()),
    }
}

/// Numeric channels -> 8-bit RGBA. Needs at least 3 channels.
///
/// Alpha (4th channel) follows the representation detected for RGB;
/// missing alpha means opaque.
pub fn decode_channels(channels: &[f64]) -> Option<[u8; 4]> {
    if channels.len() < 3 {
        return None;
    }
    let normalized = channels[..3].iter().all(|&c| c <= 1.0);
    let to_u8 = |c: f64| -> u8 {
        let v = if normalized { c * 255.0 } else { c };
        v.round().clamp(0.0, 255.0) as u8
    };
    let a = channels.get(3).map(|&a| to_u8(a)).unwrap_or(255);
    Some([to_u8(channels[0]), to_u8(channels[1]), to_u8(channels[2]), a])
}

/// 8-bit RGBA -> `#rrggbb` (alpha is not displayed).
pub fn to_hex(rgba: [u8; 4]) -> String {
    format!("#{:02x}{:02x}{:02x}", rgba[0], rgba[1], rgba[2])
}

/// `#rrggbb` or `rrggbb` -> 8-bit RGB.
pub fn parse_hex(hex: &str) -> Result<[u8; 3], ColorParseError> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 {
        return Err(ColorParseError::Length(digits.len()));
    }
    let channel = |i: usize| {
        digits
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .ok_or_else(|| ColorParseError::Digit(hex.to_string()))
    };
    Ok([channel(0)?, channel(2)?, channel(4)?])
}

/// `#rrggbb` -> normalized `[r, g, b, 1.0]`.
pub fn encode_from_display(hex: &str) -> Result<[f64; 4], ColorParseError> {
    let [r, g, b] = parse_hex(hex)?;
    Ok([r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0, 1.0])
}
