//! Replaceable asset descriptors.
//!
//! An [`AssetDescriptor`] is built when a user supplies a replacement file
//! (or when the engine reports a scene asset that is not embedded) and is
//! consumed straight away by the replacement pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Asset kind, closed set with an unsupported arm.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AssetKind {
    Image,
    Font,
    Csv,
    Svg,
    Excel,
    GoogleSheet,
    Unsupported(String),
}

impl AssetKind {
    pub fn parse(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "image" => AssetKind::Image,
            "font" => AssetKind::Font,
            "csv" => AssetKind::Csv,
            "svg" => AssetKind::Svg,
            "excel" => AssetKind::Excel,
            "googlesheet" | "google_sheet" => AssetKind::GoogleSheet,
            _ => AssetKind::Unsupported(name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AssetKind::Image => "image",
            AssetKind::Font => "font",
            AssetKind::Csv => "csv",
            AssetKind::Svg => "svg",
            AssetKind::Excel => "excel",
            AssetKind::GoogleSheet => "googlesheet",
            AssetKind::Unsupported(name) => name,
        }
    }
}

impl From<String> for AssetKind {
    fn from(s: String) -> Self {
        AssetKind::parse(&s)
    }
}

impl From<AssetKind> for String {
    fn from(kind: AssetKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One asset to stage and hand to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetDescriptor {
    pub asset_id: String,
    pub filename: String,
    pub kind: AssetKind,
}

impl AssetDescriptor {
    pub fn new(asset_id: impl Into<String>, filename: impl Into<String>, kind: AssetKind) -> Self {
        Self {
            asset_id: asset_id.into(),
            filename: filename.into(),
            kind,
        }
    }

    /// Parse the CLI form `ID:KIND:PATH`. The filename staged in the engine
    /// is the last path component.
    pub fn parse_spec(spec: &str) -> Option<(Self, String)> {
        let mut parts = spec.splitn(3, ':');
        let asset_id = parts.next().filter(|s| !s.is_empty())?;
        let kind = AssetKind::parse(parts.next()?);
        let path = parts.next().filter(|s| !s.is_empty())?;
        let filename = path.rsplit(['/', '\\']).next().unwrap_or(path);
        Some((Self::new(asset_id, filename, kind), path.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_parse() {
        assert_eq!(AssetKind::parse("Font"), AssetKind::Font);
        assert_eq!(AssetKind::parse("googleSheet"), AssetKind::GoogleSheet);
        assert_eq!(AssetKind::parse("video"), AssetKind::Unsupported("video".into()));
    }

    #[test]
    fn test_descriptor_json() {
        let d: AssetDescriptor =
            serde_json::from_str(r#"{"assetId":"a1","filename":"logo.png","kind":"image"}"#).unwrap();
        assert_eq!(d, AssetDescriptor::new("a1", "logo.png", AssetKind::Image));
    }

    #[test]
    fn test_parse_spec() {
        let (d, path) = AssetDescriptor::parse_spec("font1:font:assets/fonts/Inter.ttf").unwrap();
        assert_eq!(d.asset_id, "font1");
        assert_eq!(d.kind, AssetKind::Font);
        assert_eq!(d.filename, "Inter.ttf");
        assert_eq!(path, "assets/fonts/Inter.ttf");
        assert!(AssetDescriptor::parse_spec("missing_kind").is_none());
    }
}
