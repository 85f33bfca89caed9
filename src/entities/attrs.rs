//! Attribute model for control centre parameters.
//!
//! The engine declares every editable parameter as a dotted id string
//! (`layer.path.inside.layer`) plus a schema: a kind and, for numeric kinds,
//! a set of limits. Values travel in both directions as [`AttrValue`].
//!
//! Kinds are a closed set. Anything the engine reports that we do not know
//! becomes [`AttrKind::Unsupported`] and is rendered as an inert placeholder.

use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Compound attribute key: layer id + dotted path inside the layer.
///
/// Unique within a loaded scene, meaningless after the scene is released.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttrId {
    pub layer: String,
    pub path: String,
}

impl AttrId {
    pub fn new(layer: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            layer: layer.into(),
            path: path.into(),
        }
    }

    /// Split the engine form `layer.seg1.seg2` into `("layer", "seg1.seg2")`.
    ///
    /// Only the first segment is the layer id; everything after it is
    /// re-joined, so nested paths survive intact. Returns `None` when either
    /// part is empty.
    pub fn parse(raw: &str) -> Option<Self> {
        let (layer, path) = raw.split_once('.')?;
        if layer.is_empty() || path.is_empty() {
            return None;
        }
        Some(Self::new(layer, path))
    }
}

impl fmt::Display for AttrId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.layer, self.path)
    }
}

/// Attribute kind as declared by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttrKind {
    Int,
    Float,
    IntPair,
    FloatPair,
    Bool,
    Str,
    RichText,
    Color,
    /// Font family + style. Its control depends on the engine font index.
    Font,
    /// Kind name the engine reported but we have no control for.
    Unsupported(String),
}

impl AttrKind {
    /// Map an engine kind name onto the closed set.
    pub fn from_engine(name: &str) -> Self {
        match name {
            "int" => AttrKind::Int,
            "double" | "float" => AttrKind::Float,
            "int2" | "int3" => AttrKind::IntPair,
            "double2" | "double3" => AttrKind::FloatPair,
            "bool" => AttrKind::Bool,
            "string" => AttrKind::Str,
            "richText" => AttrKind::RichText,
            "color" => AttrKind::Color,
            "font" => AttrKind::Font,
            other => AttrKind::Unsupported(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AttrKind::Int => "int",
            AttrKind::Float => "double",
            AttrKind::IntPair => "int2",
            AttrKind::FloatPair => "double2",
            AttrKind::Bool => "bool",
            AttrKind::Str => "string",
            AttrKind::RichText => "richText",
            AttrKind::Color => "color",
            AttrKind::Font => "font",
            AttrKind::Unsupported(name) => name,
        }
    }

    /// Kinds that may carry [`NumericLimits`].
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            AttrKind::Int | AttrKind::Float | AttrKind::IntPair | AttrKind::FloatPair
        )
    }

    /// Integer kinds truncate user input and step by 1 by default.
    pub fn is_integer(&self) -> bool {
        matches!(self, AttrKind::Int | AttrKind::IntPair)
    }
}

impl fmt::Display for AttrKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Numeric limits attached to a numeric attribute.
///
/// Mirrors the engine's `numericInfo` record: each bound has a presence flag.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NumericLimits {
    pub has_hard_min: bool,
    pub hard_min: f64,
    pub has_hard_max: bool,
    pub hard_max: f64,
    pub has_soft_min: bool,
    pub soft_min: f64,
    pub has_soft_max: bool,
    pub soft_max: f64,
    pub step: f64,
}

impl NumericLimits {
    pub fn hard_min(&self) -> Option<f64> {
        self.has_hard_min.then_some(self.hard_min)
    }

    pub fn hard_max(&self) -> Option<f64> {
        self.has_hard_max.then_some(self.hard_max)
    }

    /// Both hard bounds, only when both are declared.
    pub fn hard_bounds(&self) -> Option<(f64, f64)> {
        Some((self.hard_min()?, self.hard_max()?))
    }

    /// Declared step, if it is usable.
    pub fn step(&self) -> Option<f64> {
        (self.step.is_finite() && self.step > 0.0).then_some(self.step)
    }

    /// Clamp into whichever hard bounds exist.
    pub fn clamp(&self, value: f64) -> f64 {
        let mut v = value;
        if let Some(min) = self.hard_min() {
            v = v.max(min);
        }
        if let Some(max) = self.hard_max() {
            v = v.min(max);
        }
        v
    }
}

/// Kind + limits for one attribute.
///
/// Invariant: `limits` is `Some` only for numeric kinds.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrSchema {
    kind: AttrKind,
    limits: Option<NumericLimits>,
}

impl AttrSchema {
    pub fn new(kind: AttrKind, limits: Option<NumericLimits>) -> Self {
        let limits = if kind.is_numeric() {
            limits
        } else {
            if limits.is_some() {
                debug!("Dropping numeric limits declared for non-numeric kind '{}'", kind);
            }
            None
        };
        Self { kind, limits }
    }

    /// Schema for an attribute the engine could not describe.
    pub fn unsupported(name: impl Into<String>) -> Self {
        Self::new(AttrKind::Unsupported(name.into()), None)
    }

    pub fn kind(&self) -> &AttrKind {
        &self.kind
    }

    pub fn limits(&self) -> Option<&NumericLimits> {
        self.limits.as_ref()
    }
}

/// Color record as some engine builds report it. Channel range is not
/// fixed: either 0.0-1.0 or 0-255, see [`crate::entities::color`].
///
/// A missing `a` stays `None` so the codec treats it as opaque in whichever
/// range the RGB channels turn out to use.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorRecord {
    pub r: f64,
    pub g: f64,
    pub b: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a: Option<f64>,
}

/// Font reference held by a font attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontRef {
    pub family: String,
    #[serde(default)]
    pub style: String,
}

/// Attribute value exchanged with the engine.
///
/// Untagged on the wire: `true`, `3`, `0.5`, `"text"`, `[1, 0, 0, 1]`,
/// `{"r":..}` and `{"family":..}` all map onto a variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Numeric array: pairs, triples, array colors.
    Tuple(Vec<f64>),
    Color(ColorRecord),
    Font(FontRef),
}

impl AttrValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Int(v) => Some(*v as f64),
            AttrValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_font(&self) -> Option<&FontRef> {
        match self {
            AttrValue::Font(f) => Some(f),
            _ => None,
        }
    }

    /// Numeric components of a tuple or color record.
    pub fn components(&self) -> Option<Vec<f64>> {
        match self {
            AttrValue::Tuple(v) => Some(v.clone()),
            AttrValue::Color(c) => {
                let mut channels = vec![c.r, c.g, c.b];
                channels.extend(c.a);
                Some(channels)
            }
            _ => None,
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Bool(v) => write!(f, "{}", v),
            AttrValue::Int(v) => write!(f, "{}", v),
            AttrValue::Float(v) => write!(f, "{}", v),
            AttrValue::Str(s) => write!(f, "{:?}", s),
            AttrValue::Tuple(v) => {
                let parts: Vec<String> = v.iter().map(|c| c.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            AttrValue::Color(c) => match c.a {
                Some(a) => write!(f, "rgba({}, {}, {}, {})", c.r, c.g, c.b, a),
                None => write!(f, "rgb({}, {}, {})", c.r, c.g, c.b),
            },
            AttrValue::Font(font) if font.style.is_empty() => write!(f, "{}", font.family),
            AttrValue::Font(font) => write!(f, "{} {}", font.family, font.style),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attr_id_rejoins_nested_path() {
        let id = AttrId::parse("layer1.position.x").unwrap();
        assert_eq!(id.layer, "layer1");
        assert_eq!(id.path, "position.x");
        assert_eq!(id.to_string(), "layer1.position.x");
    }

    #[test]
    fn test_attr_id_rejects_malformed() {
        assert!(AttrId::parse("nolayer").is_none());
        assert!(AttrId::parse(".opacity").is_none());
        assert!(AttrId::parse("layer1.").is_none());
    }

    #[test]
    fn test_kind_from_engine() {
        assert_eq!(AttrKind::from_engine("int"), AttrKind::Int);
        assert_eq!(AttrKind::from_engine("double"), AttrKind::Float);
        assert_eq!(AttrKind::from_engine("double2"), AttrKind::FloatPair);
        assert_eq!(AttrKind::from_engine("richText"), AttrKind::RichText);
        assert_eq!(
            AttrKind::from_engine("gradient"),
            AttrKind::Unsupported("gradient".into())
        );
        assert_eq!(AttrKind::from_engine("gradient").as_str(), "gradient");
    }

    #[test]
    fn test_schema_drops_limits_for_non_numeric() {
        let limits = NumericLimits {
            has_hard_min: true,
            ..Default::default()
        };
        let schema = AttrSchema::new(AttrKind::Bool, Some(limits));
        assert!(schema.limits().is_none());

        let schema = AttrSchema::new(AttrKind::Float, Some(limits));
        assert_eq!(schema.limits(), Some(&limits));
    }

    #[test]
    fn test_limits_clamp_single_bound() {
        let limits = NumericLimits {
            has_hard_min: true,
            hard_min: 0.0,
            hard_max: 10.0, // not declared
            ..Default::default()
        };
        assert_eq!(limits.clamp(-5.0), 0.0);
        assert_eq!(limits.clamp(50.0), 50.0);
        assert!(limits.hard_bounds().is_none());
    }

    #[test]
    fn test_value_untagged_json() {
        let values: Vec<AttrValue> =
            serde_json::from_str(r#"[true, 3, 0.5, "hi", [1.0, 0.0, 0.0, 1.0], {"r": 255, "g": 0, "b": 0}, {"family": "Inter", "style": "Bold"}]"#)
                .unwrap();
        assert_eq!(values[0], AttrValue::Bool(true));
        assert_eq!(values[1], AttrValue::Int(3));
        assert_eq!(values[2], AttrValue::Float(0.5));
        assert_eq!(values[3], AttrValue::Str("hi".into()));
        assert_eq!(values[4], AttrValue::Tuple(vec![1.0, 0.0, 0.0, 1.0]));
        assert_eq!(
            values[5],
            AttrValue::Color(ColorRecord { r: 255.0, g: 0.0, b: 0.0, a: None })
        );
        assert_eq!(values[6].as_font().map(|f| f.style.as_str()), Some("Bold"));
    }
}
