//! Control descriptors: one UI control bound to one engine attribute.
//!
//! A descriptor carries the widget to draw, the label and the last-known-good
//! display value. Display values differ from engine values only for colors,
//! which are always `#rrggbb` on this side.
//!
//! User input arrives as [`EditInput`] (what a form control hands over:
//! text, a toggle, per-component text, a font pick) and is converted to the
//! engine shape for the attribute kind by [`convert_input`].

use crate::engine::EngineError;
use crate::entities::color::{self, ColorParseError};
use crate::entities::{AttrId, AttrKind, AttrSchema, AttrValue, FontRef, NumericLimits};
use std::fmt;

/// Widget selected for an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    /// Both hard bounds declared.
    Slider { min: f64, max: f64, step: f64 },
    /// Unbounded (or half-bounded) numeric entry.
    NumberEntry { min: Option<f64>, max: Option<f64>, step: f64 },
    /// 2 or 3 numeric fields.
    PairEntry {
        components: usize,
        min: Option<f64>,
        max: Option<f64>,
        step: f64,
    },
    Checkbox,
    TextEntry,
    RichTextArea,
    ColorPicker,
    /// Family list + style list of the selected family.
    FontPicker { families: Vec<String>, styles: Vec<String> },
    /// Passive indicator naming the kind we cannot edit.
    Unsupported { kind: String },
}

impl Widget {
    pub fn is_editable(&self) -> bool {
        !matches!(self, Widget::Unsupported { .. })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Widget::Slider { .. } => "slider",
            Widget::NumberEntry { .. } => "number",
            Widget::PairEntry { .. } => "pair",
            Widget::Checkbox => "checkbox",
            Widget::TextEntry => "text",
            Widget::RichTextArea => "rich-text",
            Widget::ColorPicker => "color",
            Widget::FontPicker { .. } => "font",
            Widget::Unsupported { .. } => "unsupported",
        }
    }
}

/// Numeric step: declared step, else 1 for integer kinds, else `float_step`.
pub fn step_for(kind: &AttrKind, limits: Option<&NumericLimits>, float_step: f64) -> f64 {
    limits
        .and_then(NumericLimits::step)
        .unwrap_or(if kind.is_integer() { 1.0 } else { float_step })
}

/// Pick the widget for a schema. Fonts get their lists filled in by the
/// registry, which knows the engine.
pub fn select_widget(schema: &AttrSchema, value: Option<&AttrValue>, float_step: f64) -> Widget {
    let kind = schema.kind();
    let limits = schema.limits();
    let step = step_for(kind, limits, float_step);
    match kind {
        AttrKind::Int | AttrKind::Float => match limits.and_then(NumericLimits::hard_bounds) {
            Some((min, max)) => Widget::Slider { min, max, step },
            None => Widget::NumberEntry {
                min: limits.and_then(NumericLimits::hard_min),
                max: limits.and_then(NumericLimits::hard_max),
                step,
            },
        },
        AttrKind::IntPair | AttrKind::FloatPair => {
            let components = match value {
                Some(AttrValue::Tuple(v)) if v.len() == 3 => 3,
                _ => 2,
            };
            Widget::PairEntry {
                components,
                min: limits.and_then(NumericLimits::hard_min),
                max: limits.and_then(NumericLimits::hard_max),
                step,
            }
        }
        AttrKind::Bool => Widget::Checkbox,
        AttrKind::Str => Widget::TextEntry,
        AttrKind::RichText => Widget::RichTextArea,
        AttrKind::Color => Widget::ColorPicker,
        AttrKind::Font => Widget::FontPicker {
            families: Vec::new(),
            styles: Vec::new(),
        },
        AttrKind::Unsupported(name) => Widget::Unsupported { kind: name.clone() },
    }
}

/// Engine value -> display value. Colors always go through the codec.
pub fn to_display(kind: &AttrKind, value: &AttrValue) -> AttrValue {
    match kind {
        AttrKind::Color => AttrValue::Str(color::decode_to_display(value)),
        _ => value.clone(),
    }
}

/// One control in the control centre.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlDescriptor {
    /// Engine id string, as declared.
    pub key: String,
    /// `None` for ids the engine sent in a malformed shape.
    pub target: Option<AttrId>,
    pub label: String,
    pub kind: AttrKind,
    pub limits: Option<NumericLimits>,
    pub widget: Widget,
    /// Last-known-good display value.
    pub value: Option<AttrValue>,
}

/// Raw user input from a control.
#[derive(Debug, Clone, PartialEq)]
pub enum EditInput {
    /// Number, hex color or text field contents.
    Text(String),
    Toggle(bool),
    /// One text per component of a pair/triple.
    Components(Vec<String>),
    Font { family: String, style: String },
}

/// Attribute edit failure. Never propagated past the registry: logged and
/// the control keeps its previous value.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingError {
    UnknownControl(String),
    ReadOnly(String),
    Parse { key: String, reason: String },
    Color { key: String, source: ColorParseError },
    Engine(EngineError),
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::UnknownControl(key) => write!(f, "No control bound to {}", key),
            BindingError::ReadOnly(key) => write!(f, "Control {} is read-only", key),
            BindingError::Parse { key, reason } => write!(f, "Invalid value for {}: {}", key, reason),
            BindingError::Color { key, source } => write!(f, "Invalid color for {}: {}", key, source),
            BindingError::Engine(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for BindingError {}

impl From<EngineError> for BindingError {
    fn from(e: EngineError) -> Self {
        BindingError::Engine(e)
    }
}

fn parse_number(key: &str, text: &str) -> Result<f64, BindingError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BindingError::Parse {
            key: key.to_string(),
            reason: format!("'{}' is not a number", trimmed),
        })
}

fn mismatch(key: &str, kind: &AttrKind, input: &EditInput) -> BindingError {
    BindingError::Parse {
        key: key.to_string(),
        reason: format!("{} control cannot take {:?}", kind, input),
    }
}

/// Convert user input into the value the engine expects for `kind`.
///
/// Integers truncate toward zero, floats keep their fraction; both are
/// clamped into declared hard bounds. Pairs accept per-component input or
/// one comma-separated text.
pub fn convert_input(
    key: &str,
    kind: &AttrKind,
    limits: Option<&NumericLimits>,
    input: &EditInput,
) -> Result<AttrValue, BindingError> {
    let clamp = |v: f64| limits.map(|l| l.clamp(v)).unwrap_or(v);
    match (kind, input) {
        (AttrKind::Int, EditInput::Text(text)) => {
            let v = clamp(parse_number(key, text)?);
            Ok(AttrValue::Int(v.trunc() as i64))
        }
        (AttrKind::Float, EditInput::Text(text)) => Ok(AttrValue::Float(clamp(parse_number(key, text)?))),
        (AttrKind::IntPair | AttrKind::FloatPair, EditInput::Components(_) | EditInput::Text(_)) => {
            let parts: Vec<String> = match input {
                EditInput::Text(text) => text.split(',').map(str::to_string).collect(),
                EditInput::Components(parts) => parts.clone(),
                _ => Vec::new(),
            };
            if !(2..=3).contains(&parts.len()) {
                return Err(BindingError::Parse {
                    key: key.to_string(),
                    reason: format!("expected 2 or 3 components, got {}", parts.len()),
                });
            }
            let values = parts
                .iter()
                .map(|p| {
                    let v = clamp(parse_number(key, p)?);
                    Ok(if kind.is_integer() { v.trunc() } else { v })
                })
                .collect::<Result<Vec<f64>, BindingError>>()?;
            Ok(AttrValue::Tuple(values))
        }
        (AttrKind::Bool, EditInput::Toggle(b)) => Ok(AttrValue::Bool(*b)),
        (AttrKind::Bool, EditInput::Text(text)) => match text.trim() {
            "true" | "1" | "on" => Ok(AttrValue::Bool(true)),
            "false" | "0" | "off" => Ok(AttrValue::Bool(false)),
            other => Err(BindingError::Parse {
                key: key.to_string(),
                reason: format!("'{}' is not a boolean", other),
            }),
        },
        (AttrKind::Str | AttrKind::RichText, EditInput::Text(text)) => Ok(AttrValue::Str(text.clone())),
        (AttrKind::Color, EditInput::Text(hex)) => {
            let rgba = color::encode_from_display(hex).map_err(|source| BindingError::Color {
                key: key.to_string(),
                source,
            })?;
            Ok(AttrValue::Tuple(rgba.to_vec()))
        }
        (AttrKind::Font, EditInput::Font { family, style }) => Ok(AttrValue::Font(FontRef {
            family: family.clone(),
            style: style.clone(),
        })),
        (AttrKind::Unsupported(_), _) => Err(BindingError::ReadOnly(key.to_string())),
        (kind, input) => Err(mismatch(key, kind, input)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounded(min: f64, max: f64) -> NumericLimits {
        NumericLimits {
            has_hard_min: true,
            hard_min: min,
            has_hard_max: true,
            hard_max: max,
            ..Default::default()
        }
    }

    #[test]
    fn test_slider_needs_both_bounds() {
        let both = AttrSchema::new(AttrKind::Float, Some(bounded(0.0, 1.0)));
        assert!(matches!(select_widget(&both, None, 0.01), Widget::Slider { .. }));

        let min_only = AttrSchema::new(
            AttrKind::Float,
            Some(NumericLimits {
                has_hard_min: true,
                ..Default::default()
            }),
        );
        assert_eq!(
            select_widget(&min_only, None, 0.01),
            Widget::NumberEntry { min: Some(0.0), max: None, step: 0.01 }
        );

        let max_only = AttrSchema::new(
            AttrKind::Int,
            Some(NumericLimits {
                has_hard_max: true,
                hard_max: 9.0,
                ..Default::default()
            }),
        );
        assert!(matches!(select_widget(&max_only, None, 0.01), Widget::NumberEntry { .. }));

        // Soft bounds never make a slider
        let soft = AttrSchema::new(
            AttrKind::Float,
            Some(NumericLimits {
                has_soft_min: true,
                has_soft_max: true,
                soft_max: 1.0,
                ..Default::default()
            }),
        );
        assert!(matches!(select_widget(&soft, None, 0.01), Widget::NumberEntry { .. }));
    }

    #[test]
    fn test_default_steps() {
        assert_eq!(step_for(&AttrKind::Int, None, 0.01), 1.0);
        assert_eq!(step_for(&AttrKind::FloatPair, None, 0.01), 0.01);
        let declared = NumericLimits { step: 0.25, ..Default::default() };
        assert_eq!(step_for(&AttrKind::Float, Some(&declared), 0.01), 0.25);
    }

    #[test]
    fn test_pair_components_from_value() {
        let schema = AttrSchema::new(AttrKind::FloatPair, None);
        let triple = AttrValue::Tuple(vec![0.0, 1.0, 2.0]);
        assert!(matches!(
            select_widget(&schema, Some(&triple), 0.01),
            Widget::PairEntry { components: 3, .. }
        ));
    }

    #[test]
    fn test_int_truncates_float_keeps_fraction() {
        let t = EditInput::Text("2.9".into());
        assert_eq!(convert_input("k", &AttrKind::Int, None, &t).unwrap(), AttrValue::Int(2));
        assert_eq!(convert_input("k", &AttrKind::Float, None, &t).unwrap(), AttrValue::Float(2.9));
        let neg = EditInput::Text("-2.9".into());
        assert_eq!(convert_input("k", &AttrKind::Int, None, &neg).unwrap(), AttrValue::Int(-2));
    }

    #[test]
    fn test_numeric_clamped_to_hard_bounds() {
        let limits = bounded(0.0, 1.0);
        let v = convert_input("k", &AttrKind::Float, Some(&limits), &EditInput::Text("1.5".into()));
        assert_eq!(v.unwrap(), AttrValue::Float(1.0));
    }

    #[test]
    fn test_pair_assembly() {
        let input = EditInput::Components(vec!["1.5".into(), "2.5".into()]);
        assert_eq!(
            convert_input("k", &AttrKind::IntPair, None, &input).unwrap(),
            AttrValue::Tuple(vec![1.0, 2.0])
        );
        let text = EditInput::Text("1, 2, 3.5".into());
        assert_eq!(
            convert_input("k", &AttrKind::FloatPair, None, &text).unwrap(),
            AttrValue::Tuple(vec![1.0, 2.0, 3.5])
        );
        let bad = EditInput::Components(vec!["1".into()]);
        assert!(convert_input("k", &AttrKind::FloatPair, None, &bad).is_err());
    }

    #[test]
    fn test_color_input_encodes() {
        let v = convert_input("k", &AttrKind::Color, None, &EditInput::Text("#00ff00".into())).unwrap();
        assert_eq!(v, AttrValue::Tuple(vec![0.0, 1.0, 0.0, 1.0]));
        let err = convert_input("k", &AttrKind::Color, None, &EditInput::Text("green".into()));
        assert!(matches!(err, Err(BindingError::Color { .. })));
    }

    #[test]
    fn test_rejections() {
        assert!(matches!(
            convert_input("k", &AttrKind::Float, None, &EditInput::Text("abc".into())),
            Err(BindingError::Parse { .. })
        ));
        assert!(matches!(
            convert_input("k", &AttrKind::Unsupported("gradient".into()), None, &EditInput::Text("x".into())),
            Err(BindingError::ReadOnly(_))
        ));
        assert!(matches!(
            convert_input("k", &AttrKind::Bool, None, &EditInput::Components(vec![])),
            Err(BindingError::Parse { .. })
        ));
    }
}
