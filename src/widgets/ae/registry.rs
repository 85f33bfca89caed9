//! Control centre: maps every declared engine attribute to one control.
//!
//! # Lifecycle
//!
//! - `build()` on each scene load: discards everything and creates exactly
//!   one descriptor per declared attribute id, in declaration order.
//! - `apply_edit()` on user input: one engine `set`, a render when the
//!   clock is stopped, and the descriptor value updated. Failures keep the
//!   previous value.
//! - `refresh_font_controls()` after a font is indexed: only font pickers
//!   re-read families and styles.
//!
//! Malformed ids and kinds we cannot edit still get a descriptor (a passive
//! indicator), so the count always matches the engine's list.

use super::controls::{
    BindingError, ControlDescriptor, EditInput, Widget, convert_input, select_widget, to_display,
};
use crate::core::player_events::{ControlsRebuiltEvent, FontControlsRefreshedEvent};
use crate::core::event_bus::EventEmitter;
use crate::engine::{CompId, Engine, Surface};
use crate::entities::{AttrId, AttrKind, AttrSchema, AttrValue};
use indexmap::IndexMap;
use log::{debug, info, warn};

/// Default increment for float controls without a declared step.
pub const DEFAULT_FLOAT_STEP: f64 = 0.01;

/// Result of one edit.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    /// Engine took the value. `rendered` is true when a redraw was issued.
    Applied { rendered: bool },
    /// Value rejected; the control shows its previous value.
    Reverted(BindingError),
}

impl EditOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied { .. })
    }
}

#[derive(Debug)]
pub struct ControlRegistry {
    controls: IndexMap<String, ControlDescriptor>,
    float_step: f64,
    font_refreshes: usize,
    events: EventEmitter,
}

impl Default for ControlRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_FLOAT_STEP, EventEmitter::dummy())
    }
}

impl ControlRegistry {
    pub fn new(float_step: f64, events: EventEmitter) -> Self {
        let float_step = if float_step.is_finite() && float_step > 0.0 {
            float_step
        } else {
            DEFAULT_FLOAT_STEP
        };
        Self {
            controls: IndexMap::new(),
            float_step,
            font_refreshes: 0,
            events,
        }
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&ControlDescriptor> {
        self.controls.get(key)
    }

    /// Descriptors in declaration order.
    pub fn controls(&self) -> impl Iterator<Item = &ControlDescriptor> {
        self.controls.values()
    }

    /// How many times font pickers were refreshed since construction.
    pub fn font_refreshes(&self) -> usize {
        self.font_refreshes
    }

    pub fn clear(&mut self) {
        self.controls.clear();
    }

    /// Rebuild all controls for `comp`. Returns the descriptor count.
    pub fn build(&mut self, engine: &dyn Engine, comp: &CompId) -> usize {
        self.controls.clear();
        for key in engine.declared_attributes(comp) {
            if self.controls.contains_key(&key) {
                warn!("Attribute {} declared twice, keeping first", key);
                continue;
            }
            let descriptor = self.describe(engine, &key);
            self.controls.insert(key, descriptor);
        }
        let count = self.controls.len();
        info!("Built {} controls for composition {}", count, comp.0);
        self.events.emit(ControlsRebuiltEvent { count });
        count
    }

    fn describe(&self, engine: &dyn Engine, key: &str) -> ControlDescriptor {
        let Some(target) = AttrId::parse(key) else {
            warn!("Malformed attribute id '{}', showing passive indicator", key);
            return ControlDescriptor {
                key: key.to_string(),
                target: None,
                label: key.to_string(),
                kind: AttrKind::Unsupported("malformed id".into()),
                limits: None,
                widget: Widget::Unsupported {
                    kind: "malformed id".into(),
                },
                value: None,
            };
        };

        let schema = engine
            .schema(&target.layer, &target.path)
            .unwrap_or_else(|| AttrSchema::unsupported("unknown"));
        let label = engine
            .display_name(&target.layer, &target.path)
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| target.path.clone());
        let raw = engine.get(&target.layer, &target.path);
        let value = display_value(schema.kind(), raw);

        let mut widget = select_widget(&schema, value.as_ref(), self.float_step);
        if let Widget::FontPicker { families, styles } = &mut widget {
            fill_font_lists(engine, value.as_ref(), families, styles);
        }
        if !widget.is_editable() {
            debug!("Attribute {} has unsupported kind {}", key, schema.kind());
        }

        ControlDescriptor {
            key: key.to_string(),
            target: Some(target),
            label,
            kind: schema.kind().clone(),
            limits: schema.limits().copied(),
            widget,
            value,
        }
    }

    /// Convert `input`, push it to the engine and update the control.
    ///
    /// Exactly one `set` reaches the engine per accepted input. The redraw
    /// is issued only when the engine clock is stopped and a surface exists.
    pub fn apply_edit(
        &mut self,
        engine: &mut dyn Engine,
        key: &str,
        input: EditInput,
        surface: Option<&Surface>,
    ) -> EditOutcome {
        match self.try_apply(engine, key, &input, surface) {
            Ok(rendered) => EditOutcome::Applied { rendered },
            Err(e) => {
                warn!("Edit of {} reverted: {}", key, e);
                EditOutcome::Reverted(e)
            }
        }
    }

    fn try_apply(
        &mut self,
        engine: &mut dyn Engine,
        key: &str,
        input: &EditInput,
        surface: Option<&Surface>,
    ) -> Result<bool, BindingError> {
        let control = self
            .controls
            .get_mut(key)
            .ok_or_else(|| BindingError::UnknownControl(key.to_string()))?;
        let Some(target) = control.target.clone() else {
            return Err(BindingError::ReadOnly(key.to_string()));
        };

        let value = convert_input(key, &control.kind, control.limits.as_ref(), input)?;
        engine.set(&target.layer, &target.path, value.clone())?;
        debug!("{} <- {}", key, value);
        control.value = Some(to_display(&control.kind, &value));

        // Font picks change the style list
        if let Widget::FontPicker { families, styles } = &mut control.widget {
            fill_font_lists(&*engine, control.value.as_ref(), families, styles);
        }

        let rendered = match surface {
            Some(surface) if !engine.is_running() => {
                engine.render(surface);
                true
            }
            _ => false,
        };
        Ok(rendered)
    }

    /// Re-read every bound value from the engine. The session calls this
    /// after every successful asset swap.
    pub fn refresh_values(&mut self, engine: &dyn Engine) {
        for control in self.controls.values_mut() {
            let Some(target) = &control.target else { continue };
            if let Some(value) = display_value(&control.kind, engine.get(&target.layer, &target.path)) {
                control.value = Some(value);
            }
        }
    }

    /// Re-read families and styles into every font picker. Other controls
    /// are untouched. Returns the number of pickers refreshed.
    pub fn refresh_font_controls(&mut self, engine: &dyn Engine) -> usize {
        let mut refreshed = 0;
        let mut fonts = 0;
        for control in self.controls.values_mut() {
            if let Widget::FontPicker { families, styles } = &mut control.widget {
                fill_font_lists(engine, control.value.as_ref(), families, styles);
                fonts = families.len();
                refreshed += 1;
            }
        }
        self.font_refreshes += 1;
        debug!("Refreshed {} font controls ({} families)", refreshed, fonts);
        self.events.emit(FontControlsRefreshedEvent {
            controls: refreshed,
            fonts,
        });
        refreshed
    }
}

fn display_value(kind: &AttrKind, raw: Option<AttrValue>) -> Option<AttrValue> {
    match (kind, raw) {
        (_, Some(value)) => Some(to_display(kind, &value)),
        // Colors always have a display form
        (AttrKind::Color, None) => Some(AttrValue::Str(crate::entities::color::BLACK_HEX.to_string())),
        (_, None) => None,
    }
}

fn fill_font_lists(
    engine: &dyn Engine,
    current: Option<&AttrValue>,
    families: &mut Vec<String>,
    styles: &mut Vec<String>,
) {
    *families = engine.list_fonts();
    *styles = current
        .and_then(AttrValue::as_font)
        .map(|font| engine.font_styles(&font.family))
        .unwrap_or_default();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::event_bus::{EventBus, downcast_event};
    use crate::engine::scripted::fixtures::BASIC_SCENE;
    use crate::engine::{EngineCall, ScriptedEngine};
    use crate::entities::FontRef;

    fn loaded() -> (ScriptedEngine, ControlRegistry) {
        let mut engine = ScriptedEngine::new();
        engine.load_scene(BASIC_SCENE.as_bytes(), "basic").unwrap();
        let mut registry = ControlRegistry::default();
        registry.build(&engine, &engine.active_composition());
        engine.clear_calls();
        (engine, registry)
    }

    fn surface(engine: &mut ScriptedEngine) -> Surface {
        let s = engine.make_surface("#canvas", 640, 360).unwrap();
        engine.clear_calls();
        s
    }

    #[test]
    fn test_one_control_per_declared_id() {
        let (engine, registry) = loaded();
        let declared = engine.declared_attributes(&engine.active_composition());
        assert_eq!(registry.len(), declared.len());
        let keys: Vec<&str> = registry.controls().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, declared.iter().map(String::as_str).collect::<Vec<_>>());
    }

    #[test]
    fn test_rebuild_is_idempotent() {
        let (engine, mut registry) = loaded();
        let first: Vec<ControlDescriptor> = registry.controls().cloned().collect();
        registry.build(&engine, &engine.active_composition());
        let second: Vec<ControlDescriptor> = registry.controls().cloned().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_composition_builds_nothing() {
        let (engine, mut registry) = loaded();
        assert_eq!(registry.build(&engine, &CompId("other".into())), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_widget_selection() {
        let (_, registry) = loaded();
        assert!(matches!(
            registry.get("layer1.opacity").unwrap().widget,
            Widget::Slider { min: 0.0, max: 1.0, step: 0.05 }
        ));
        assert!(matches!(
            registry.get("layer2.count").unwrap().widget,
            Widget::NumberEntry { min: Some(0.0), max: None, step: 1.0 }
        ));
        assert_eq!(registry.get("layer2.visible").unwrap().widget, Widget::Checkbox);
        assert_eq!(registry.get("text1.string").unwrap().widget, Widget::TextEntry);
        assert!(matches!(
            registry.get("layer3.gradient").unwrap().widget,
            Widget::Unsupported { .. }
        ));
        match &registry.get("text1.font").unwrap().widget {
            Widget::FontPicker { families, styles } => {
                assert_eq!(families, &vec!["Inter".to_string()]);
                assert_eq!(styles, &vec!["Regular".to_string(), "Bold".to_string()]);
            }
            other => panic!("unexpected widget {:?}", other),
        }
    }

    #[test]
    fn test_color_control_shows_hex() {
        let (_, registry) = loaded();
        let color = registry.get("layer1.material.color").unwrap();
        assert_eq!(color.widget, Widget::ColorPicker);
        assert_eq!(color.value, Some(AttrValue::Str("#ff0000".into())));
        assert_eq!(color.target.as_ref().unwrap().path, "material.color");
    }

    #[test]
    fn test_label_falls_back_to_path() {
        let (_, registry) = loaded();
        assert_eq!(registry.get("layer1.opacity").unwrap().label, "Opacity");
        assert_eq!(registry.get("layer2.count").unwrap().label, "count");
    }

    #[test]
    fn test_malformed_id_gets_indicator() {
        let mut engine = ScriptedEngine::new();
        let scene = BASIC_SCENE.replace("\"layer2.visible\"", "\"novisible\"");
        engine.load_scene(scene.as_bytes(), "broken").unwrap();
        let mut registry = ControlRegistry::default();
        let count = registry.build(&engine, &engine.active_composition());
        assert_eq!(count, engine.declared_attributes(&engine.active_composition()).len());
        let bad = registry.get("novisible").unwrap();
        assert!(bad.target.is_none());
        assert!(!bad.widget.is_editable());
    }

    #[test]
    fn test_slider_edit_at_bound() {
        let (mut engine, mut registry) = loaded();
        let s = surface(&mut engine);
        let outcome = registry.apply_edit(&mut engine, "layer1.opacity", EditInput::Text("0".into()), Some(&s));
        assert_eq!(outcome, EditOutcome::Applied { rendered: true });
        assert_eq!(
            engine.calls(),
            vec![
                EngineCall::Set {
                    layer: "layer1".into(),
                    attr: "opacity".into(),
                    value: AttrValue::Float(0.0),
                },
                EngineCall::Render { surface: s.id(), frame: 0 },
            ]
        );
    }

    #[test]
    fn test_integer_edit_truncates() {
        let (mut engine, mut registry) = loaded();
        let outcome = registry.apply_edit(&mut engine, "layer2.count", EditInput::Text("7.8".into()), None);
        assert_eq!(outcome, EditOutcome::Applied { rendered: false });
        assert_eq!(engine.value_of("layer2.count"), Some(AttrValue::Int(7)));
        assert_eq!(registry.get("layer2.count").unwrap().value, Some(AttrValue::Int(7)));
    }

    #[test]
    fn test_color_edit_round_trip() {
        let (mut engine, mut registry) = loaded();
        let outcome = registry.apply_edit(
            &mut engine,
            "layer1.material.color",
            EditInput::Text("#00ff00".into()),
            None,
        );
        assert!(outcome.is_applied());
        assert_eq!(
            engine.value_of("layer1.material.color"),
            Some(AttrValue::Tuple(vec![0.0, 1.0, 0.0, 1.0]))
        );
        assert_eq!(
            registry.get("layer1.material.color").unwrap().value,
            Some(AttrValue::Str("#00ff00".into()))
        );
    }

    #[test]
    fn test_rejected_edit_reverts() {
        let (mut engine, mut registry) = loaded();
        engine.reject_attribute("layer1.opacity");
        let before = registry.get("layer1.opacity").unwrap().value.clone();
        let outcome = registry.apply_edit(&mut engine, "layer1.opacity", EditInput::Text("0.5".into()), None);
        assert!(matches!(outcome, EditOutcome::Reverted(BindingError::Engine(_))));
        assert_eq!(registry.get("layer1.opacity").unwrap().value, before);
        assert_eq!(engine.render_count(), 0);
    }

    #[test]
    fn test_parse_failure_never_reaches_engine() {
        let (mut engine, mut registry) = loaded();
        let outcome = registry.apply_edit(&mut engine, "layer2.count", EditInput::Text("lots".into()), None);
        assert!(matches!(outcome, EditOutcome::Reverted(BindingError::Parse { .. })));
        assert!(engine.calls().is_empty());

        let outcome = registry.apply_edit(&mut engine, "nope.nothing", EditInput::Text("1".into()), None);
        assert!(matches!(outcome, EditOutcome::Reverted(BindingError::UnknownControl(_))));
    }

    #[test]
    fn test_no_render_while_playing() {
        let (mut engine, mut registry) = loaded();
        let s = surface(&mut engine);
        engine.begin();
        let outcome = registry.apply_edit(&mut engine, "layer2.visible", EditInput::Toggle(false), Some(&s));
        assert_eq!(outcome, EditOutcome::Applied { rendered: false });
        assert_eq!(engine.render_count(), 0);
    }

    #[test]
    fn test_font_edit_updates_styles() {
        let (mut engine, mut registry) = loaded();
        let outcome = registry.apply_edit(
            &mut engine,
            "text1.font",
            EditInput::Font {
                family: "Inter".into(),
                style: "Bold".into(),
            },
            None,
        );
        assert!(outcome.is_applied());
        assert_eq!(
            registry.get("text1.font").unwrap().value,
            Some(AttrValue::Font(FontRef {
                family: "Inter".into(),
                style: "Bold".into(),
            }))
        );
    }

    #[test]
    fn test_font_refresh_touches_only_font_pickers() {
        let (mut engine, mut registry) = loaded();
        let bus = EventBus::new();
        registry.events = bus.emitter();
        let before: Vec<ControlDescriptor> = registry
            .controls()
            .filter(|c| !matches!(c.widget, Widget::FontPicker { .. }))
            .cloned()
            .collect();

        engine.write_file("Roboto-Italic.ttf", b"font").unwrap();
        engine.index_font("Roboto-Italic.ttf").unwrap();
        assert_eq!(registry.refresh_font_controls(&engine), 1);
        assert_eq!(registry.font_refreshes(), 1);

        match &registry.get("text1.font").unwrap().widget {
            Widget::FontPicker { families, .. } => assert!(families.contains(&"Roboto".to_string())),
            other => panic!("unexpected widget {:?}", other),
        }
        let after: Vec<ControlDescriptor> = registry
            .controls()
            .filter(|c| !matches!(c.widget, Widget::FontPicker { .. }))
            .cloned()
            .collect();
        assert_eq!(before, after);

        let events = bus.poll();
        assert_eq!(
            downcast_event::<FontControlsRefreshedEvent>(&events[0]),
            Some(&FontControlsRefreshedEvent { controls: 1, fonts: 2 })
        );
    }

    #[test]
    fn test_refresh_values_picks_up_engine_changes() {
        let (mut engine, mut registry) = loaded();
        engine.set("layer2", "count", AttrValue::Int(11)).unwrap();
        registry.refresh_values(&engine);
        assert_eq!(registry.get("layer2.count").unwrap().value, Some(AttrValue::Int(11)));
    }
}
