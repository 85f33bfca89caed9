//! In-memory engine driven by a JSON scene document.
//!
//! Scene bytes are a JSON document describing what a real engine would
//! report about a composition: resolution, frame range, frame rate, the
//! control centre attributes with their current values, fonts and the
//! assets the scene references without embedding:
//!
//! ```json
//! {
//!   "composition": "main",
//!   "resolution": { "width": 1920, "height": 1080 },
//!   "frameRange": { "start": 0, "end": 119 },
//!   "fps": 30,
//!   "attributes": [
//!     { "id": "layer1.opacity", "name": "Opacity", "kind": "double",
//!       "numericInfo": { "hasHardMin": true, "hardMin": 0, "hasHardMax": true, "hardMax": 1 },
//!       "value": 1.0 }
//!   ],
//!   "fonts": { "Inter": ["Regular", "Bold"] },
//!   "pendingAssets": [ { "assetId": "logo", "filename": "logo.png", "kind": "image" } ]
//! }
//! ```
//!
//! The clock maps `requestAnimationFrame`-style millisecond timestamps onto
//! frames at `fps`, looping unless `"loop": false`. Every call is appended to
//! a journal ([`EngineCall`]) so tests can assert exact call sequences.

use super::{
    CompId, Engine, EngineError, EngineResult, FrameRange, Resolution, SceneHandle, Surface,
    TickStatus,
};
use crate::entities::{AssetDescriptor, AssetKind, AttrKind, AttrSchema, AttrValue, NumericLimits};
use indexmap::IndexMap;
use log::{debug, trace, warn};
use serde::Deserialize;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};

/// One journaled engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    LoadScene { name: String },
    ReleaseScene,
    Begin,
    Halt,
    Advance { timestamp: f64, frame: i32 },
    Render { surface: u64, frame: i32 },
    SetFrame(i32),
    Set { layer: String, attr: String, value: AttrValue },
    WriteFile { name: String, len: usize },
    Replace { kind: AssetKind, asset_id: String, filename: String },
    IndexFont { filename: String },
    ListFonts,
    FontStyles { font: String },
    MakeSurface { width: u32, height: u32 },
    ReleaseSurface { id: u64 },
}

fn default_fps() -> f64 {
    30.0
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SceneDoc {
    #[serde(default)]
    composition: Option<String>,
    resolution: Resolution,
    frame_range: FrameRange,
    #[serde(default = "default_fps")]
    fps: f64,
    #[serde(default = "default_true", rename = "loop")]
    looping: bool,
    #[serde(default)]
    attributes: Vec<AttrDoc>,
    #[serde(default)]
    fonts: IndexMap<String, Vec<String>>,
    #[serde(default)]
    pending_assets: Vec<AssetDescriptor>,
}

#[derive(Debug, Clone, Deserialize)]
struct AttrDoc {
    id: String,
    #[serde(default)]
    name: Option<String>,
    kind: String,
    #[serde(default, rename = "numericInfo")]
    limits: Option<NumericLimits>,
    #[serde(default)]
    value: Option<AttrValue>,
}

struct LoadedScene {
    handle: SceneHandle,
    doc: SceneDoc,
    values: HashMap<String, AttrValue>,
    frame: i32,
    running: bool,
    /// (timestamp, frame) the clock counts from; reset by begin/set_frame
    origin: Option<(f64, i32)>,
}

/// Recording in-memory engine.
#[derive(Default)]
pub struct ScriptedEngine {
    scene: Option<LoadedScene>,
    files: HashMap<String, Vec<u8>>,
    fonts: IndexMap<String, Vec<String>>,
    next_surface: u64,
    journal: RefCell<Vec<EngineCall>>,
    rejected_attrs: HashSet<String>,
    rejected_assets: HashSet<String>,
    fail_surfaces: bool,
    fail_font_index: bool,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, call: EngineCall) {
        self.journal.borrow_mut().push(call);
    }

    // === Journal access ===

    pub fn calls(&self) -> Vec<EngineCall> {
        self.journal.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.journal.borrow_mut().clear();
    }

    /// Number of journaled calls matching `pred`.
    pub fn count_calls(&self, pred: impl Fn(&EngineCall) -> bool) -> usize {
        self.journal.borrow().iter().filter(|c| pred(c)).count()
    }

    pub fn render_count(&self) -> usize {
        self.count_calls(|c| matches!(c, EngineCall::Render { .. }))
    }

    /// Position of the first matching call in the journal.
    pub fn position(&self, pred: impl Fn(&EngineCall) -> bool) -> Option<usize> {
        self.journal.borrow().iter().position(pred)
    }

    pub fn staged_file(&self, name: &str) -> Option<&[u8]> {
        self.files.get(name).map(Vec::as_slice)
    }

    pub fn value_of(&self, id: &str) -> Option<AttrValue> {
        self.scene.as_ref()?.values.get(id).cloned()
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    // === Failure injection ===

    /// Reject every `set` on `id` (dotted form).
    pub fn reject_attribute(&mut self, id: impl Into<String>) {
        self.rejected_attrs.insert(id.into());
    }

    /// Reject every replace call for `asset_id`.
    pub fn reject_asset(&mut self, asset_id: impl Into<String>) {
        self.rejected_assets.insert(asset_id.into());
    }

    pub fn set_surface_failure(&mut self, fail: bool) {
        self.fail_surfaces = fail;
    }

    pub fn set_font_index_failure(&mut self, fail: bool) {
        self.fail_font_index = fail;
    }

    fn attr_doc(&self, layer: &str, attr: &str) -> Option<&AttrDoc> {
        let id = format!("{}.{}", layer, attr);
        self.scene.as_ref()?.doc.attributes.iter().find(|a| a.id == id)
    }

    fn replace(&mut self, kind: AssetKind, asset_id: &str, filename: &str) -> EngineResult<()> {
        if self.scene.is_none() {
            return Err(EngineError::NoScene);
        }
        self.record(EngineCall::Replace {
            kind: kind.clone(),
            asset_id: asset_id.to_string(),
            filename: filename.to_string(),
        });
        if !self.files.contains_key(filename) {
            return Err(EngineError::Asset {
                asset_id: asset_id.to_string(),
                reason: format!("{} not staged", filename),
            });
        }
        if self.rejected_assets.contains(asset_id) {
            return Err(EngineError::Asset {
                asset_id: asset_id.to_string(),
                reason: format!("{} content rejected", kind),
            });
        }
        debug!("Replaced {} asset {} with {}", kind, asset_id, filename);
        Ok(())
    }
}

/// Shape check a real engine would do on set.
fn accepts(kind: &AttrKind, value: &AttrValue) -> bool {
    match kind {
        AttrKind::Int | AttrKind::Float => value.as_f64().is_some(),
        AttrKind::IntPair | AttrKind::FloatPair => {
            matches!(value, AttrValue::Tuple(v) if v.len() == 2 || v.len() == 3)
        }
        AttrKind::Bool => matches!(value, AttrValue::Bool(_)),
        AttrKind::Str | AttrKind::RichText => matches!(value, AttrValue::Str(_)),
        AttrKind::Color => match value {
            AttrValue::Tuple(v) => v.len() >= 3,
            AttrValue::Str(_) | AttrValue::Color(_) => true,
            _ => false,
        },
        AttrKind::Font => matches!(value, AttrValue::Font(_)),
        AttrKind::Unsupported(_) => false,
    }
}

/// `Inter-Bold.ttf` -> (`Inter`, `Bold`); no dash means `Regular`.
fn font_from_filename(filename: &str) -> (String, String) {
    let stem = filename.rsplit_once('.').map(|(s, _)| s).unwrap_or(filename);
    match stem.split_once('-') {
        Some((family, style)) if !style.is_empty() => (family.to_string(), style.to_string()),
        _ => (stem.to_string(), "Regular".to_string()),
    }
}

impl Engine for ScriptedEngine {
    fn load_scene(&mut self, bytes: &[u8], name: &str) -> EngineResult<SceneHandle> {
        self.record(EngineCall::LoadScene { name: name.to_string() });
        let doc: SceneDoc =
            serde_json::from_slice(bytes).map_err(|e| EngineError::Scene(format!("{}: {}", name, e)))?;
        if doc.frame_range.end < doc.frame_range.start {
            return Err(EngineError::Scene(format!(
                "{}: frame range {}..{} is inverted",
                name, doc.frame_range.start, doc.frame_range.end
            )));
        }
        if !(doc.fps.is_finite() && doc.fps > 0.0) {
            return Err(EngineError::Scene(format!("{}: invalid fps {}", name, doc.fps)));
        }
        if self.scene.is_some() {
            warn!("Loading {} over a scene that was not released", name);
        }

        let values = doc
            .attributes
            .iter()
            .filter_map(|a| a.value.clone().map(|v| (a.id.clone(), v)))
            .collect();
        for (family, styles) in &doc.fonts {
            self.fonts.insert(family.clone(), styles.clone());
        }
        let handle = SceneHandle::new();
        let frame = doc.frame_range.start;
        debug!(
            "Scene {} loaded: {}x{}, frames {}..={}, {} attributes",
            name,
            doc.resolution.width,
            doc.resolution.height,
            doc.frame_range.start,
            doc.frame_range.end,
            doc.attributes.len()
        );
        self.scene = Some(LoadedScene {
            handle,
            doc,
            values,
            frame,
            running: false,
            origin: None,
        });
        Ok(handle)
    }

    fn release_scene(&mut self, scene: SceneHandle) {
        self.record(EngineCall::ReleaseScene);
        match &self.scene {
            Some(loaded) if loaded.handle == scene => self.scene = None,
            _ => warn!("release_scene with stale handle {}", scene.id()),
        }
    }

    fn begin(&mut self) {
        self.record(EngineCall::Begin);
        if let Some(scene) = self.scene.as_mut() {
            scene.running = true;
            scene.origin = None;
        }
    }

    fn halt(&mut self) {
        self.record(EngineCall::Halt);
        if let Some(scene) = self.scene.as_mut() {
            scene.running = false;
            scene.origin = None;
        }
    }

    fn advance(&mut self, surface: &Surface, timestamp: f64) -> TickStatus {
        let Some(scene) = self.scene.as_mut() else {
            return TickStatus::default();
        };
        if !scene.running {
            return TickStatus { frame_changed: false, current_frame: scene.frame };
        }

        let (origin_ts, origin_frame) = *scene.origin.get_or_insert((timestamp, scene.frame));
        let elapsed_frames = ((timestamp - origin_ts).max(0.0) * scene.doc.fps / 1000.0).floor() as i64;
        let range = scene.doc.frame_range;
        let len = (range.end as i64 - range.start as i64 + 1).max(1);
        let target = (origin_frame as i64).saturating_add(elapsed_frames);
        let next = if target > range.end as i64 {
            if scene.doc.looping {
                (range.start as i64 + (target - range.start as i64).rem_euclid(len)) as i32
            } else {
                scene.running = false;
                range.end
            }
        } else {
            target.max(range.start as i64) as i32
        };

        let changed = next != scene.frame;
        scene.frame = next;
        let frame = scene.frame;
        trace!("advance ts={:.1} -> frame {} (changed={})", timestamp, frame, changed);
        self.record(EngineCall::Advance { timestamp, frame });
        self.record(EngineCall::Render { surface: surface.id(), frame });
        TickStatus { frame_changed: changed, current_frame: frame }
    }

    fn render(&mut self, surface: &Surface) {
        let frame = self.current_frame();
        self.record(EngineCall::Render { surface: surface.id(), frame });
    }

    fn set_frame(&mut self, frame: i32) {
        self.record(EngineCall::SetFrame(frame));
        if let Some(scene) = self.scene.as_mut() {
            let range = scene.doc.frame_range;
            if !range.contains(frame) {
                debug!("set_frame {} outside {}..={}, clamped", frame, range.start, range.end);
            }
            scene.frame = range.clamp(frame);
            scene.origin = None;
        }
    }

    fn current_frame(&self) -> i32 {
        self.scene.as_ref().map(|s| s.frame).unwrap_or(0)
    }

    fn is_running(&self) -> bool {
        self.scene.as_ref().is_some_and(|s| s.running)
    }

    fn resolution(&self) -> Resolution {
        self.scene.as_ref().map(|s| s.doc.resolution).unwrap_or_default()
    }

    fn frame_range(&self) -> FrameRange {
        self.scene.as_ref().map(|s| s.doc.frame_range).unwrap_or_default()
    }

    fn active_composition(&self) -> CompId {
        let name = self
            .scene
            .as_ref()
            .and_then(|s| s.doc.composition.clone())
            .unwrap_or_else(|| "main".to_string());
        CompId(name)
    }

    fn declared_attributes(&self, comp: &CompId) -> Vec<String> {
        if *comp != self.active_composition() {
            return Vec::new();
        }
        self.scene
            .as_ref()
            .map(|s| s.doc.attributes.iter().map(|a| a.id.clone()).collect())
            .unwrap_or_default()
    }

    fn schema(&self, layer: &str, attr: &str) -> Option<AttrSchema> {
        let doc = self.attr_doc(layer, attr)?;
        Some(AttrSchema::new(AttrKind::from_engine(&doc.kind), doc.limits))
    }

    fn display_name(&self, layer: &str, attr: &str) -> Option<String> {
        self.attr_doc(layer, attr)?.name.clone()
    }

    fn get(&self, layer: &str, attr: &str) -> Option<AttrValue> {
        let id = format!("{}.{}", layer, attr);
        self.scene.as_ref()?.values.get(&id).cloned()
    }

    fn set(&mut self, layer: &str, attr: &str, value: AttrValue) -> EngineResult<()> {
        self.record(EngineCall::Set {
            layer: layer.to_string(),
            attr: attr.to_string(),
            value: value.clone(),
        });
        let id = format!("{}.{}", layer, attr);
        let Some(doc) = self.attr_doc(layer, attr) else {
            return Err(EngineError::Attribute { id, reason: "unknown attribute".into() });
        };
        let kind = AttrKind::from_engine(&doc.kind);
        if self.rejected_attrs.contains(&id) || !accepts(&kind, &value) {
            return Err(EngineError::Attribute {
                id,
                reason: format!("{} does not accept {}", kind, value),
            });
        }
        if let Some(scene) = self.scene.as_mut() {
            scene.values.insert(id, value);
        }
        Ok(())
    }

    fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult<()> {
        self.record(EngineCall::WriteFile { name: name.to_string(), len: bytes.len() });
        if name.is_empty() {
            return Err(EngineError::Storage("empty file name".into()));
        }
        self.files.insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    fn replace_image(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::Image, asset_id, filename)
    }

    fn replace_font(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::Font, asset_id, filename)
    }

    fn replace_csv(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::Csv, asset_id, filename)
    }

    fn replace_svg(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::Svg, asset_id, filename)
    }

    fn replace_excel(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::Excel, asset_id, filename)
    }

    fn replace_google_sheet(&mut self, asset_id: &str, filename: &str) -> EngineResult<()> {
        self.replace(AssetKind::GoogleSheet, asset_id, filename)
    }

    fn index_font(&mut self, filename: &str) -> EngineResult<()> {
        self.record(EngineCall::IndexFont { filename: filename.to_string() });
        if self.fail_font_index {
            return Err(EngineError::Font(format!("{}: unreadable font", filename)));
        }
        if !self.files.contains_key(filename) {
            return Err(EngineError::Font(format!("{} not staged", filename)));
        }
        let (family, style) = font_from_filename(filename);
        let styles = self.fonts.entry(family.clone()).or_default();
        if !styles.contains(&style) {
            styles.push(style);
        }
        debug!("Indexed font {} ({} styles)", family, styles.len());
        Ok(())
    }

    fn list_fonts(&self) -> Vec<String> {
        self.record(EngineCall::ListFonts);
        self.fonts.keys().cloned().collect()
    }

    fn font_styles(&self, font: &str) -> Vec<String> {
        self.record(EngineCall::FontStyles { font: font.to_string() });
        self.fonts.get(font).cloned().unwrap_or_default()
    }

    fn pending_assets(&self) -> Vec<AssetDescriptor> {
        self.scene
            .as_ref()
            .map(|s| s.doc.pending_assets.clone())
            .unwrap_or_default()
    }

    fn make_surface(&mut self, target: &str, width: u32, height: u32) -> EngineResult<Surface> {
        self.record(EngineCall::MakeSurface { width, height });
        if self.fail_surfaces {
            return Err(EngineError::Surface(format!("context for {} lost", target)));
        }
        self.next_surface += 1;
        Ok(Surface::new(self.next_surface, width, height))
    }

    fn release_surface(&mut self, surface: Surface) {
        self.record(EngineCall::ReleaseSurface { id: surface.id() });
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Scene documents shared by tests across the crate.

    /// Opacity slider, color, int entry, pair, bool, string, font and one
    /// unsupported gradient, frames 0..=59 at 30 fps.
    pub const BASIC_SCENE: &str = r##"{
        "composition": "main",
        "resolution": { "width": 1920, "height": 1080 },
        "frameRange": { "start": 0, "end": 59 },
        "fps": 30,
        "attributes": [
            { "id": "layer1.opacity", "name": "Opacity", "kind": "double",
              "numericInfo": { "hasHardMin": true, "hardMin": 0, "hasHardMax": true, "hardMax": 1, "step": 0.05 },
              "value": 1.0 },
            { "id": "layer1.material.color", "name": "Fill", "kind": "color", "value": [1.0, 0.0, 0.0, 1.0] },
            { "id": "layer2.count", "kind": "int",
              "numericInfo": { "hasHardMin": true, "hardMin": 0 },
              "value": 3 },
            { "id": "layer2.position", "name": "Position", "kind": "double2", "value": [10.0, 20.0] },
            { "id": "layer2.visible", "name": "Visible", "kind": "bool", "value": true },
            { "id": "text1.string", "name": "Text", "kind": "string", "value": "Hello" },
            { "id": "text1.font", "name": "Font", "kind": "font", "value": { "family": "Inter", "style": "Regular" } },
            { "id": "layer3.gradient", "name": "Gradient", "kind": "gradient" }
        ],
        "fonts": { "Inter": ["Regular", "Bold"] }
    }"##;

    /// Minimal scene without attributes, frames 10..=20.
    pub const SHORT_SCENE: &str = r#"{
        "resolution": { "width": 800, "height": 600 },
        "frameRange": { "start": 10, "end": 20 },
        "fps": 25
    }"#;
}

#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn loaded() -> ScriptedEngine {
        let mut engine = ScriptedEngine::new();
        engine.load_scene(BASIC_SCENE.as_bytes(), "basic.cv").unwrap();
        engine
    }

    #[test]
    fn test_load_rejects_garbage() {
        let mut engine = ScriptedEngine::new();
        let err = engine.load_scene(b"not json", "bad.cv").unwrap_err();
        assert!(matches!(err, EngineError::Scene(_)));
        assert!(!engine.has_scene());
    }

    #[test]
    fn test_declared_attributes_in_order() {
        let engine = loaded();
        let ids = engine.declared_attributes(&engine.active_composition());
        assert_eq!(ids.len(), 8);
        assert_eq!(ids[0], "layer1.opacity");
        assert!(engine.declared_attributes(&CompId("other".into())).is_empty());
    }

    #[test]
    fn test_clock_advances_and_loops() {
        let mut engine = loaded();
        let surface = engine.make_surface("#canvas", 100, 100).unwrap();
        engine.begin();
        // First advance anchors the clock
        let s = engine.advance(&surface, 1000.0);
        assert!(!s.frame_changed);
        assert_eq!(s.current_frame, 0);
        // 30 fps: 100ms = 3 frames
        let s = engine.advance(&surface, 1100.0);
        assert!(s.frame_changed);
        assert_eq!(s.current_frame, 3);
        // 2s later = 60 frames -> wraps onto 3
        let s = engine.advance(&surface, 3100.0);
        assert_eq!(s.current_frame, 3);
    }

    #[test]
    fn test_clock_stops_without_loop() {
        let mut engine = ScriptedEngine::new();
        engine
            .load_scene(br#"{"resolution":{"width":1,"height":1},"frameRange":{"start":0,"end":4},"fps":10,"loop":false}"#, "s")
            .unwrap();
        let surface = engine.make_surface("#canvas", 1, 1).unwrap();
        engine.begin();
        engine.advance(&surface, 0.0);
        let s = engine.advance(&surface, 10_000.0);
        assert_eq!(s.current_frame, 4);
        assert!(!engine.is_running());
    }

    #[test]
    fn test_clock_wide_frame_range() {
        let mut engine = ScriptedEngine::new();
        engine
            .load_scene(
                br#"{"resolution":{"width":1,"height":1},"frameRange":{"start":-2000000000,"end":2000000000}}"#,
                "wide",
            )
            .unwrap();
        let surface = engine.make_surface("#canvas", 1, 1).unwrap();
        engine.begin();
        assert_eq!(engine.advance(&surface, 0.0).current_frame, -2_000_000_000);
        assert_eq!(engine.advance(&surface, 100.0).current_frame, -1_999_999_997);
        // Far past the end: wraps back inside the range
        let s = engine.advance(&surface, 1.0e15);
        assert!(engine.frame_range().contains(s.current_frame));
    }

    #[test]
    fn test_set_shape_checked() {
        let mut engine = loaded();
        assert!(engine.set("layer1", "opacity", AttrValue::Float(0.5)).is_ok());
        assert_eq!(engine.value_of("layer1.opacity"), Some(AttrValue::Float(0.5)));
        assert!(engine.set("layer1", "opacity", AttrValue::Bool(true)).is_err());
        assert!(engine.set("nope", "x", AttrValue::Float(0.5)).is_err());
    }

    #[test]
    fn test_replace_requires_staging() {
        let mut engine = loaded();
        assert!(engine.replace_image("logo", "logo.png").is_err());
        engine.write_file("logo.png", &[1, 2, 3]).unwrap();
        assert!(engine.replace_image("logo", "logo.png").is_ok());
    }

    #[test]
    fn test_index_font_adds_style() {
        let mut engine = loaded();
        engine.write_file("Inter-Black.ttf", &[0]).unwrap();
        engine.index_font("Inter-Black.ttf").unwrap();
        assert_eq!(engine.font_styles("Inter"), vec!["Regular", "Bold", "Black"]);
        engine.write_file("Mono.otf", &[0]).unwrap();
        engine.index_font("Mono.otf").unwrap();
        assert_eq!(engine.font_styles("Mono"), vec!["Regular"]);
    }
}
