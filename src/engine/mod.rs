//! Engine capability - the opaque animation/rendering engine we drive.
//!
//! **Architecture**: nothing in this crate evaluates animation or draws
//! pixels. The engine does, behind the [`Engine`] trait. The session owns one
//! engine instance (no global), tells it *when* to tick and *what* values to
//! hold, and releases it on teardown.
//!
//! [`ScriptedEngine`] is an in-memory implementation driven by a JSON scene
//! document. It records every call, which makes it the test double for the
//! whole crate and the backend of the headless CLI.

pub mod scripted;

pub use scripted::{EngineCall, ScriptedEngine};

use crate::entities::{AssetDescriptor, AttrSchema, AttrValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque reference to a loaded composition inside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SceneHandle(Uuid);

impl SceneHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn id(&self) -> Uuid {
        self.0
    }
}

impl Default for SceneHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Active composition id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompId(pub String);

/// Scene resolution in scene pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Inclusive frame range of the active composition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameRange {
    pub start: i32,
    pub end: i32,
}

impl FrameRange {
    pub fn clamp(&self, frame: i32) -> i32 {
        if self.end < self.start {
            return self.start;
        }
        frame.clamp(self.start, self.end)
    }

    pub fn contains(&self, frame: i32) -> bool {
        frame >= self.start && frame <= self.end
    }
}

/// Result of one clock advance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickStatus {
    pub frame_changed: bool,
    pub current_frame: i32,
}

/// Drawing surface allocated by the engine. Not resizable in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    id: u64,
    width: u32,
    height: u32,
}

impl Surface {
    pub fn new(id: u64, width: u32, height: u32) -> Self {
        Self { id, width, height }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Engine-side failures
#[derive(Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Scene bytes rejected
    Scene(String),
    /// Operation needs a loaded scene
    NoScene,
    /// Set rejected (unknown attribute, wrong shape)
    Attribute { id: String, reason: String },
    /// Virtual storage write failed
    Storage(String),
    /// Replace call rejected
    Asset { asset_id: String, reason: String },
    /// Font indexing failed
    Font(String),
    /// Surface allocation failed or surface lost
    Surface(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Scene(msg) => write!(f, "Scene rejected: {}", msg),
            EngineError::NoScene => write!(f, "No scene loaded"),
            EngineError::Attribute { id, reason } => {
                write!(f, "Attribute {} rejected: {}", id, reason)
            }
            EngineError::Storage(msg) => write!(f, "Storage write failed: {}", msg),
            EngineError::Asset { asset_id, reason } => {
                write!(f, "Asset {} rejected: {}", asset_id, reason)
            }
            EngineError::Font(msg) => write!(f, "Font indexing failed: {}", msg),
            EngineError::Surface(msg) => write!(f, "Surface error: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {}

pub type EngineResult<T> = Result<T, EngineError>;

/// Capability surface of the animation engine.
///
/// Read-only introspection takes `&self`; anything that changes engine
/// state takes `&mut self`. Attribute ids are handed out in the engine's
/// dotted string form and addressed back as `(layer, attr)`.
pub trait Engine {
    // === Scene lifecycle ===

    fn load_scene(&mut self, bytes: &[u8], name: &str) -> EngineResult<SceneHandle>;

    /// Invalidate a handle. Called after playback is halted.
    fn release_scene(&mut self, scene: SceneHandle);

    // === Clock ===

    fn begin(&mut self);
    fn halt(&mut self);
    fn advance(&mut self, surface: &Surface, timestamp: f64) -> TickStatus;
    fn render(&mut self, surface: &Surface);
    fn set_frame(&mut self, frame: i32);
    fn current_frame(&self) -> i32;
    fn is_running(&self) -> bool;

    // === Scene metadata ===

    fn resolution(&self) -> Resolution;
    fn frame_range(&self) -> FrameRange;
    fn active_composition(&self) -> CompId;

    // === Attributes ===

    fn declared_attributes(&self, comp: &CompId) -> Vec<String>;
    fn schema(&self, layer: &str, attr: &str) -> Option<AttrSchema>;
    fn display_name(&self, layer: &str, attr: &str) -> Option<String>;
    fn get(&self, layer: &str, attr: &str) -> Option<AttrValue>;
    fn set(&mut self, layer: &str, attr: &str, value: AttrValue) -> EngineResult<()>;

    // === Assets & fonts ===

    /// Stage bytes in the engine's virtual storage.
    fn write_file(&mut self, name: &str, bytes: &[u8]) -> EngineResult<()>;
    fn replace_image(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn replace_font(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn replace_csv(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn replace_svg(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn replace_excel(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn replace_google_sheet(&mut self, asset_id: &str, filename: &str) -> EngineResult<()>;
    fn index_font(&mut self, filename: &str) -> EngineResult<()>;
    fn list_fonts(&self) -> Vec<String>;
    fn font_styles(&self, font: &str) -> Vec<String>;

    /// Assets the loaded scene references but does not embed.
    fn pending_assets(&self) -> Vec<AssetDescriptor>;

    // === Surfaces ===

    fn make_surface(&mut self, target: &str, width: u32, height: u32) -> EngineResult<Surface>;
    fn release_surface(&mut self, surface: Surface);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_range_clamp() {
        let r = FrameRange { start: 10, end: 20 };
        assert_eq!(r.clamp(5), 10);
        assert_eq!(r.clamp(25), 20);
        assert_eq!(r.clamp(15), 15);
        // Inverted range collapses onto start
        assert_eq!(FrameRange { start: 5, end: 0 }.clamp(3), 5);
    }

    #[test]
    fn test_scene_handles_unique() {
        assert_ne!(SceneHandle::new(), SceneHandle::new());
    }
}
