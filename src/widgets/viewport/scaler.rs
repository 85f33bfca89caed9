//! Fit the scene into the viewport and own the engine drawing surface.
//!
//! Surfaces cannot be resized in place: every resize and every scene load
//! releases the old surface and allocates a new one. A zero-sized fit leaves
//! no surface at all, which callers treat as "not yet renderable".

use crate::engine::{Engine, EngineError, Resolution, Surface};
use log::{debug, error};

/// Default fraction of the viewport the scene may occupy.
pub const DEFAULT_MARGIN: f64 = 0.9;

/// Output surface size in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SurfaceSize {
    pub width: u32,
    pub height: u32,
}

impl SurfaceSize {
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Largest aspect-preserving size of `scene` inside `available * margin`.
///
/// Degenerate inputs (non-positive viewport, empty scene) give `0x0`.
pub fn fit(scene: Resolution, available: (f64, f64), margin: f64) -> SurfaceSize {
    let (aw, ah) = available;
    if !(aw.is_finite() && ah.is_finite()) || aw <= 0.0 || ah <= 0.0 {
        return SurfaceSize::default();
    }
    if scene.width == 0 || scene.height == 0 {
        return SurfaceSize::default();
    }
    let margin = if margin.is_finite() && margin > 0.0 { margin } else { 1.0 };
    let (sw, sh) = (scene.width as f64, scene.height as f64);
    let scale = ((aw * margin) / sw).min((ah * margin) / sh);
    SurfaceSize {
        width: (sw * scale).floor() as u32,
        height: (sh * scale).floor() as u32,
    }
}

/// Viewport state: last available size + the live surface.
#[derive(Debug)]
pub struct ViewportScaler {
    target: String,
    margin: f64,
    available: (f64, f64),
    surface: Option<Surface>,
}

impl ViewportScaler {
    pub fn new(target: impl Into<String>, margin: f64) -> Self {
        Self {
            target: target.into(),
            margin,
            available: (0.0, 0.0),
            surface: None,
        }
    }

    pub fn surface(&self) -> Option<&Surface> {
        self.surface.as_ref()
    }

    pub fn available(&self) -> (f64, f64) {
        self.available
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Record the viewport size without touching the surface (no scene yet).
    pub fn set_available(&mut self, available: (f64, f64)) {
        self.available = available;
    }

    /// Release the current surface and allocate one fitting `available`.
    ///
    /// Renders once on the new surface unless the engine clock is running
    /// (the tick loop draws the next frame anyway). An allocation failure
    /// leaves no surface and is returned to the caller.
    pub fn reallocate(
        &mut self,
        engine: &mut dyn Engine,
        available: (f64, f64),
    ) -> Result<SurfaceSize, EngineError> {
        self.available = available;
        self.release(engine);

        let size = fit(engine.resolution(), available, self.margin);
        if size.is_empty() {
            debug!(
                "Viewport {:.0}x{:.0} too small, surface not yet renderable",
                available.0, available.1
            );
            return Ok(size);
        }

        let surface = engine
            .make_surface(&self.target, size.width, size.height)
            .inspect_err(|e| error!("Surface allocation for {} failed: {}", self.target, e))?;
        debug!("Surface {} allocated at {}x{}", surface.id(), size.width, size.height);
        if !engine.is_running() {
            engine.render(&surface);
        }
        self.surface = Some(surface);
        Ok(size)
    }

    /// Hand the surface back to the engine.
    pub fn release(&mut self, engine: &mut dyn Engine) {
        if let Some(old) = self.surface.take() {
            engine.release_surface(old);
        }
    }
}
