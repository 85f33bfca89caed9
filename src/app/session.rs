//! Player session: owns the engine and wires every component to it.
//!
//! # Scene load order
//!
//! 1. Stop playback, drop controls, release the surface and the old scene
//! 2. `load_scene`
//! 3. Pending assets (parallel fetch, then wired in)
//! 4. Controls built from the active composition
//! 5. Player bound, timeline reset to the start frame
//! 6. Surface allocated at the current viewport size
//! 7. Autoplay
//!
//! A failure in 2 or 3 leaves no scene loaded and sets the error indicator.
//!
//! # Teardown
//!
//! Drop releases the surface, then the scene, then the engine.

use crate::core::assets::{AssetOutcome, AssetPipeline, AssetSource};
use crate::core::event_bus::{BoxedEvent, EventBus, downcast_event};
use crate::core::player::{PlaybackState, Player};
use crate::core::player_events::{CurrentFrameChangedEvent, PlaybackStateChangedEvent, SessionFailedEvent};
use crate::core::scheduler::FrameScheduler;
use crate::engine::{Engine, EngineError, SceneHandle};
use crate::entities::AssetDescriptor;
use crate::settings::PlayerSettings;
use crate::widgets::ae::{ControlRegistry, EditInput, EditOutcome};
use crate::widgets::timeline::TimelineState;
use crate::widgets::viewport::{SurfaceSize, ViewportScaler};
use log::{debug, error, info, warn};
use std::fmt;

/// Failures surfaced to the host.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    /// Scene bytes rejected by the engine
    SceneLoad { name: String, source: EngineError },
    /// Some pending assets could not be fetched or wired in
    PendingAssets { name: String, failed: Vec<String> },
    /// Drawing surface lost; a reload is needed
    ResourceLost(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::SceneLoad { name, source } => write!(f, "Failed to load {}: {}", name, source),
            SessionError::PendingAssets { name, failed } => {
                write!(f, "Failed to load {}: missing assets {}", name, failed.join(", "))
            }
            SessionError::ResourceLost(msg) => write!(f, "Drawing surface lost: {}", msg),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::SceneLoad { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub struct PlayerSession<E: Engine, S: FrameScheduler> {
    // Dropped after Drop::drop released surface and scene
    engine: E,
    scheduler: S,
    settings: PlayerSettings,
    scene: Option<SceneHandle>,
    scene_name: Option<String>,
    player: Player,
    controls: ControlRegistry,
    assets: AssetPipeline,
    viewport: ViewportScaler,
    timeline: TimelineState,
    event_bus: EventBus,
    error: Option<String>,
}

impl<E: Engine, S: FrameScheduler> PlayerSession<E, S> {
    pub fn new(engine: E, scheduler: S, settings: PlayerSettings) -> Self {
        let event_bus = EventBus::new();
        let mut viewport = ViewportScaler::new(settings.canvas_target.clone(), settings.viewport_margin);
        viewport.set_available((settings.viewport_width, settings.viewport_height));
        Self {
            player: Player::new(event_bus.emitter()),
            controls: ControlRegistry::new(settings.float_step, event_bus.emitter()),
            assets: AssetPipeline::new(event_bus.emitter()),
            viewport,
            timeline: TimelineState::default(),
            engine,
            scheduler,
            settings,
            scene: None,
            scene_name: None,
            event_bus,
            error: None,
        }
    }

    // === Accessors ===

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn controls(&self) -> &ControlRegistry {
        &self.controls
    }

    pub fn timeline(&self) -> &TimelineState {
        &self.timeline
    }

    pub fn playback(&self) -> PlaybackState {
        self.player.state()
    }

    pub fn is_playing(&self) -> bool {
        self.player.is_playing()
    }

    pub fn has_scene(&self) -> bool {
        self.scene.is_some()
    }

    pub fn scene_name(&self) -> Option<&str> {
        self.scene_name.as_deref()
    }

    pub fn surface_size(&self) -> SurfaceSize {
        self.viewport
            .surface()
            .map(|s| SurfaceSize {
                width: s.width(),
                height: s.height(),
            })
            .unwrap_or_default()
    }

    /// Persistent error indicator (load failure, lost surface).
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Bus for host subscriptions.
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    // === Scene lifecycle ===

    /// Replace the current scene with `bytes`.
    pub fn load(&mut self, bytes: &[u8], name: &str, source: &dyn AssetSource) -> Result<(), SessionError> {
        info!("Loading scene {}", name);
        self.teardown_scene();

        let handle = match self.engine.load_scene(bytes, name) {
            Ok(handle) => handle,
            Err(source) => {
                return Err(self.fail(SessionError::SceneLoad {
                    name: name.to_string(),
                    source,
                }));
            }
        };

        let pending = self.engine.pending_assets();
        let report = self.assets.load_pending(&mut self.engine, &pending, source);
        if !report.is_complete() {
            self.engine.release_scene(handle);
            return Err(self.fail(SessionError::PendingAssets {
                name: name.to_string(),
                failed: report.failed,
            }));
        }

        let comp = self.engine.active_composition();
        let count = self.controls.build(&self.engine, &comp);
        if count == 0 {
            info!("No controls for {}", name);
        }

        let range = self.engine.frame_range();
        self.player.bind(range, self.engine.current_frame());
        self.timeline.reset(range, self.player.current_frame());

        self.scene = Some(handle);
        self.scene_name = Some(name.to_string());
        self.error = None;

        let available = self.viewport.available();
        if let Err(e) = self.viewport.reallocate(&mut self.engine, available) {
            // Scene is loaded but cannot be shown
            self.fail(SessionError::ResourceLost(e.to_string()));
            return Ok(());
        }

        if self.settings.autoplay {
            self.play();
        }
        info!(
            "Scene {} ready: {} controls, frames {}..={}",
            name, count, range.start, range.end
        );
        Ok(())
    }

    fn teardown_scene(&mut self) {
        self.player.unbind(&mut self.engine, &mut self.scheduler);
        self.controls.clear();
        self.viewport.release(&mut self.engine);
        if let Some(handle) = self.scene.take() {
            debug!("Releasing scene {:?}", self.scene_name);
            self.engine.release_scene(handle);
        }
        self.scene_name = None;
        self.timeline = TimelineState::default();
    }

    fn fail(&mut self, err: SessionError) -> SessionError {
        error!("{}", err);
        let message = err.to_string();
        self.error = Some(message.clone());
        self.event_bus.emit(SessionFailedEvent { message });
        err
    }

    // === Viewport ===

    /// Viewport resized: reallocate the surface at the new fit.
    pub fn resize(&mut self, width: f64, height: f64) -> Result<SurfaceSize, SessionError> {
        if self.scene.is_none() {
            self.viewport.set_available((width, height));
            return Ok(SurfaceSize::default());
        }
        self.viewport
            .reallocate(&mut self.engine, (width, height))
            .map_err(|e| self.fail(SessionError::ResourceLost(e.to_string())))
    }

    /// Host noticed the surface became invalid (context loss).
    pub fn report_surface_lost(&mut self, reason: &str) -> SessionError {
        self.player.stop(&mut self.engine, &mut self.scheduler);
        self.viewport.release(&mut self.engine);
        self.sync_timeline();
        self.fail(SessionError::ResourceLost(reason.to_string()))
    }

    // === Playback ===

    pub fn play(&mut self) -> bool {
        let playing = self.player.play(&mut self.engine, &mut self.scheduler);
        self.sync_timeline();
        playing
    }

    pub fn stop(&mut self) {
        self.player.stop(&mut self.engine, &mut self.scheduler);
        self.sync_timeline();
    }

    pub fn toggle_playback(&mut self) {
        self.player.toggle(&mut self.engine, &mut self.scheduler);
        self.sync_timeline();
    }

    /// Timeline scrub.
    pub fn seek(&mut self, frame: i32) {
        self.player
            .seek(frame, &mut self.engine, &mut self.scheduler, self.viewport.surface());
        self.sync_timeline();
    }

    pub fn restart(&mut self) {
        self.player
            .restart(&mut self.engine, &mut self.scheduler, self.viewport.surface());
        self.sync_timeline();
    }

    pub fn prev(&mut self) {
        self.player
            .step_frame(-1, &mut self.engine, &mut self.scheduler, self.viewport.surface());
        self.sync_timeline();
    }

    pub fn next(&mut self) {
        self.player
            .step_frame(1, &mut self.engine, &mut self.scheduler, self.viewport.surface());
        self.sync_timeline();
    }

    /// Host display refresh at `now` (ms). Returns whether a tick ran.
    pub fn on_display_frame(&mut self, now: f64) -> bool {
        let Some(token) = self.scheduler.take_due(now) else {
            return false;
        };
        let ran = self.player.tick(
            token,
            &mut self.engine,
            &mut self.scheduler,
            self.viewport.surface(),
            now,
        );
        self.sync_timeline();
        ran
    }

    fn sync_timeline(&mut self) {
        if self.player.is_bound() {
            self.timeline.sync(&self.player.state());
        }
    }

    // === Controls & assets ===

    pub fn edit(&mut self, key: &str, input: EditInput) -> EditOutcome {
        self.controls
            .apply_edit(&mut self.engine, key, input, self.viewport.surface())
    }

    /// Re-read bound values from the engine.
    pub fn refresh_values(&mut self) {
        self.controls.refresh_values(&self.engine);
    }

    pub fn replace_asset(&mut self, asset: &AssetDescriptor, bytes: &[u8]) -> AssetOutcome {
        if self.scene.is_none() {
            warn!("Asset {} ignored: no scene loaded", asset.asset_id);
            return AssetOutcome::Skipped("no scene loaded".to_string());
        }
        let outcome = self
            .assets
            .replace(&mut self.engine, Some(&mut self.controls), asset, bytes);
        if outcome.is_replaced() {
            self.controls.refresh_values(&self.engine);
            if let Some(surface) = self.viewport.surface()
                && !self.engine.is_running()
            {
                self.engine.render(surface);
            }
        }
        outcome
    }

    // === Events ===

    /// Drain queued events, mirroring frame/state changes into the timeline.
    pub fn pump_events(&mut self) -> Vec<BoxedEvent> {
        let events = self.event_bus.poll();
        for event in &events {
            if let Some(CurrentFrameChangedEvent(frame)) = downcast_event::<CurrentFrameChangedEvent>(event) {
                self.timeline.set_value(*frame);
            } else if downcast_event::<PlaybackStateChangedEvent>(event).is_some() {
                self.sync_timeline();
            }
        }
        events
    }
}

impl<E: Engine, S: FrameScheduler> Drop for PlayerSession<E, S> {
    fn drop(&mut self) {
        self.player.unbind(&mut self.engine, &mut self.scheduler);
        self.viewport.release(&mut self.engine);
        if let Some(handle) = self.scene.take() {
            self.engine.release_scene(handle);
        }
        debug!("Session torn down");
    }
}
