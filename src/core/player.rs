//! Playback controller: play/stop/seek state machine and the tick loop.
//!
//! **Architecture**: Player does NOT own the engine, the scheduler or the
//! surface. The session owns them and lends them to each call, so one
//! controller outlives any number of scene loads.
//!
//! # States
//!
//! - **Stopped**: engine clock halted, last rendered frame stays visible.
//! - **Playing**: engine clock running, exactly one frame request pending.
//!
//! Every operation is a no-op while no scene is bound.
//!
//! # Tick loop
//!
//! `play()` schedules one display-frame request. Each `tick()` advances the
//! engine (which renders), mirrors a changed frame to the timeline and
//! schedules the next request. `stop()` cancels the pending request, so no
//! tick runs after it.
//!
//! # Seek policy
//!
//! Stop-seek-resume: seeking while playing halts the clock and cancels the
//! pending tick, sets the frame, renders it, then restarts the clock with a
//! fresh request. The displayed frame always equals the timeline value.

use super::event_bus::EventEmitter;
use super::player_events::{CurrentFrameChangedEvent, PlaybackStateChangedEvent};
use super::scheduler::{FrameScheduler, FrameToken};
use crate::engine::{Engine, FrameRange, Surface};
use log::{debug, info, trace};
use serde::Serialize;

/// Playback state mirrored into the timeline display.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_frame: i32,
    pub start_frame: i32,
    pub end_frame: i32,
}

impl PlaybackState {
    fn range(&self) -> FrameRange {
        FrameRange {
            start: self.start_frame,
            end: self.end_frame,
        }
    }
}

/// Playback state machine (does NOT own the engine)
#[derive(Debug, Default)]
pub struct Player {
    state: PlaybackState,
    bound: bool,
    pending: Option<FrameToken>,
    events: EventEmitter,
}

impl Player {
    pub fn new(events: EventEmitter) -> Self {
        Self {
            events,
            ..Default::default()
        }
    }

    // === Scene binding ===

    /// Attach to a freshly loaded scene. Starts Stopped.
    pub fn bind(&mut self, range: FrameRange, current_frame: i32) {
        self.state = PlaybackState {
            is_playing: false,
            current_frame: range.clamp(current_frame),
            start_frame: range.start,
            end_frame: range.end,
        };
        self.pending = None;
        self.bound = true;
        info!("Player bound to frames {}..={}", range.start, range.end);
    }

    /// Stop and detach before the scene handle is released.
    pub fn unbind(&mut self, engine: &mut dyn Engine, scheduler: &mut dyn FrameScheduler) {
        if !self.bound {
            return;
        }
        self.stop(engine, scheduler);
        self.bound = false;
        self.state = PlaybackState::default();
        debug!("Player unbound");
    }

    // === Accessors ===

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_bound(&self) -> bool {
        self.bound
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing
    }

    pub fn current_frame(&self) -> i32 {
        self.state.current_frame
    }

    /// Token of the outstanding frame request, if any.
    pub fn pending(&self) -> Option<FrameToken> {
        self.pending
    }

    // === Transitions ===

    /// Stopped -> Playing. Returns whether the player is now playing.
    pub fn play(&mut self, engine: &mut dyn Engine, scheduler: &mut dyn FrameScheduler) -> bool {
        if !self.bound {
            return false;
        }
        if self.state.is_playing {
            return true;
        }
        engine.begin();
        self.state.is_playing = true;
        self.pending = Some(scheduler.schedule_next_frame());
        trace!("Playback started at frame {}", self.state.current_frame);
        self.events.emit(PlaybackStateChangedEvent { playing: true });
        true
    }

    /// Playing -> Stopped. Valid in either state.
    pub fn stop(&mut self, engine: &mut dyn Engine, scheduler: &mut dyn FrameScheduler) {
        if !self.bound {
            return;
        }
        if let Some(token) = self.pending.take() {
            scheduler.cancel(token);
        }
        if self.state.is_playing {
            engine.halt();
            self.state.is_playing = false;
            trace!("Playback stopped at frame {}", self.state.current_frame);
            self.events.emit(PlaybackStateChangedEvent { playing: false });
        }
    }

    /// Play/Pause button.
    pub fn toggle(&mut self, engine: &mut dyn Engine, scheduler: &mut dyn FrameScheduler) {
        if self.state.is_playing {
            self.stop(engine, scheduler);
        } else {
            self.play(engine, scheduler);
        }
    }

    /// One display refresh. Returns `false` when the tick was not executed
    /// (stale or cancelled token, not playing, no scene).
    pub fn tick(
        &mut self,
        token: FrameToken,
        engine: &mut dyn Engine,
        scheduler: &mut dyn FrameScheduler,
        surface: Option<&Surface>,
        timestamp: f64,
    ) -> bool {
        if !self.bound || !self.state.is_playing || self.pending != Some(token) {
            trace!("Ignoring tick {:?} (pending {:?})", token, self.pending);
            return false;
        }
        self.pending = None;

        // No surface yet (zero-sized viewport): keep the loop alive, draw nothing
        if let Some(surface) = surface {
            let status = engine.advance(surface, timestamp);
            if status.frame_changed {
                self.state.current_frame = self.state.range().clamp(status.current_frame);
                self.events.emit(CurrentFrameChangedEvent(self.state.current_frame));
            }
        }

        if !engine.is_running() {
            // Engine clock ran out (non-looping scene)
            self.state.is_playing = false;
            debug!("Engine stopped at frame {}", self.state.current_frame);
            self.events.emit(PlaybackStateChangedEvent { playing: false });
            return true;
        }

        self.pending = Some(scheduler.schedule_next_frame());
        true
    }

    /// Move to `frame`, clamped into the scene range.
    pub fn seek(
        &mut self,
        frame: i32,
        engine: &mut dyn Engine,
        scheduler: &mut dyn FrameScheduler,
        surface: Option<&Surface>,
    ) {
        if !self.bound {
            return;
        }
        let target = self.state.range().clamp(frame);
        if target != frame {
            debug!("Seek {} clamped to {}", frame, target);
        }

        let resume = self.state.is_playing;
        if resume {
            if let Some(token) = self.pending.take() {
                scheduler.cancel(token);
            }
            engine.halt();
        }

        engine.set_frame(target);
        self.state.current_frame = target;
        if let Some(surface) = surface {
            engine.render(surface);
        }
        self.events.emit(CurrentFrameChangedEvent(target));

        if resume {
            engine.begin();
            self.pending = Some(scheduler.schedule_next_frame());
        }
    }

    /// Back to the first frame, play state preserved.
    pub fn restart(
        &mut self,
        engine: &mut dyn Engine,
        scheduler: &mut dyn FrameScheduler,
        surface: Option<&Surface>,
    ) {
        let start = self.state.start_frame;
        self.seek(start, engine, scheduler, surface);
    }

    /// Single frame step (prev/next buttons). Stops playback first.
    pub fn step_frame(
        &mut self,
        delta: i32,
        engine: &mut dyn Engine,
        scheduler: &mut dyn FrameScheduler,
        surface: Option<&Surface>,
    ) {
        if !self.bound || delta == 0 {
            return;
        }
        self.stop(engine, scheduler);
        let target = self
            .state
            .range()
            .clamp(engine.current_frame().saturating_add(delta.signum()));
        engine.set_frame(target);
        self.state.current_frame = target;
        if let Some(surface) = surface {
            engine.render(surface);
        }
        self.events.emit(CurrentFrameChangedEvent(target));
    }
}
