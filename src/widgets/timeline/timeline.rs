//! Timeline widget - state mirrored from the playback controller.
//!
//! The slider and the play button do not own any playback state: they are
//! refreshed from [`PlaybackState`] after every controller operation and on
//! every frame event. Scrubbing goes back through the controller's seek.

use crate::core::player::PlaybackState;
use crate::engine::FrameRange;
use serde::Serialize;

/// Label shown on the play button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PlayLabel {
    Play,
    Pause,
}

impl PlayLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlayLabel::Play => "Play",
            PlayLabel::Pause => "Pause",
        }
    }
}

/// Timeline slider + play button state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineState {
    pub min: i32,
    pub max: i32,
    pub value: i32,
    pub label: PlayLabel,
}

impl Default for TimelineState {
    fn default() -> Self {
        Self {
            min: 0,
            max: 0,
            value: 0,
            label: PlayLabel::Play,
        }
    }
}

impl TimelineState {
    /// Reset bounds to a freshly loaded scene.
    pub fn reset(&mut self, range: FrameRange, current: i32) {
        self.min = range.start;
        self.max = range.end;
        self.value = range.clamp(current);
        self.label = PlayLabel::Play;
    }

    /// Mirror the controller.
    pub fn sync(&mut self, state: &PlaybackState) {
        self.min = state.start_frame;
        self.max = state.end_frame;
        self.value = state.current_frame;
        self.label = if state.is_playing { PlayLabel::Pause } else { PlayLabel::Play };
    }

    /// Frame only, from a `CurrentFrameChangedEvent`.
    pub fn set_value(&mut self, frame: i32) {
        self.value = frame.clamp(self.min, self.max.max(self.min));
    }

    /// Slider position as 0..1 for progress displays.
    pub fn progress(&self) -> f64 {
        let span = self.max as f64 - self.min as f64;
        if span <= 0.0 {
            return 0.0;
        }
        (self.value as f64 - self.min as f64) / span
    }
}
