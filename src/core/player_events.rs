//! Session and playback events published on the [`EventBus`](super::event_bus::EventBus).

use crate::entities::AssetKind;

// === Playback ===

/// Engine reported a new current frame (tick, seek, step).
#[derive(Clone, Debug, PartialEq)]
pub struct CurrentFrameChangedEvent(pub i32);

/// Play/stop transition.
#[derive(Clone, Debug, PartialEq)]
pub struct PlaybackStateChangedEvent {
    pub playing: bool,
}

// === Controls ===

/// Control centre rebuilt from scratch.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlsRebuiltEvent {
    pub count: usize,
}

/// Font-dependent controls re-read the engine font index.
#[derive(Clone, Debug, PartialEq)]
pub struct FontControlsRefreshedEvent {
    pub controls: usize,
    pub fonts: usize,
}

// === Assets ===

#[derive(Clone, Debug, PartialEq)]
pub struct AssetReplacedEvent {
    pub asset_id: String,
    pub kind: AssetKind,
}

/// Asset dropped with a diagnostic (unsupported kind, engine refusal).
#[derive(Clone, Debug, PartialEq)]
pub struct AssetSkippedEvent {
    pub asset_id: String,
    pub reason: String,
}

// === Failures ===

/// Blocking failure shown in the persistent error indicator.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionFailedEvent {
    pub message: String,
}
