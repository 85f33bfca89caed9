//! Core modules - playback, frame scheduling, assets, events
//!
//! These modules drive the engine and are independent of any UI.

pub mod assets;
pub mod event_bus;
pub mod player;
pub mod player_events;
pub mod scheduler;

// Re-exports for convenience
pub use assets::{AssetOutcome, AssetPipeline, AssetSource, BatchReport, DirSource};
pub use event_bus::EventBus;
pub use player::{PlaybackState, Player};
pub use scheduler::{FrameScheduler, FrameToken, IntervalScheduler, ManualScheduler};
