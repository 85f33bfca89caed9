//! SCENA - host-side control shell for an animation engine
//!
//! Loads a scene into an engine, plays it, exposes its attributes as
//! editable controls and hot-swaps its assets. The engine itself sits behind
//! the [`engine::Engine`] trait.

// Core (playback, scheduling, assets, events)
pub mod core;

// App modules
pub mod app;
pub mod cli;
pub mod config;
pub mod engine;
pub mod entities;
pub mod settings;
pub mod widgets;

// Re-export commonly used types
pub use app::{PlayerSession, SessionError};
pub use core::event_bus::{BoxedEvent, EventBus, EventEmitter, downcast_event};
pub use core::player::Player;
pub use engine::{Engine, EngineError, ScriptedEngine};

// Re-export entities
pub use entities::{AssetDescriptor, AssetKind, AttrId, AttrKind, AttrValue};
