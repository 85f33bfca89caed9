//! UI Widgets - host-side state behind each panel
//!
//! Each widget is self-contained; the session wires them to the engine and
//! the EventBus.

pub mod ae;
pub mod timeline;
pub mod viewport;
