//! Attribute controls widget
//!
//! One control per engine attribute, with edits pushed straight back to the
//! engine.

pub mod controls;
mod registry;

pub use controls::{BindingError, ControlDescriptor, EditInput, Widget};
pub use registry::{ControlRegistry, DEFAULT_FLOAT_STEP, EditOutcome};
