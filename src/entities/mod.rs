//! Entities module - value types shared between the engine and the controls
//!
//! - `attrs`: attribute ids, kinds, schemas and values
//! - `color`: engine color <-> `#rrggbb` codec
//! - `assets`: replaceable asset descriptors

pub mod assets;
pub mod attrs;
pub mod color;

pub use assets::{AssetDescriptor, AssetKind};
pub use attrs::{AttrId, AttrKind, AttrSchema, AttrValue, ColorRecord, FontRef, NumericLimits};
