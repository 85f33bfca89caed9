//! Timeline widget - frame slider and play button

mod timeline;

pub use timeline::{PlayLabel, TimelineState};
