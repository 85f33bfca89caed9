//! Application module - the player session and its wiring.
//!
//! - `session` - scene lifecycle, playback routing, edits and asset swaps

mod session;

pub use session::{PlayerSession, SessionError};
