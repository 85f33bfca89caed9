//! Viewport widget - scene fit and drawing surface ownership

mod scaler;

pub use scaler::{DEFAULT_MARGIN, SurfaceSize, ViewportScaler, fit};
