//! Utility functions and helpers

pub mod clock;

pub use clock::{Clock, ManualClock, SharedClock, SystemClock};
