//! User-interaction signal reporting.

pub mod tracker;

pub use tracker::{ActivityTracker, InteractionSignal};
