//! Test helpers shared across promptvault crates.

pub mod events;
pub mod fixtures;
pub mod generator;

pub use events::RecordingSink;
pub use fixtures::{fragment, model_config};
pub use generator::{FailingGenerator, FixedGenerator, RecordingGenerator, SlowGenerator};
