/// Reference output backend
///
/// Adapts rodio to the [`crate::output::Output`] capability so hosts without
/// their own audio backend can drive real playback. The orchestration core
/// never depends on this module; it only ever sees the trait.
pub mod rodio_output;

pub use rodio_output::{RodioBackend, RodioOutput};
