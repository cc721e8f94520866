/// Output capability driven by an emitter
///
/// The engine never decodes or synthesizes audio; every audible effect goes
/// through this trait, implemented by a host audio backend (a rodio-backed
/// reference implementation lives in [`crate::backend`]).
use std::time::Duration;

/// One playback channel of the host audio backend.
///
/// Control methods are infallible by contract: a backend that cannot honor a
/// call (resource gone, stream dead) must treat it as a no-op and report the
/// condition through [`Output::is_valid`], which the orchestrator polls every
/// tick.
pub trait Output {
    /// Bind the content handle of an assigned clip. Playback of any previous
    /// content stops.
    fn set_content(&mut self, content: &str);

    /// Start playback of the bound content at the given offset.
    fn play(&mut self, start_offset: Duration);

    /// Resume after [`Output::pause`] without restarting the content.
    fn resume(&mut self);

    fn pause(&mut self);

    fn stop(&mut self);

    /// Gain in 0.0-1.0; the emitter pushes its effective volume here.
    fn set_volume(&mut self, volume: f32);

    fn set_pitch(&mut self, pitch: f32);

    /// Applies from the next [`Output::play`].
    fn set_loop(&mut self, looping: bool);

    /// Whether the backend is currently producing (or paused on) sound.
    fn is_playing(&self) -> bool;

    /// Prepare a pooled channel for reuse.
    fn enable(&mut self) {}

    /// Quiesce a channel parked in the pool's idle cache.
    fn disable(&mut self) {}

    /// Free the backend resource; the channel is never used again.
    fn destroy(&mut self) {}

    /// False once the backend resource was torn down outside the engine.
    /// An emitter with an invalid output is discarded at the next tick.
    fn is_valid(&self) -> bool {
        true
    }
}
