/// Per-instance playback state machine
///
/// One emitter drives one output channel. It computes effective volume as a
/// product of independently clamped factors, advances at most one transition
/// per tick, and reports when it is safe to recycle.
pub mod ramp;
pub mod state;

use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::clip::{AudioCategory, AudioId, ClipDescriptor};
use crate::output::Output;
pub use ramp::Ramp;
pub use state::{DelayedAction, EmitterState, Held};

/// A transition landing below this leaves the output inaudible, so the real
/// pause/stop is committed when the ramp completes; at or above it the
/// output keeps running.
const COMMIT_THRESHOLD: f32 = 0.5;

fn clamp01(value: f32) -> f32 {
    value.clamp(0.0, 1.0)
}

/// Delivered to completion subscribers when an emitter is reaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    pub id: AudioId,
    pub category: AudioCategory,
}

/// One sound instance: a bound clip, an output channel and the fade state
/// that shapes its volume over time.
pub struct Emitter {
    clip: Option<ClipDescriptor>,
    output: Box<dyn Output>,
    state: EmitterState,
    /// Play/stop fade multiplier, one axis of the volume product.
    play_fade: f32,
    /// Pause/resume fade multiplier, the other axis.
    pause_fade: f32,
    volume_multiplier: f32,
    category_volume: f32,
    completion: Vec<Sender<CompletionEvent>>,
}

impl Emitter {
    pub fn new(output: Box<dyn Output>) -> Self {
        Self {
            clip: None,
            output,
            state: EmitterState::Idle,
            play_fade: 0.0,
            pause_fade: 1.0,
            volume_multiplier: 1.0,
            category_volume: 1.0,
            completion: Vec::new(),
        }
    }

    /// Bind a clip and reset all transient state. Any previous binding must
    /// have been cleaned up first.
    pub fn assign_clip(&mut self, clip: ClipDescriptor, category_volume: f32) {
        self.play_fade = 0.0;
        self.pause_fade = 1.0;
        self.volume_multiplier = 1.0;
        self.category_volume = clamp01(category_volume);
        self.state = EmitterState::Idle;

        self.output.set_content(&clip.content);
        self.output.set_pitch(clip.pitch);
        self.output.set_loop(clip.looping);
        self.push_volume();

        tracing::debug!("Assigned clip {} ({})", clip.id, clip.category);
        self.clip = Some(clip);
    }

    /// Start (or restart) playback of the bound clip.
    ///
    /// The new play fade starts from the product of the current play and
    /// pause multipliers, so playing over a half-finished stop or pause
    /// picks up at the audible level instead of popping. A delay defers the
    /// literal output start call, not the logical transition.
    pub fn play(
        &mut self,
        volume_multiplier: f32,
        fade_in: Duration,
        delay: Duration,
        start_offset: Duration,
        loop_override: Option<bool>,
    ) {
        let Some(clip) = &self.clip else {
            tracing::warn!("Play called on an emitter with no clip bound");
            return;
        };

        let carried = clamp01(self.play_fade) * clamp01(self.pause_fade);
        self.pause_fade = 1.0;
        self.volume_multiplier = volume_multiplier;
        self.output.set_loop(loop_override.unwrap_or(clip.looping));

        let fade_secs = fade_in.as_secs_f32();
        let fade = if fade_secs > 0.0 {
            self.play_fade = carried;
            Some(Ramp::new(carried, 1.0, fade_secs))
        } else {
            self.play_fade = 1.0;
            None
        };

        let delay_secs = delay.as_secs_f32();
        if delay_secs > 0.0 {
            self.state = EmitterState::Delayed {
                remaining: delay_secs,
                action: DelayedAction::Start {
                    offset_secs: start_offset.as_secs_f32(),
                    fade_in: fade,
                },
            };
        } else {
            self.output.play(start_offset);
            self.state = match fade {
                Some(ramp) => EmitterState::FadingIn(ramp),
                None => EmitterState::Playing,
            };
        }
        self.push_volume();
    }

    /// Begin a pause transition toward silence. Clears any pending delay;
    /// the play axis is held and restored by a later unpause.
    pub fn pause(&mut self, fade_out: Duration) {
        let held = match self.state {
            EmitterState::Idle => return,
            EmitterState::Delayed { action, .. } => match action {
                DelayedAction::Start { fade_in, .. } => {
                    fade_in.map(Held::FadingIn).unwrap_or(Held::Steady)
                }
                DelayedAction::Stop { fade_out } => {
                    fade_out.map(Held::FadingOut).unwrap_or(Held::Steady)
                }
            },
            EmitterState::Playing => Held::Steady,
            EmitterState::FadingIn(ramp) => Held::FadingIn(ramp),
            EmitterState::FadingOut(ramp) => Held::FadingOut(ramp),
            EmitterState::Paused(held) => held,
            EmitterState::PauseFadingOut { held, .. } => held,
            EmitterState::PauseFadingIn { held, .. } => held,
        };

        let fade_secs = fade_out.as_secs_f32();
        if fade_secs > 0.0 {
            self.state = EmitterState::PauseFadingOut {
                ramp: Ramp::new(clamp01(self.pause_fade), 0.0, fade_secs),
                held,
            };
        } else {
            self.pause_fade = 0.0;
            self.push_volume();
            self.output.pause();
            self.state = EmitterState::Paused(held);
        }
    }

    /// Resume from a pause transition. Output playback resumes immediately;
    /// the volume ramps back up if a fade is requested. No-op when not
    /// paused.
    pub fn unpause(&mut self, fade_in: Duration) {
        let held = match self.state {
            EmitterState::Paused(held)
            | EmitterState::PauseFadingOut { held, .. }
            | EmitterState::PauseFadingIn { held, .. } => held,
            _ => return,
        };

        self.output.resume();
        let fade_secs = fade_in.as_secs_f32();
        if fade_secs > 0.0 {
            self.state = EmitterState::PauseFadingIn {
                ramp: Ramp::new(clamp01(self.pause_fade), 1.0, fade_secs),
                held,
            };
        } else {
            self.pause_fade = 1.0;
            self.push_volume();
            self.state = held.into_state();
        }
    }

    /// Begin a stop transition toward silence, honoring an optional delay.
    /// A stopping emitter stays alive until the fade lands, then commits
    /// the real output stop and is reaped.
    pub fn stop(&mut self, fade_out: Duration, delay: Duration) {
        if matches!(self.state, EmitterState::Idle) {
            return;
        }

        let fade_secs = fade_out.as_secs_f32();
        let ramp =
            (fade_secs > 0.0).then(|| Ramp::new(clamp01(self.play_fade), 0.0, fade_secs));

        let delay_secs = delay.as_secs_f32();
        if delay_secs > 0.0 {
            self.state = EmitterState::Delayed {
                remaining: delay_secs,
                action: DelayedAction::Stop { fade_out: ramp },
            };
        } else {
            match ramp {
                Some(ramp) => self.state = EmitterState::FadingOut(ramp),
                None => {
                    self.play_fade = 0.0;
                    self.push_volume();
                    self.output.stop();
                    self.state = EmitterState::Idle;
                }
            }
        }
    }

    /// Update the category factor; takes effect on the output immediately,
    /// no animation.
    pub fn set_category_volume(&mut self, volume: f32) {
        self.category_volume = clamp01(volume);
        self.push_volume();
    }

    pub fn set_pitch(&mut self, pitch: f32) {
        self.output.set_pitch(pitch);
    }

    /// Advance exactly one of {pause fade, delay, play fade}, in that
    /// priority order, then report whether the emitter has ended.
    ///
    /// Returns true only when no transition is pending and the output
    /// reports it is not producing sound.
    pub fn tick(&mut self, dt: Duration) -> bool {
        self.advance(dt.as_secs_f32());
        match self.state {
            EmitterState::Idle | EmitterState::Playing => !self.output.is_playing(),
            _ => false,
        }
    }

    fn advance(&mut self, dt: f32) {
        match self.state {
            EmitterState::PauseFadingOut { mut ramp, held } => {
                self.pause_fade = ramp.advance(dt);
                self.push_volume();
                if ramp.finished() {
                    if ramp.target() < COMMIT_THRESHOLD {
                        self.output.pause();
                        self.state = EmitterState::Paused(held);
                    } else {
                        self.state = held.into_state();
                    }
                } else {
                    self.state = EmitterState::PauseFadingOut { ramp, held };
                }
            }
            EmitterState::PauseFadingIn { mut ramp, held } => {
                self.pause_fade = ramp.advance(dt);
                self.push_volume();
                if ramp.finished() {
                    self.state = held.into_state();
                } else {
                    self.state = EmitterState::PauseFadingIn { ramp, held };
                }
            }
            EmitterState::Delayed { remaining, action } => {
                let remaining = remaining - dt;
                if remaining > 0.0 {
                    self.state = EmitterState::Delayed { remaining, action };
                    return;
                }
                match action {
                    DelayedAction::Start {
                        offset_secs,
                        fade_in,
                    } => {
                        self.output
                            .play(Duration::from_secs_f32(offset_secs.max(0.0)));
                        self.push_volume();
                        self.state = match fade_in {
                            Some(ramp) => EmitterState::FadingIn(ramp),
                            None => EmitterState::Playing,
                        };
                    }
                    DelayedAction::Stop { fade_out } => match fade_out {
                        Some(ramp) => self.state = EmitterState::FadingOut(ramp),
                        None => {
                            self.play_fade = 0.0;
                            self.push_volume();
                            self.output.stop();
                            self.state = EmitterState::Idle;
                        }
                    },
                }
            }
            EmitterState::FadingIn(mut ramp) => {
                self.play_fade = ramp.advance(dt);
                self.push_volume();
                self.state = if ramp.finished() {
                    EmitterState::Playing
                } else {
                    EmitterState::FadingIn(ramp)
                };
            }
            EmitterState::FadingOut(mut ramp) => {
                self.play_fade = ramp.advance(dt);
                self.push_volume();
                if ramp.finished() {
                    if ramp.target() < COMMIT_THRESHOLD {
                        self.output.stop();
                    }
                    self.state = EmitterState::Idle;
                } else {
                    self.state = EmitterState::FadingOut(ramp);
                }
            }
            EmitterState::Playing | EmitterState::Paused(_) | EmitterState::Idle => {}
        }
    }

    /// Product of the five independently clamped volume factors.
    pub fn effective_volume(&self) -> f32 {
        let base = self.clip.as_ref().map(|c| c.base_volume).unwrap_or(1.0);
        clamp01(self.pause_fade)
            * clamp01(self.play_fade)
            * clamp01(self.category_volume)
            * clamp01(base)
            * clamp01(self.volume_multiplier)
    }

    fn push_volume(&mut self) {
        let volume = self.effective_volume();
        self.output.set_volume(volume);
    }

    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    pub fn is_paused(&self) -> bool {
        self.state.is_paused()
    }

    pub fn is_stopping(&self) -> bool {
        self.state.is_stopping()
    }

    pub fn state(&self) -> &EmitterState {
        &self.state
    }

    pub fn clip(&self) -> Option<&ClipDescriptor> {
        self.clip.as_ref()
    }

    pub fn play_fade(&self) -> f32 {
        self.play_fade
    }

    pub fn pause_fade(&self) -> f32 {
        self.pause_fade
    }

    /// Register a completion subscriber; the orchestrator fires it once,
    /// at the tick the emitter is reaped.
    pub fn subscribe_completion(&mut self) -> Receiver<CompletionEvent> {
        let (tx, rx) = unbounded();
        self.completion.push(tx);
        rx
    }

    /// Fire and drop all completion subscribers. Closed receivers are fine.
    pub(crate) fn notify_completion(&mut self) {
        let Some(clip) = &self.clip else {
            self.completion.clear();
            return;
        };
        let event = CompletionEvent {
            id: clip.id.clone(),
            category: clip.category.clone(),
        };
        for subscriber in self.completion.drain(..) {
            let _ = subscriber.try_send(event.clone());
        }
    }

    /// Force-stop the output, unbind the clip and drop subscribers.
    pub fn cleanup(&mut self) {
        self.output.stop();
        self.clip = None;
        self.completion.clear();
        self.state = EmitterState::Idle;
        self.play_fade = 0.0;
        self.pause_fade = 1.0;
        self.volume_multiplier = 1.0;
        self.category_volume = 1.0;
    }

    pub(crate) fn output_valid(&self) -> bool {
        self.output.is_valid()
    }

    pub(crate) fn enable_output(&mut self) {
        self.output.enable();
    }

    pub(crate) fn disable_output(&mut self) {
        self.output.disable();
    }

    pub(crate) fn destroy_output(&mut self) {
        self.output.destroy();
    }
}

impl std::fmt::Debug for Emitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("clip", &self.clip.as_ref().map(|c| &c.id))
            .field("state", &self.state)
            .field("play_fade", &self.play_fade)
            .field("pause_fade", &self.pause_fade)
            .finish()
    }
}
