/// Emitter playback state
///
/// One tagged value per emitter. The in-flight ramps and deferred actions
/// live in the variant payloads, so combinations like "paused while
/// stopping with a stale delay" cannot be represented at all.
use super::ramp::Ramp;

/// Play-axis activity suspended while a pause transition is in charge.
///
/// Restored verbatim once the pause axis settles back to running, so a play
/// fade interrupted by a pause resumes where it left off.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Held {
    Steady,
    FadingIn(Ramp),
    FadingOut(Ramp),
}

impl Held {
    /// The state the play axis returns to when the pause transition ends.
    pub fn into_state(self) -> EmitterState {
        match self {
            Held::Steady => EmitterState::Playing,
            Held::FadingIn(ramp) => EmitterState::FadingIn(ramp),
            Held::FadingOut(ramp) => EmitterState::FadingOut(ramp),
        }
    }
}

/// Action deferred behind a pending delay.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DelayedAction {
    /// The literal output start call is deferred; the logical transition
    /// already happened at play time.
    Start {
        offset_secs: f32,
        fade_in: Option<Ramp>,
    },
    Stop {
        fade_out: Option<Ramp>,
    },
}

/// Tagged per-instance playback state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EmitterState {
    /// Unbound, or stopped and awaiting reap.
    Idle,
    /// Counting down to a deferred start or stop.
    Delayed {
        remaining: f32,
        action: DelayedAction,
    },
    FadingIn(Ramp),
    Playing,
    FadingOut(Ramp),
    Paused(Held),
    PauseFadingOut {
        ramp: Ramp,
        held: Held,
    },
    PauseFadingIn {
        ramp: Ramp,
        held: Held,
    },
}

impl EmitterState {
    /// Logically started and not paused. Includes delayed starts and sounds
    /// fading out: both are alive from the orchestrator's point of view.
    pub fn is_playing(&self) -> bool {
        matches!(
            self,
            EmitterState::Delayed { .. }
                | EmitterState::FadingIn(_)
                | EmitterState::Playing
                | EmitterState::FadingOut(_)
        )
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self,
            EmitterState::Paused(_)
                | EmitterState::PauseFadingOut { .. }
                | EmitterState::PauseFadingIn { .. }
        )
    }

    /// Committed to vanishing: a fade-out or a deferred stop is in flight.
    pub fn is_stopping(&self) -> bool {
        matches!(
            self,
            EmitterState::FadingOut(_)
                | EmitterState::Delayed {
                    action: DelayedAction::Stop { .. },
                    ..
                }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playing_family() {
        assert!(EmitterState::Playing.is_playing());
        assert!(EmitterState::FadingIn(Ramp::new(0.0, 1.0, 1.0)).is_playing());
        assert!(EmitterState::FadingOut(Ramp::new(1.0, 0.0, 1.0)).is_playing());
        assert!(!EmitterState::Idle.is_playing());
        assert!(!EmitterState::Paused(Held::Steady).is_playing());
    }

    #[test]
    fn test_paused_family() {
        let ramp = Ramp::new(1.0, 0.0, 1.0);
        assert!(EmitterState::Paused(Held::Steady).is_paused());
        assert!(EmitterState::PauseFadingOut {
            ramp,
            held: Held::Steady
        }
        .is_paused());
        assert!(!EmitterState::Playing.is_paused());
    }

    #[test]
    fn test_stopping_means_fade_out_or_deferred_stop() {
        assert!(EmitterState::FadingOut(Ramp::new(1.0, 0.0, 1.0)).is_stopping());
        assert!(EmitterState::Delayed {
            remaining: 0.5,
            action: DelayedAction::Stop { fade_out: None },
        }
        .is_stopping());
        assert!(!EmitterState::Delayed {
            remaining: 0.5,
            action: DelayedAction::Start {
                offset_secs: 0.0,
                fade_in: None
            },
        }
        .is_stopping());
        assert!(!EmitterState::Playing.is_stopping());
    }

    #[test]
    fn test_held_restores_play_axis() {
        let ramp = Ramp::new(0.2, 1.0, 1.0);
        assert_eq!(Held::Steady.into_state(), EmitterState::Playing);
        assert_eq!(
            Held::FadingIn(ramp).into_state(),
            EmitterState::FadingIn(ramp)
        );
    }
}
