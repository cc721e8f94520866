// Integration tests for soundstage
// These tests drive the full orchestration path with a scripted output
// backend: play/stop/pause transitions, crossfades, pooling and the
// per-tick volume math.

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use approx::assert_relative_eq;
use soundstage::{
    AudioCategory, AudioId, CategoryVolumeTable, ClipDescriptor, ClipLibrary, EngineConfig,
    Output, PlayParams, PlaybackOrchestrator,
};

#[derive(Debug, Default)]
struct OutputRecord {
    playing: bool,
    paused: bool,
    volume: f32,
    pitch: f32,
    looping: bool,
    content: String,
    valid: bool,
    play_calls: u32,
    stop_calls: u32,
    pause_calls: u32,
    resume_calls: u32,
    destroy_calls: u32,
}

/// Scripted stand-in for a host audio backend channel.
struct RecordingOutput {
    record: Rc<RefCell<OutputRecord>>,
}

impl Output for RecordingOutput {
    fn set_content(&mut self, content: &str) {
        self.record.borrow_mut().content = content.to_string();
    }

    fn play(&mut self, _start_offset: Duration) {
        let mut r = self.record.borrow_mut();
        r.play_calls += 1;
        r.playing = true;
        r.paused = false;
    }

    fn resume(&mut self) {
        let mut r = self.record.borrow_mut();
        r.resume_calls += 1;
        r.paused = false;
    }

    fn pause(&mut self) {
        let mut r = self.record.borrow_mut();
        r.pause_calls += 1;
        r.paused = true;
    }

    fn stop(&mut self) {
        let mut r = self.record.borrow_mut();
        r.stop_calls += 1;
        r.playing = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.record.borrow_mut().volume = volume;
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.record.borrow_mut().pitch = pitch;
    }

    fn set_loop(&mut self, looping: bool) {
        self.record.borrow_mut().looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.record.borrow().playing
    }

    fn destroy(&mut self) {
        self.record.borrow_mut().destroy_calls += 1;
    }

    fn is_valid(&self) -> bool {
        self.record.borrow().valid
    }
}

type Records = Rc<RefCell<Vec<Rc<RefCell<OutputRecord>>>>>;

fn test_library() -> ClipLibrary {
    [
        ClipDescriptor::new("theme-a", "music", "music/a.mp3").with_looping(true),
        ClipDescriptor::new("theme-b", "music", "music/b.mp3").with_looping(true),
        ClipDescriptor::new("explosion", "sfx", "sfx/explosion.wav").with_base_volume(0.8),
        ClipDescriptor::new("coin", "sfx", "sfx/coin.wav"),
    ]
    .into_iter()
    .collect()
}

/// Orchestrator over a recording backend; every created output channel's
/// record lands in the returned list, in creation order.
fn stage(music_fade_ms: u64, pool_capacity: usize) -> (PlaybackOrchestrator, Records) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();

    let records: Records = Rc::new(RefCell::new(Vec::new()));
    let factory_records = Rc::clone(&records);
    let config = EngineConfig {
        music_fade_ms,
        pool_capacity,
    };
    let orchestrator = PlaybackOrchestrator::new(
        &config,
        test_library(),
        CategoryVolumeTable::new(),
        Box::new(move || {
            let record = Rc::new(RefCell::new(OutputRecord {
                valid: true,
                ..OutputRecord::default()
            }));
            factory_records.borrow_mut().push(Rc::clone(&record));
            Box::new(RecordingOutput { record })
        }),
    );
    (orchestrator, records)
}

fn secs(s: f32) -> Duration {
    Duration::from_secs_f32(s)
}

#[test]
fn effect_with_base_volume_plays_at_full_fade() {
    // Scenario: snap play of a clip with base volume 0.8 in a full-volume
    // category lands at effective volume 0.8 immediately.
    let (mut stage, records) = stage(500, 4);

    let handle = stage
        .play_effect(&AudioId::from("explosion"), PlayParams::new())
        .unwrap();
    stage.tick(secs(0.1));

    assert!(stage.is_playing(&AudioId::from("explosion")));
    assert_relative_eq!(records.borrow()[0].borrow().volume, 0.8);
    assert_relative_eq!(stage.emitter(handle).unwrap().effective_volume(), 0.8);
}

#[test]
fn music_fade_in_advances_across_ticks() {
    // 2s fade-in reaches half volume after 1s, full after 2s, and the
    // emitter stays alive throughout.
    let (mut stage, _records) = stage(2000, 4);

    let handle = stage
        .play_music(&AudioId::from("theme-a"), PlayParams::new())
        .unwrap();

    stage.tick(secs(1.0));
    assert_relative_eq!(stage.emitter(handle).unwrap().play_fade(), 0.5);

    stage.tick(secs(1.0));
    assert_relative_eq!(stage.emitter(handle).unwrap().play_fade(), 1.0);
    assert!(stage.is_playing(&AudioId::from("theme-a")));
}

#[test]
fn stop_fade_holds_backend_until_the_fade_lands() {
    let (mut stage, records) = stage(500, 4);

    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    stage.stop_effect(&AudioId::from("coin"), secs(1.0));

    stage.tick(secs(0.4));
    {
        let r = records.borrow();
        let r0 = r[0].borrow();
        assert_relative_eq!(r0.volume, 0.6);
        assert_eq!(r0.stop_calls, 0);
    }

    stage.tick(secs(0.6));
    {
        let r = records.borrow();
        let r0 = r[0].borrow();
        assert_relative_eq!(r0.volume, 0.0);
        // One stop from the fade landing; cleanup's force-stop hits an
        // already-stopped channel.
        assert!(r0.stop_calls >= 1);
        assert!(!r0.playing);
    }
    assert!(!stage.is_playing(&AudioId::from("coin")));
}

#[test]
fn music_crossfade_keeps_both_tracks_alive_then_reaps_the_old() {
    let (mut stage, records) = stage(500, 4);

    let a = stage
        .play_music(&AudioId::from("theme-a"), PlayParams::new())
        .unwrap();
    stage.tick(secs(0.5));
    assert_eq!(stage.current_music(), Some(a));

    let b = stage
        .play_music(&AudioId::from("theme-b"), PlayParams::new())
        .unwrap();
    assert_ne!(a, b);

    // Overlap window: the outgoing track fades down while the incoming one
    // fades up.
    assert_eq!(stage.active_count(), 2);
    stage.tick(secs(0.25));
    {
        let r = records.borrow();
        assert!(r[0].borrow().volume < 1.0);
        assert!(r[1].borrow().volume > 0.0);
    }
    assert_eq!(stage.current_music(), Some(b));

    stage.tick(secs(0.25));
    assert_eq!(stage.active_count(), 1);
    assert_eq!(stage.current_music(), Some(b));
    assert!(stage.emitter(b).unwrap().is_playing());
    assert!(!records.borrow()[0].borrow().playing);
}

#[test]
fn category_volume_halves_active_emitter_without_interrupting() {
    let (mut stage, records) = stage(500, 4);

    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    stage.tick(secs(0.1));
    assert_relative_eq!(records.borrow()[0].borrow().volume, 1.0);

    stage.set_category_volume(&AudioCategory::from("sfx"), 0.5);
    stage.tick(secs(0.1));

    let r = records.borrow();
    let r0 = r[0].borrow();
    assert_relative_eq!(r0.volume, 0.5);
    assert_eq!(r0.stop_calls, 0);
    assert_eq!(r0.pause_calls, 0);
    assert!(r0.playing);
}

#[test]
fn effective_volume_is_the_product_of_all_factors() {
    let (mut stage, _records) = stage(500, 4);

    let handle = stage
        .play_effect(
            &AudioId::from("explosion"),
            PlayParams::new().with_volume(0.5),
        )
        .unwrap();
    stage.set_category_volume(&AudioCategory::from("sfx"), 0.5);

    // pause(1.0) * play(1.0) * category(0.5) * base(0.8) * multiplier(0.5)
    stage.tick(secs(0.1));
    assert_relative_eq!(
        stage.emitter(handle).unwrap().effective_volume(),
        0.2,
        epsilon = 1e-6
    );
}

#[test]
fn volume_stays_a_clamped_product_at_every_tick() {
    // The product invariant holds at every observable point of a fade-in
    // layered under a category change.
    let (mut stage, records) = stage(2000, 4);

    let handle = stage
        .play_music(&AudioId::from("theme-a"), PlayParams::new())
        .unwrap();
    stage.set_category_volume(&AudioCategory::from("music"), 0.7);

    for _ in 0..10 {
        stage.tick(secs(0.2));
        let emitter = stage.emitter(handle).unwrap();
        let expected = emitter.pause_fade().clamp(0.0, 1.0)
            * emitter.play_fade().clamp(0.0, 1.0)
            * 0.7;
        assert_relative_eq!(records.borrow()[0].borrow().volume, expected, epsilon = 1e-5);
        assert!((0.0..=1.0).contains(&records.borrow()[0].borrow().volume));
    }
}

#[test]
fn fade_out_volume_is_non_increasing() {
    let (mut stage, records) = stage(500, 4);

    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    stage.tick(secs(0.1));
    stage.stop_effect(&AudioId::from("coin"), secs(1.0));

    let mut previous = records.borrow()[0].borrow().volume;
    for _ in 0..10 {
        stage.tick(secs(0.1));
        let volume = records.borrow()[0].borrow().volume;
        assert!(volume <= previous);
        previous = volume;
    }
    assert_relative_eq!(previous, 0.0);
}

#[test]
fn pause_fades_then_commits_and_unpause_resumes() {
    let (mut stage, records) = stage(500, 4);

    stage.play_music(&AudioId::from("theme-a"), PlayParams::new());
    stage.tick(secs(0.5));

    stage.pause_music(secs(1.0));
    stage.tick(secs(0.5));
    // Mid pause-fade: backend still running.
    assert_eq!(records.borrow()[0].borrow().pause_calls, 0);

    stage.tick(secs(0.5));
    // Fade landed below the commit threshold: the real pause happened.
    assert_eq!(records.borrow()[0].borrow().pause_calls, 1);
    assert!(records.borrow()[0].borrow().paused);

    stage.unpause_music(secs(0.5));
    // Resume is immediate, the volume ramps back up.
    assert_eq!(records.borrow()[0].borrow().resume_calls, 1);
    stage.tick(secs(0.5));
    assert_relative_eq!(records.borrow()[0].borrow().volume, 1.0);
}

#[test]
fn repeated_pause_music_is_idempotent() {
    let (mut stage, records) = stage(500, 4);

    stage.play_music(&AudioId::from("theme-a"), PlayParams::new());
    stage.tick(secs(0.5));

    stage.pause_music(Duration::ZERO);
    stage.pause_music(Duration::ZERO);
    stage.tick(secs(0.1));

    assert_eq!(records.borrow()[0].borrow().pause_calls, 1);

    // And the paused track resumes on the first unpause.
    stage.unpause_music(Duration::ZERO);
    assert_eq!(records.borrow()[0].borrow().resume_calls, 1);
}

#[test]
fn unknown_clip_is_rejected_without_side_effects() {
    let (mut stage, records) = stage(500, 4);

    assert!(stage
        .play_effect(&AudioId::from("nope"), PlayParams::new())
        .is_none());
    assert!(stage
        .play_music(&AudioId::from("nope"), PlayParams::new())
        .is_none());

    assert_eq!(stage.active_count(), 0);
    assert!(records.borrow().is_empty());
}

#[test]
fn reaped_emitters_are_recycled_up_to_capacity() {
    let (mut stage, records) = stage(500, 1);

    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    assert_eq!(records.borrow().len(), 2);

    // Both clips run out; one emitter is cached, the surplus destroyed.
    for record in records.borrow().iter() {
        record.borrow_mut().playing = false;
    }
    stage.tick(secs(0.1));
    assert_eq!(stage.active_count(), 0);
    assert_eq!(stage.pooled_count(), 1);
    let destroyed: u32 = records
        .borrow()
        .iter()
        .map(|r| r.borrow().destroy_calls)
        .sum();
    assert_eq!(destroyed, 1);

    // The next play reuses the cached channel instead of creating one.
    stage.play_effect(&AudioId::from("coin"), PlayParams::new());
    assert_eq!(records.borrow().len(), 2);
}

#[test]
fn delayed_effect_starts_after_the_delay() {
    let (mut stage, records) = stage(500, 4);

    stage.play_effect(
        &AudioId::from("coin"),
        PlayParams::new().with_delay(secs(1.0)),
    );
    assert_eq!(records.borrow()[0].borrow().play_calls, 0);

    stage.tick(secs(0.5));
    assert_eq!(records.borrow()[0].borrow().play_calls, 0);

    stage.tick(secs(0.5));
    assert_eq!(records.borrow()[0].borrow().play_calls, 1);
    assert!(stage.is_playing(&AudioId::from("coin")));
}

#[test]
fn completion_event_arrives_when_the_clip_ends() {
    let (mut stage, records) = stage(500, 4);

    let handle = stage
        .play_effect(&AudioId::from("explosion"), PlayParams::new())
        .unwrap();
    let rx = stage.subscribe_completion(handle).unwrap();

    stage.tick(secs(0.1));
    assert!(rx.try_recv().is_err());

    records.borrow()[0].borrow_mut().playing = false;
    stage.tick(secs(0.1));

    let event = rx.try_recv().unwrap();
    assert_eq!(event.id, AudioId::from("explosion"));
    assert_eq!(event.category, AudioCategory::from("sfx"));
    assert!(stage.emitter(handle).is_none());
}

#[test]
fn externally_destroyed_output_is_discarded_but_still_notifies() {
    let (mut stage, records) = stage(500, 4);

    let handle = stage
        .play_effect(&AudioId::from("coin"), PlayParams::new())
        .unwrap();
    let rx = stage.subscribe_completion(handle).unwrap();

    records.borrow()[0].borrow_mut().valid = false;
    stage.tick(secs(0.1));

    assert_eq!(stage.active_count(), 0);
    assert_eq!(stage.pooled_count(), 0);
    assert_eq!(rx.try_recv().unwrap().id, AudioId::from("coin"));
}

#[test]
fn play_over_a_fading_stop_carries_the_audible_level() {
    let (mut stage, _records) = stage(1000, 4);

    let a = stage
        .play_music(&AudioId::from("theme-a"), PlayParams::new())
        .unwrap();
    stage.tick(secs(1.0));
    assert_relative_eq!(stage.emitter(a).unwrap().play_fade(), 1.0);

    stage.stop_music(secs(1.0), Duration::ZERO);
    stage.tick(secs(0.4));
    assert_relative_eq!(stage.emitter(a).unwrap().play_fade(), 0.6);

    // Starting the next track mid-fade: the old one keeps fading, the new
    // one rises from silence; no level jumps anywhere.
    let b = stage
        .play_music(&AudioId::from("theme-b"), PlayParams::new())
        .unwrap();
    stage.tick(secs(0.3));
    let old = stage.emitter(a).unwrap().play_fade();
    let new = stage.emitter(b).unwrap().play_fade();
    assert!(old < 0.6);
    assert!(new > 0.0 && new < 1.0);
}

#[test]
fn clip_parameters_reach_the_backend_at_assign_time() {
    let (mut stage, records) = stage(500, 4);

    stage.play_music(
        &AudioId::from("theme-a"),
        PlayParams::new().with_loop(false),
    );

    let r = records.borrow();
    let r0 = r[0].borrow();
    assert_eq!(r0.content, "music/a.mp3");
    assert_relative_eq!(r0.pitch, 1.0);
    // The per-call override beat the descriptor's loop default.
    assert!(!r0.looping);
}
