/// Playback orchestration service
///
/// Owns the emitter pool, the two active sets (music, effects), the clip
/// library and the category volume bus. All transitions are realized
/// cooperatively inside [`PlaybackOrchestrator::tick`], which the host calls
/// once per frame/step.
use std::collections::HashMap;
use std::time::Duration;

use crossbeam_channel::Receiver;

use crate::clip::{AudioCategory, AudioId, ClipLibrary};
use crate::config::EngineConfig;
use crate::emitter::{CompletionEvent, Emitter};
use crate::pool::{EmitterPool, OutputFactory};
use crate::volume::CategoryVolumeTable;

/// Opaque handle to an active emitter, returned from play calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EmitterId(u64);

impl std::fmt::Display for EmitterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "emitter#{}", self.0)
    }
}

/// Optional arguments for a play call.
#[derive(Debug, Clone)]
pub struct PlayParams {
    /// External gain factor (0.0-1.0), one factor of the volume product.
    pub volume_multiplier: f32,

    /// Defer the output start call; fades and delivery state still apply.
    pub delay: Duration,

    /// Offset into the clip at which playback starts.
    pub start_offset: Duration,

    /// Override the descriptor's loop flag for this instance.
    pub loop_override: Option<bool>,
}

impl Default for PlayParams {
    fn default() -> Self {
        Self {
            volume_multiplier: 1.0,
            delay: Duration::ZERO,
            start_offset: Duration::ZERO,
            loop_override: None,
        }
    }
}

impl PlayParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the external volume multiplier
    pub fn with_volume(mut self, multiplier: f32) -> Self {
        self.volume_multiplier = multiplier;
        self
    }

    /// Set a start delay
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Set a start offset into the clip
    pub fn with_start_offset(mut self, offset: Duration) -> Self {
        self.start_offset = offset;
        self
    }

    /// Override the clip's loop flag
    pub fn with_loop(mut self, looping: bool) -> Self {
        self.loop_override = Some(looping);
        self
    }
}

/// Playback orchestration service.
///
/// Single-threaded by design: every mutating call records intent, and the
/// audible effect is realized across subsequent [`PlaybackOrchestrator::tick`]
/// calls (immediately for non-faded calls).
pub struct PlaybackOrchestrator {
    clips: ClipLibrary,
    volumes: CategoryVolumeTable,
    pool: EmitterPool,
    music: HashMap<EmitterId, Emitter>,
    effects: HashMap<EmitterId, Emitter>,
    next_id: u64,
    music_fade: Duration,
    music_paused: bool,
}

impl PlaybackOrchestrator {
    pub fn new(
        config: &EngineConfig,
        clips: ClipLibrary,
        volumes: CategoryVolumeTable,
        factory: OutputFactory,
    ) -> Self {
        Self {
            clips,
            volumes,
            pool: EmitterPool::new(config.pool_capacity, factory),
            music: HashMap::new(),
            effects: HashMap::new(),
            next_id: 0,
            music_fade: config.music_fade(),
            music_paused: false,
        }
    }

    /// Set a category volume and push it to every active emitter of that
    /// category, music and effects alike.
    pub fn set_category_volume(&mut self, category: &AudioCategory, volume: f32) {
        self.volumes.set(category.clone(), volume);
        let volume = self.volumes.get(category);

        for emitter in self.music.values_mut().chain(self.effects.values_mut()) {
            if emitter.clip().map(|c| &c.category) == Some(category) {
                emitter.set_category_volume(volume);
            }
        }
        tracing::debug!("Category {} volume set to {}", category, volume);
    }

    /// Read a category volume; categories never set read as 1.0.
    pub fn category_volume(&self, category: &AudioCategory) -> f32 {
        self.volumes.get(category)
    }

    /// Play a one-shot or looping effect. Returns `None` (and changes
    /// nothing) when no clip is bound to the id. Never interrupts other
    /// effects.
    pub fn play_effect(&mut self, id: &AudioId, params: PlayParams) -> Option<EmitterId> {
        let clip = match self.clips.resolve(id) {
            Some(clip) => clip.clone(),
            None => {
                tracing::warn!("No clip bound for audio id {}", id);
                return None;
            }
        };

        let category_volume = self.volumes.get(&clip.category);
        let mut emitter = self.pool.acquire();
        emitter.assign_clip(clip, category_volume);
        emitter.play(
            params.volume_multiplier,
            Duration::ZERO,
            params.delay,
            params.start_offset,
            params.loop_override,
        );

        let handle = self.alloc_id();
        tracing::info!("Playing effect {} as {}", id, handle);
        self.effects.insert(handle, emitter);
        Some(handle)
    }

    /// Start a music track, crossfading out whatever music is currently
    /// active. Old and new tracks are deliberately alive at the same time
    /// for the duration of the fade.
    pub fn play_music(&mut self, id: &AudioId, params: PlayParams) -> Option<EmitterId> {
        let clip = match self.clips.resolve(id) {
            Some(clip) => clip.clone(),
            None => {
                tracing::warn!("No clip bound for audio id {}", id);
                return None;
            }
        };

        let fade = self.music_fade;
        for emitter in self.music.values_mut() {
            if !emitter.is_stopping() {
                emitter.stop(fade, params.delay);
            }
        }

        let category_volume = self.volumes.get(&clip.category);
        let mut emitter = self.pool.acquire();
        emitter.assign_clip(clip, category_volume);
        emitter.play(
            params.volume_multiplier,
            fade,
            params.delay,
            params.start_offset,
            params.loop_override,
        );

        // A fresh track is audibly playing; a stale latch would swallow the
        // next pause_music call.
        self.music_paused = false;

        let handle = self.alloc_id();
        tracing::info!("Playing music {} as {}", id, handle);
        self.music.insert(handle, emitter);
        Some(handle)
    }

    /// Fade out every active music track that is not already stopping.
    pub fn stop_music(&mut self, fade_out: Duration, delay: Duration) {
        for emitter in self.music.values_mut() {
            if !emitter.is_stopping() {
                emitter.stop(fade_out, delay);
            }
        }
    }

    /// Pause all music. Repeated calls are no-ops until unpaused.
    pub fn pause_music(&mut self, fade_out: Duration) {
        if self.music_paused {
            return;
        }
        for emitter in self.music.values_mut() {
            emitter.pause(fade_out);
        }
        self.music_paused = true;
        tracing::debug!("Music paused");
    }

    /// Resume all music. A no-op unless music is currently paused.
    pub fn unpause_music(&mut self, fade_in: Duration) {
        if !self.music_paused {
            return;
        }
        for emitter in self.music.values_mut() {
            emitter.unpause(fade_in);
        }
        self.music_paused = false;
        tracing::debug!("Music unpaused");
    }

    /// Stop every active effect bound to the given id.
    pub fn stop_effect(&mut self, id: &AudioId, fade_out: Duration) {
        for emitter in Self::effects_matching_id(&mut self.effects, id) {
            emitter.stop(fade_out, Duration::ZERO);
        }
    }

    /// Stop every active effect in the given category.
    pub fn stop_category(&mut self, category: &AudioCategory, fade_out: Duration) {
        for emitter in Self::effects_matching_category(&mut self.effects, category) {
            emitter.stop(fade_out, Duration::ZERO);
        }
    }

    /// Pause every active effect bound to the given id.
    pub fn pause_effect(&mut self, id: &AudioId, fade_out: Duration) {
        for emitter in Self::effects_matching_id(&mut self.effects, id) {
            emitter.pause(fade_out);
        }
    }

    /// Pause every active effect in the given category.
    pub fn pause_category(&mut self, category: &AudioCategory, fade_out: Duration) {
        for emitter in Self::effects_matching_category(&mut self.effects, category) {
            emitter.pause(fade_out);
        }
    }

    /// Unpause every active effect bound to the given id.
    pub fn unpause_effect(&mut self, id: &AudioId, fade_in: Duration) {
        for emitter in Self::effects_matching_id(&mut self.effects, id) {
            emitter.unpause(fade_in);
        }
    }

    /// Unpause every active effect in the given category.
    pub fn unpause_category(&mut self, category: &AudioCategory, fade_in: Duration) {
        for emitter in Self::effects_matching_category(&mut self.effects, category) {
            emitter.unpause(fade_in);
        }
    }

    /// True iff some active emitter matches the id, is playing, and is not
    /// on its way out.
    pub fn is_playing(&self, id: &AudioId) -> bool {
        self.music
            .values()
            .chain(self.effects.values())
            .any(|e| e.clip().map(|c| &c.id) == Some(id) && e.is_playing() && !e.is_stopping())
    }

    /// The active music emitter that is playing and not stopping, if any.
    pub fn current_music(&self) -> Option<EmitterId> {
        self.music
            .iter()
            .find(|(_, e)| e.is_playing() && !e.is_stopping())
            .map(|(id, _)| *id)
    }

    pub fn emitter(&self, handle: EmitterId) -> Option<&Emitter> {
        self.music.get(&handle).or_else(|| self.effects.get(&handle))
    }

    pub fn emitter_mut(&mut self, handle: EmitterId) -> Option<&mut Emitter> {
        match self.music.get_mut(&handle) {
            Some(emitter) => Some(emitter),
            None => self.effects.get_mut(&handle),
        }
    }

    /// Subscribe to the completion notification of an active emitter; fired
    /// once, at the tick the emitter is reaped.
    pub fn subscribe_completion(
        &mut self,
        handle: EmitterId,
    ) -> Option<Receiver<CompletionEvent>> {
        self.emitter_mut(handle).map(|e| e.subscribe_completion())
    }

    /// Number of active emitters across both sets.
    pub fn active_count(&self) -> usize {
        self.music.len() + self.effects.len()
    }

    /// Idle emitters currently cached by the pool.
    pub fn pooled_count(&self) -> usize {
        self.pool.idle_count()
    }

    /// Advance all fade/delay state and reap ended emitters.
    ///
    /// Emitters whose output resource became invalid outside the engine are
    /// discarded instead of recycled; their completion subscribers still
    /// fire.
    pub fn tick(&mut self, dt: Duration) {
        Self::tick_set(&mut self.music, &mut self.pool, dt);
        Self::tick_set(&mut self.effects, &mut self.pool, dt);
    }

    fn tick_set(set: &mut HashMap<EmitterId, Emitter>, pool: &mut EmitterPool, dt: Duration) {
        let mut finished: Vec<EmitterId> = Vec::new();
        for (handle, emitter) in set.iter_mut() {
            if !emitter.output_valid() || emitter.tick(dt) {
                finished.push(*handle);
            }
        }

        for handle in finished {
            let Some(mut emitter) = set.remove(&handle) else {
                continue;
            };
            emitter.notify_completion();
            if emitter.output_valid() {
                tracing::debug!("Reaping {}", handle);
                pool.release(emitter);
            } else {
                tracing::warn!("Discarding {} with invalid output resource", handle);
                emitter.cleanup();
            }
        }
    }

    fn alloc_id(&mut self) -> EmitterId {
        let id = EmitterId(self.next_id);
        self.next_id += 1;
        id
    }

    fn effects_matching_id<'a>(
        effects: &'a mut HashMap<EmitterId, Emitter>,
        id: &'a AudioId,
    ) -> impl Iterator<Item = &'a mut Emitter> {
        effects
            .values_mut()
            .filter(move |e| e.clip().map(|c| &c.id) == Some(id))
    }

    fn effects_matching_category<'a>(
        effects: &'a mut HashMap<EmitterId, Emitter>,
        category: &'a AudioCategory,
    ) -> impl Iterator<Item = &'a mut Emitter> {
        effects
            .values_mut()
            .filter(move |e| e.clip().map(|c| &c.category) == Some(category))
    }
}

impl std::fmt::Debug for PlaybackOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackOrchestrator")
            .field("music", &self.music.len())
            .field("effects", &self.effects.len())
            .field("pool", &self.pool)
            .field("music_paused", &self.music_paused)
            .finish()
    }
}
