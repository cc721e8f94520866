/// rodio-backed output channel
///
/// Holds one shared output stream and a bank of preloaded, decoded-on-play
/// clip data. Each pooled emitter gets its own [`RodioOutput`] with a lazily
/// created sink.
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::RwLock;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};

use crate::error::{AppResult, AudioError};
use crate::output::Output;
use crate::pool::OutputFactory;

type ContentBank = Arc<RwLock<HashMap<String, Arc<Vec<u8>>>>>;

/// Owns the audio device stream and the clip data bank; hands out
/// [`RodioOutput`] channels via [`RodioBackend::output_factory`].
pub struct RodioBackend {
    _stream: OutputStream,
    handle: OutputStreamHandle,
    bank: ContentBank,
}

impl RodioBackend {
    /// Open the default audio device.
    pub fn new() -> AppResult<Self> {
        let (stream, handle) = OutputStream::try_default()
            .map_err(|e| AudioError::StreamInitFailed(Box::new(e)))?;

        Ok(Self {
            _stream: stream,
            handle,
            bank: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Read a clip file into memory and register it under a content handle.
    pub fn load_content(&self, content: impl Into<String>, path: &Path) -> AppResult<()> {
        let content = content.into();
        let data = std::fs::read(path).map_err(|e| AudioError::LoadFailed {
            path: path.display().to_string(),
            source: Box::new(e),
        })?;

        // Verify the data decodes before it can reach a live sink.
        Decoder::new(Cursor::new(data.clone()))
            .map_err(|e| AudioError::DecodeFailed(Box::new(e)))
            .with_context(|| format!("while loading {}", path.display()))?;

        tracing::info!(
            "Loaded clip data for {}: {} ({} bytes)",
            content,
            path.display(),
            data.len()
        );
        self.register_content(content, data);
        Ok(())
    }

    /// Register already-loaded clip data under a content handle.
    pub fn register_content(&self, content: impl Into<String>, data: Vec<u8>) {
        self.bank.write().insert(content.into(), Arc::new(data));
    }

    /// Factory for the emitter pool: one output channel per call, all backed
    /// by this stream and bank.
    pub fn output_factory(&self) -> OutputFactory {
        let handle = self.handle.clone();
        let bank = Arc::clone(&self.bank);
        Box::new(move || {
            Box::new(RodioOutput {
                handle: handle.clone(),
                bank: Arc::clone(&bank),
                sink: None,
                data: None,
                volume: 1.0,
                speed: 1.0,
                looping: false,
                destroyed: false,
            })
        })
    }
}

/// One playback channel: a lazily created sink over the shared stream.
pub struct RodioOutput {
    handle: OutputStreamHandle,
    bank: ContentBank,
    sink: Option<Sink>,
    data: Option<Arc<Vec<u8>>>,
    volume: f32,
    speed: f32,
    looping: bool,
    destroyed: bool,
}

impl RodioOutput {
    fn ensure_sink(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        if self.sink.is_none() {
            match Sink::try_new(&self.handle) {
                Ok(sink) => {
                    sink.set_volume(self.volume);
                    sink.set_speed(self.speed);
                    self.sink = Some(sink);
                }
                Err(e) => {
                    tracing::warn!("Failed to create playback sink: {}", e);
                    return false;
                }
            }
        }
        true
    }
}

impl Output for RodioOutput {
    fn set_content(&mut self, content: &str) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
        self.data = self.bank.read().get(content).cloned();
        if self.data.is_none() {
            tracing::warn!("{}", AudioError::UnknownContent(content.to_string()));
        }
    }

    fn play(&mut self, start_offset: Duration) {
        if !self.ensure_sink() {
            return;
        }
        let Some(data) = &self.data else {
            return;
        };

        let cursor = Cursor::new((**data).clone());
        let decoder = match Decoder::new(cursor) {
            Ok(decoder) => decoder,
            Err(e) => {
                tracing::warn!("{}", AudioError::DecodeFailed(Box::new(e)));
                return;
            }
        };

        // Each transformation returns a different type, so the chain is
        // built with dynamic dispatch.
        let source: Box<dyn Source<Item = i16> + Send> = {
            let mut boxed: Box<dyn Source<Item = i16> + Send> = Box::new(decoder);
            if start_offset > Duration::ZERO {
                boxed = Box::new(boxed.skip_duration(start_offset));
            }
            if self.looping {
                boxed = Box::new(boxed.repeat_infinite());
            }
            boxed
        };

        let Some(sink) = self.sink.as_ref() else {
            return;
        };
        sink.stop();
        sink.append(source);
        sink.set_volume(self.volume);
        sink.set_speed(self.speed);
        sink.play();
    }

    fn resume(&mut self) {
        if let Some(sink) = &self.sink {
            sink.play();
        }
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn stop(&mut self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn set_pitch(&mut self, pitch: f32) {
        // rodio exposes pitch as playback speed.
        self.speed = pitch.max(0.01);
        if let Some(sink) = &self.sink {
            sink.set_speed(self.speed);
        }
    }

    fn set_loop(&mut self, looping: bool) {
        self.looping = looping;
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().map(|s| !s.empty()).unwrap_or(false)
    }

    fn disable(&mut self) {
        if let Some(sink) = &self.sink {
            sink.stop();
        }
    }

    fn destroy(&mut self) {
        self.sink = None;
        self.data = None;
        self.destroyed = true;
    }

    fn is_valid(&self) -> bool {
        !self.destroyed
    }
}

// Note: sink-level behavior needs real audio hardware; the adapter is
// covered indirectly by hosts and by the trait-level mocks elsewhere.
