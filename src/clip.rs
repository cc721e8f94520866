/// Clip identity and static mixing parameters
///
/// A `ClipDescriptor` binds an opaque content handle to the mixing defaults
/// the emitter applies when the clip is assigned. Descriptors are resolved
/// once per play call and never mutated afterwards.
use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, comparable key identifying a playable clip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioId(String);

impl AudioId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AudioId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Opaque, comparable key identifying a volume-bus category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioCategory(String);

impl AudioCategory {
    pub fn new(category: impl Into<String>) -> Self {
        Self(category.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AudioCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for AudioCategory {
    fn from(category: &str) -> Self {
        Self::new(category)
    }
}

fn default_pitch() -> f32 {
    1.0
}

fn default_base_volume() -> f32 {
    1.0
}

/// Static content + mixing parameters bound to an [`AudioId`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub id: AudioId,

    /// Category whose bus volume applies to every instance of this clip.
    pub category: AudioCategory,

    /// Opaque content handle the output backend understands (asset key, path).
    pub content: String,

    /// Loop by default; a play call may override per instance.
    #[serde(default)]
    pub looping: bool,

    /// Higher = more important (host-defined scale).
    #[serde(default)]
    pub priority: u8,

    /// Base gain (0.0-1.0), one factor of the effective volume product.
    #[serde(default = "default_base_volume")]
    pub base_volume: f32,

    #[serde(default = "default_pitch")]
    pub pitch: f32,

    /// Stereo pan (-1.0 left to 1.0 right); consumed by the host facade.
    #[serde(default)]
    pub pan: f32,

    /// 2D/3D blend (0.0 flat to 1.0 spatialized); consumed by the host facade.
    #[serde(default)]
    pub spatial_blend: f32,
}

impl ClipDescriptor {
    pub fn new(
        id: impl Into<AudioId>,
        category: impl Into<AudioCategory>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            content: content.into(),
            looping: false,
            priority: 0,
            base_volume: 1.0,
            pitch: 1.0,
            pan: 0.0,
            spatial_blend: 0.0,
        }
    }

    /// Set base volume (clamped to 0.0-1.0)
    pub fn with_base_volume(mut self, volume: f32) -> Self {
        self.base_volume = volume.clamp(0.0, 1.0);
        self
    }

    /// Set default looping
    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Set pitch
    pub fn with_pitch(mut self, pitch: f32) -> Self {
        self.pitch = pitch;
        self
    }
}

/// Lookup table mapping [`AudioId`] to its [`ClipDescriptor`].
///
/// Seeded from host asset configuration; the orchestrator resolves every
/// play call through it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClipLibrary {
    clips: HashMap<AudioId, ClipDescriptor>,
}

impl ClipLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its own id, replacing any previous binding.
    pub fn insert(&mut self, descriptor: ClipDescriptor) {
        self.clips.insert(descriptor.id.clone(), descriptor);
    }

    pub fn resolve(&self, id: &AudioId) -> Option<&ClipDescriptor> {
        self.clips.get(id)
    }

    pub fn contains(&self, id: &AudioId) -> bool {
        self.clips.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

impl FromIterator<ClipDescriptor> for ClipLibrary {
    fn from_iter<I: IntoIterator<Item = ClipDescriptor>>(iter: I) -> Self {
        let mut library = Self::new();
        for descriptor in iter {
            library.insert(descriptor);
        }
        library
    }
}
