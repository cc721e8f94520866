/// Category volume bus
///
/// One scalar gain per category, applied to every emitter whose bound clip
/// belongs to that category. Absent entries read as full volume.
use std::collections::HashMap;

use crate::clip::AudioCategory;

/// Mapping from category to a gain in 0.0-1.0. Absent entries default to 1.0.
#[derive(Debug, Clone, Default)]
pub struct CategoryVolumeTable {
    volumes: HashMap<AudioCategory, f32>,
}

impl CategoryVolumeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the table from per-category default volumes.
    pub fn with_defaults<I>(defaults: I) -> Self
    where
        I: IntoIterator<Item = (AudioCategory, f32)>,
    {
        let mut table = Self::new();
        for (category, volume) in defaults {
            table.set(category, volume);
        }
        table
    }

    /// Set a category volume (clamped to 0.0-1.0)
    pub fn set(&mut self, category: AudioCategory, volume: f32) {
        self.volumes.insert(category, volume.clamp(0.0, 1.0));
    }

    /// Read a category volume; categories never set read as 1.0.
    pub fn get(&self, category: &AudioCategory) -> f32 {
        self.volumes.get(category).copied().unwrap_or(1.0)
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absent_category_is_full_volume() {
        let table = CategoryVolumeTable::new();
        assert_eq!(table.get(&AudioCategory::from("music")), 1.0);
    }

    #[test]
    fn test_set_and_get() {
        let mut table = CategoryVolumeTable::new();
        table.set(AudioCategory::from("sfx"), 0.5);

        assert_eq!(table.get(&AudioCategory::from("sfx")), 0.5);
        assert_eq!(table.get(&AudioCategory::from("music")), 1.0);
    }

    #[test]
    fn test_volume_clamping() {
        let mut table = CategoryVolumeTable::new();
        table.set(AudioCategory::from("sfx"), 1.5);
        assert_eq!(table.get(&AudioCategory::from("sfx")), 1.0);

        table.set(AudioCategory::from("sfx"), -0.25);
        assert_eq!(table.get(&AudioCategory::from("sfx")), 0.0);
    }

    #[test]
    fn test_seeded_defaults() {
        let table = CategoryVolumeTable::with_defaults([
            (AudioCategory::from("music"), 0.8),
            (AudioCategory::from("ambiance"), 0.6),
        ]);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(&AudioCategory::from("music")), 0.8);
        assert_eq!(table.get(&AudioCategory::from("ambiance")), 0.6);
    }
}
