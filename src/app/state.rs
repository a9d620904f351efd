//! Application state shared across routes

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Config;
use crate::dialogue::{CharacterBio, DialogueGenerator, GeminiClient};
use crate::game::{MatchRegistry, MatchSettings};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dialogue: Arc<dyn DialogueGenerator>,
    pub match_registry: Arc<MatchRegistry>,
    /// Generated bios keyed by roster index
    pub bio_cache: Arc<Mutex<HashMap<usize, CharacterBio>>>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let dialogue: Arc<dyn DialogueGenerator> = Arc::new(GeminiClient::new(&config));
        Self::with_dialogue(config, dialogue)
    }

    pub fn with_dialogue(config: Config, dialogue: Arc<dyn DialogueGenerator>) -> Self {
        Self {
            config: Arc::new(config),
            dialogue,
            match_registry: Arc::new(MatchRegistry::new()),
            bio_cache: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Per-session tunables derived from the configuration
    pub fn match_settings(&self) -> MatchSettings {
        MatchSettings {
            frame_rate: self.config.frame_rate,
            snapshot_every: self.config.snapshot_every,
            hit_dialogue_interval: self.config.hit_dialogue_interval,
        }
    }

    /// Cached bio for a roster index
    pub fn cached_bio(&self, index: usize) -> Option<CharacterBio> {
        self.bio_cache.lock().get(&index).cloned()
    }

    pub fn cache_bio(&self, index: usize, bio: CharacterBio) {
        self.bio_cache.lock().insert(index, bio);
    }
}
