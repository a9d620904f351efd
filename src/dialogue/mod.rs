//! Battle dialogue: flavour lines from a remote text model

pub mod board;
pub mod gemini;

pub use board::DialogueBoard;
pub use gemini::GeminiClient;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Shown before any generated line arrives
pub const WELCOME_LINE: &str = "Welcome to Wobble Warriors!";
/// Used whenever the remote call fails
pub const FALLBACK_LINE: &str = "Oof! My jelly bones!";
/// Used when the remote call succeeds but returns no text
pub const EMPTY_LINE: &str = "...wobble...";

/// Moment in a battle that a line is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueEvent {
    Start,
    Hit,
    Win,
}

impl DialogueEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            DialogueEvent::Start => "start",
            DialogueEvent::Hit => "hit",
            DialogueEvent::Win => "win",
        }
    }
}

/// Generated backstory for a roster character
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterBio {
    pub bio: String,
    pub catchphrase: String,
}

impl CharacterBio {
    pub fn fallback() -> Self {
        Self {
            bio: "A mysterious blob from the Great Gelatin Sea.".to_string(),
            catchphrase: "Prepare to be wobbled!".to_string(),
        }
    }
}

/// Source of dialogue lines.
///
/// Implementations never fail: any error must be replaced by a fallback
/// before it reaches the caller.
pub trait DialogueGenerator: Send + Sync {
    fn generate<'a>(
        &'a self,
        fighter1: &'a str,
        fighter2: &'a str,
        event: DialogueEvent,
    ) -> BoxFuture<'a, String>;

    fn generate_bio<'a>(&'a self, name: &'a str, color: &'a str) -> BoxFuture<'a, CharacterBio>;
}

/// Dialogue service errors (never escape a [`DialogueGenerator`])
#[derive(Debug, thiserror::Error)]
pub enum DialogueError {
    #[error("No API key configured")]
    Disabled,

    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("Malformed model output: {0}")]
    Malformed(#[from] serde_json::Error),
}
