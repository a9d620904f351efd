//! Gemini `generateContent` client

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, warn};

use crate::config::Config;

use super::{
    CharacterBio, DialogueError, DialogueEvent, DialogueGenerator, EMPTY_LINE, FALLBACK_LINE,
};

/// Dialogue generator backed by the Gemini REST API
#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: serde_json::Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate
    fn text(self) -> String {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

impl GeminiClient {
    pub fn new(config: &Config) -> Self {
        Self::with_endpoint(
            &config.dialogue_api_url,
            &config.dialogue_model,
            config.gemini_api_key.clone(),
            config.dialogue_timeout,
        )
    }

    pub fn with_endpoint(
        base_url: &str,
        model: &str,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.filter(|k| !k.is_empty()),
        }
    }

    fn generate_url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Send one prompt and return the raw model text
    async fn request_text(
        &self,
        prompt: String,
        generation_config: serde_json::Value,
    ) -> Result<String, DialogueError> {
        let api_key = self.api_key.as_deref().ok_or(DialogueError::Disabled)?;

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(prompt) }],
            }],
            generation_config,
        };

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(DialogueError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response.json().await?;
        Ok(parsed.text())
    }

    async fn battle_line(&self, fighter1: &str, fighter2: &str, event: DialogueEvent) -> String {
        let prompt = format!(
            "{fighter1} and {fighter2} are two floppy, jelly-bean shaped brawlers in a silly \
             physics fight. Write one short, funny line of dialogue for the '{}' moment of \
             the fight. Keep it to a single sentence.",
            event.as_str()
        );
        let config = json!({ "maxOutputTokens": 50, "temperature": 0.9 });

        match self.request_text(prompt, config).await {
            Ok(text) => line_or_placeholder(&text),
            Err(DialogueError::Disabled) => {
                debug!(event = event.as_str(), "Dialogue disabled, using fallback line");
                FALLBACK_LINE.to_string()
            }
            Err(e) => {
                warn!(event = event.as_str(), error = %e, "Dialogue request failed");
                FALLBACK_LINE.to_string()
            }
        }
    }

    async fn bio(&self, name: &str, color: &str) -> CharacterBio {
        let prompt = format!(
            "Write a two sentence backstory for {name}, a very wobbly jelly-bean fighter \
             coloured {color}, and give them an absurd catchphrase."
        );
        let config = json!({
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": {
                    "bio": { "type": "STRING" },
                    "catchphrase": { "type": "STRING" }
                },
                "required": ["bio", "catchphrase"]
            }
        });

        let result = match self.request_text(prompt, config).await {
            Ok(text) => serde_json::from_str::<CharacterBio>(&text).map_err(DialogueError::from),
            Err(e) => Err(e),
        };

        result.unwrap_or_else(|e| {
            debug!(character = name, error = %e, "Bio generation failed, using fallback");
            CharacterBio::fallback()
        })
    }
}

/// Trimmed model text, or the placeholder when the model said nothing
fn line_or_placeholder(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        EMPTY_LINE.to_string()
    } else {
        trimmed.to_string()
    }
}

impl DialogueGenerator for GeminiClient {
    fn generate<'a>(
        &'a self,
        fighter1: &'a str,
        fighter2: &'a str,
        event: DialogueEvent,
    ) -> BoxFuture<'a, String> {
        Box::pin(self.battle_line(fighter1, fighter2, event))
    }

    fn generate_bio<'a>(&'a self, name: &'a str, color: &'a str) -> BoxFuture<'a, CharacterBio> {
        Box::pin(self.bio(name, color))
    }
}
