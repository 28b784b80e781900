use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use tracing::debug;

use crate::engines::TranscriptionEngine;
use crate::error::EngineError;
use crate::models::{TranscriptionResult, WhisperResponse};

/// Configuration for a Whisper-compatible transcription API
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Base URL, e.g. "https://api.openai.com" or a local deployment
    pub base_url: String,
    /// Bearer API key, empty for unauthenticated local deployments
    pub api_key: String,
    /// Model name, e.g. "whisper-1"
    pub model: String,
    /// Language hint forwarded to the engine (empty = autodetect)
    pub language: String,
    /// Request word-level timestamps
    pub word_timestamps: bool,
}

impl WhisperConfig {
    /// Create config from environment variables
    pub fn from_env(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: std::env::var("WHISPER_API_KEY").unwrap_or_default(),
            model: "whisper-1".to_string(),
            language: String::new(),
            word_timestamps: true,
        }
    }
}

/// Client for an OpenAI-compatible `/v1/audio/transcriptions` endpoint
pub struct WhisperApiClient {
    client: Client,
    config: WhisperConfig,
}

impl WhisperApiClient {
    pub fn new(config: WhisperConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    async fn request(&self, audio: &Path) -> Result<WhisperResponse, EngineError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let mut form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("model", self.config.model.clone())
            .text("response_format", "verbose_json");
        if self.config.word_timestamps {
            form = form.text("timestamp_granularities[]", "word");
        }
        if !self.config.language.is_empty() {
            form = form.text("language", self.config.language.clone());
        }

        let url = format!(
            "{}/v1/audio/transcriptions",
            self.config.base_url.trim_end_matches('/')
        );
        debug!("posting {:?} to {}", audio, url);

        let mut request = self.client.post(&url).multipart(form);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(&self.config.api_key);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        Ok(response.json::<WhisperResponse>().await?)
    }
}

#[async_trait]
impl TranscriptionEngine for WhisperApiClient {
    async fn transcribe(&self, audio: &Path) -> Result<TranscriptionResult, EngineError> {
        let response = self.request(audio).await?;
        Ok(response.into_transcription())
    }
}
