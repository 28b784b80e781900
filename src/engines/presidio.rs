use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::engines::{AnonymizationEngine, DetectionEngine};
use crate::error::EngineError;
use crate::models::{char_slice, PiiEntity};

/// Configuration for a Presidio REST deployment (analyzer or anonymizer)
#[derive(Debug, Clone)]
pub struct PresidioConfig {
    /// Base URL, e.g. "http://localhost:5002"
    pub base_url: String,
}

impl PresidioConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Client for the Presidio analyzer's `/analyze` endpoint
pub struct PresidioAnalyzer {
    client: Client,
    config: PresidioConfig,
}

impl PresidioAnalyzer {
    pub fn new(config: PresidioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl DetectionEngine for PresidioAnalyzer {
    async fn detect(
        &self,
        text: &str,
        language: &str,
        entity_types: Option<&[String]>,
    ) -> Result<Vec<PiiEntity>, EngineError> {
        let request = AnalyzeRequest {
            text,
            language,
            entities: entity_types,
        };

        let url = self.config.endpoint("analyze");
        debug!("analyzing {} chars via {}", text.chars().count(), url);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let results: Vec<AnalyzeResult> = response.json().await?;
        Ok(results
            .into_iter()
            .map(|r| PiiEntity {
                entity_type: r.entity_type,
                start: r.start,
                end: r.end,
                score: r.score,
                text: char_slice(text, r.start, r.end),
            })
            .collect())
    }
}

/// Client for the Presidio anonymizer's `/anonymize` endpoint
pub struct PresidioAnonymizer {
    client: Client,
    config: PresidioConfig,
}

impl PresidioAnonymizer {
    pub fn new(config: PresidioConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl AnonymizationEngine for PresidioAnonymizer {
    async fn anonymize(&self, text: &str, entities: &[PiiEntity]) -> Result<String, EngineError> {
        let request = AnonymizeRequest {
            text,
            analyzer_results: entities
                .iter()
                .map(|e| AnalyzerResultRef {
                    entity_type: &e.entity_type,
                    start: e.start,
                    end: e.end,
                    score: e.score,
                })
                .collect(),
        };

        let url = self.config.endpoint("anonymize");
        debug!("anonymizing {} entities via {}", entities.len(), url);

        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Status { status, body });
        }

        let result: AnonymizeResponse = response.json().await?;
        Ok(result.text)
    }
}

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
    language: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<&'a [String]>,
}

#[derive(Debug, Deserialize)]
struct AnalyzeResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

#[derive(Debug, Serialize)]
struct AnonymizeRequest<'a> {
    text: &'a str,
    analyzer_results: Vec<AnalyzerResultRef<'a>>,
}

#[derive(Debug, Serialize)]
struct AnalyzerResultRef<'a> {
    entity_type: &'a str,
    start: usize,
    end: usize,
    score: f64,
}

#[derive(Debug, Deserialize)]
struct AnonymizeResponse {
    text: String,
}
