use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::align::{resolve_timestamps, OffsetMatcher, TolerantMatcher};
use crate::engines::{AnonymizationEngine, DetectionEngine, TranscriptionEngine};
use crate::error::{RedactionError, Stage};
use crate::models::{sanitize_entities, Finding, RedactionResult};
use crate::pipeline::filter::{filter_entities, validate_filter};

/// Parameters for one redaction request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactionConfig {
    /// Language code for PII detection
    pub language: String,
    /// Entity types to detect and keep; None keeps every type
    pub entities: Option<Vec<String>>,
    /// Minimum detection confidence, in [0, 1]
    pub score_threshold: f64,
    /// Resolve an audio time range for each finding
    pub return_timestamps: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            entities: None,
            score_threshold: 0.0,
            return_timestamps: false,
        }
    }
}

impl RedactionConfig {
    pub fn validate(&self) -> Result<(), RedactionError> {
        validate_filter(self.score_threshold, self.entities.as_deref())
    }
}

/// Cooperative cancellation flag, cheap to clone and share.
///
/// The orchestrator checks it before entering each stage; once signalled it
/// stops advancing. In-flight engine calls are not interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Sequences the external engines and the alignment layer into one
/// immutable [`RedactionResult`].
///
/// Engine handles are injected capabilities, shared read-only across
/// requests; every stage runs exactly once per request with no internal
/// retries. Engine failures are fatal with stage attribution; alignment
/// trouble only suppresses timestamps.
pub struct AudioRedactor {
    transcriber: Arc<dyn TranscriptionEngine>,
    detector: Arc<dyn DetectionEngine>,
    anonymizer: Arc<dyn AnonymizationEngine>,
    matcher: Box<dyn OffsetMatcher>,
    cancel: CancelToken,
}

impl AudioRedactor {
    pub fn new(
        transcriber: Arc<dyn TranscriptionEngine>,
        detector: Arc<dyn DetectionEngine>,
        anonymizer: Arc<dyn AnonymizationEngine>,
    ) -> Self {
        Self {
            transcriber,
            detector,
            anonymizer,
            matcher: Box::new(TolerantMatcher::default()),
            cancel: CancelToken::new(),
        }
    }

    /// Swap the alignment strategy
    pub fn with_matcher(mut self, matcher: Box<dyn OffsetMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Observe an externally owned cancellation token
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    fn ensure_active(&self, stage: Stage) -> Result<(), RedactionError> {
        if self.cancel.is_cancelled() {
            return Err(RedactionError::Cancelled { stage });
        }
        Ok(())
    }

    /// Run one full redaction request.
    pub async fn redact(
        &self,
        audio: &Path,
        config: &RedactionConfig,
    ) -> Result<RedactionResult, RedactionError> {
        let request_id = Uuid::new_v4();
        let span = info_span!("redact", request = %request_id);
        self.run(audio, config).instrument(span).await
    }

    async fn run(
        &self,
        audio: &Path,
        config: &RedactionConfig,
    ) -> Result<RedactionResult, RedactionError> {
        // Bad parameters are the caller's to fix; reject them before any
        // engine is invoked.
        config.validate()?;

        self.ensure_active(Stage::Transcribing)?;
        info!("transcribing {:?}", audio);
        let transcription = self
            .transcriber
            .transcribe(audio)
            .await
            .map_err(RedactionError::Transcription)?;
        info!(
            "transcribed {} chars, {} timed words",
            transcription.text.chars().count(),
            transcription.word_count()
        );

        self.ensure_active(Stage::Detecting)?;
        let detected = self
            .detector
            .detect(
                &transcription.text,
                &config.language,
                config.entities.as_deref(),
            )
            .await
            .map_err(RedactionError::Detection)?;
        let detected = sanitize_entities(detected, &transcription.text);
        info!("detected {} pii entities", detected.len());

        self.ensure_active(Stage::Filtering)?;
        let filtered = filter_entities(
            detected,
            config.score_threshold,
            config.entities.as_deref(),
        )?;
        info!("retained {} entities after filtering", filtered.len());

        self.ensure_active(Stage::Anonymizing)?;
        let redacted_text = self
            .anonymizer
            .anonymize(&transcription.text, &filtered)
            .await
            .map_err(RedactionError::Anonymization)?;

        let mut findings: Vec<Finding> = filtered.iter().map(Finding::from_entity).collect();

        if config.return_timestamps {
            self.ensure_active(Stage::Aligning)?;
            let index = self.matcher.align(&transcription.words, &transcription.text);
            if index.is_degraded() {
                warn!("offset index degraded; omitting audio timestamps for this request");
            } else {
                for (finding, entity) in findings.iter_mut().zip(filtered.iter()) {
                    if let Some((start, end)) =
                        resolve_timestamps(&index, &transcription.words, entity)
                    {
                        finding.audio_start = Some(start);
                        finding.audio_end = Some(end);
                    }
                }
            }
            info!(
                "aligned {}/{} findings to audio time",
                findings.iter().filter(|f| f.has_audio()).count(),
                findings.len()
            );
        }

        let language = if transcription.language.is_empty() {
            config.language.clone()
        } else {
            transcription.language.clone()
        };

        Ok(RedactionResult {
            original_text: transcription.text,
            redacted_text,
            pii_findings: findings,
            language,
        })
    }

    /// Redact and write the redacted text to `output`, defaulting to
    /// `<audio stem>_redacted.txt` next to the input. Returns the path
    /// written.
    pub async fn redact_and_save(
        &self,
        audio: &Path,
        config: &RedactionConfig,
        output: Option<&Path>,
    ) -> Result<PathBuf, RedactionError> {
        let result = self.redact(audio, config).await?;

        let path = match output {
            Some(path) => path.to_path_buf(),
            None => default_output_path(audio),
        };
        tokio::fs::write(&path, &result.redacted_text).await?;
        info!("saved redacted text to {:?}", path);
        Ok(path)
    }
}

/// `<stem>_redacted.txt` beside the audio file
fn default_output_path(audio: &Path) -> PathBuf {
    let stem = audio
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "audio".to_string());
    audio.with_file_name(format!("{stem}_redacted.txt"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::error::EngineError;
    use crate::models::{PiiEntity, TranscriptionResult, Word};

    struct MockTranscriber {
        result: TranscriptionResult,
    }

    #[async_trait]
    impl TranscriptionEngine for MockTranscriber {
        async fn transcribe(&self, _audio: &Path) -> Result<TranscriptionResult, EngineError> {
            Ok(self.result.clone())
        }
    }

    struct FailingTranscriber;

    #[async_trait]
    impl TranscriptionEngine for FailingTranscriber {
        async fn transcribe(&self, _audio: &Path) -> Result<TranscriptionResult, EngineError> {
            Err(EngineError::other("model unavailable"))
        }
    }

    struct MockDetector {
        entities: Vec<PiiEntity>,
    }

    #[async_trait]
    impl DetectionEngine for MockDetector {
        async fn detect(
            &self,
            _text: &str,
            _language: &str,
            _entity_types: Option<&[String]>,
        ) -> Result<Vec<PiiEntity>, EngineError> {
            Ok(self.entities.clone())
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl DetectionEngine for FailingDetector {
        async fn detect(
            &self,
            _text: &str,
            _language: &str,
            _entity_types: Option<&[String]>,
        ) -> Result<Vec<PiiEntity>, EngineError> {
            Err(EngineError::other("analyzer down"))
        }
    }

    /// Replaces each retained entity span with `<TYPE>`, rightmost first
    struct MockAnonymizer;

    #[async_trait]
    impl AnonymizationEngine for MockAnonymizer {
        async fn anonymize(
            &self,
            text: &str,
            entities: &[PiiEntity],
        ) -> Result<String, EngineError> {
            let mut chars: Vec<char> = text.chars().collect();
            let mut sorted: Vec<&PiiEntity> = entities.iter().collect();
            sorted.sort_by(|a, b| b.start.cmp(&a.start));
            for entity in sorted {
                let replacement: Vec<char> =
                    format!("<{}>", entity.entity_type).chars().collect();
                chars.splice(entity.start..entity.end, replacement);
            }
            Ok(chars.into_iter().collect())
        }
    }

    fn call_john_transcription() -> TranscriptionResult {
        TranscriptionResult {
            text: "Call John Smith at 555-1234".to_string(),
            words: vec![
                Word::new("Call", 0.0, 0.4),
                Word::new("John", 0.4, 0.7),
                Word::new("Smith", 0.7, 1.0),
                Word::new("at", 1.0, 1.1),
                Word::new("555-1234", 1.1, 1.8),
            ],
            language: "en".to_string(),
        }
    }

    fn call_john_entities() -> Vec<PiiEntity> {
        vec![
            PiiEntity::new("PERSON", 5, 15, 0.9),
            PiiEntity::new("PHONE_NUMBER", 19, 27, 0.85),
        ]
    }

    fn redactor(transcription: TranscriptionResult, entities: Vec<PiiEntity>) -> AudioRedactor {
        AudioRedactor::new(
            Arc::new(MockTranscriber {
                result: transcription,
            }),
            Arc::new(MockDetector { entities }),
            Arc::new(MockAnonymizer),
        )
    }

    #[tokio::test]
    async fn test_end_to_end_with_timestamps() {
        let redactor = redactor(call_john_transcription(), call_john_entities());
        let config = RedactionConfig {
            score_threshold: 0.5,
            return_timestamps: true,
            ..Default::default()
        };

        let result = redactor.redact(Path::new("call.wav"), &config).await.unwrap();

        assert_eq!(result.original_text, "Call John Smith at 555-1234");
        assert_eq!(result.redacted_text, "Call <PERSON> at <PHONE_NUMBER>");
        assert_eq!(result.language, "en");
        assert_eq!(result.pii_findings.len(), 2);

        let person = &result.pii_findings[0];
        assert_eq!(person.entity_type, "PERSON");
        assert_eq!(person.text, "John Smith");
        assert_eq!(person.audio_start, Some(0.4));
        assert_eq!(person.audio_end, Some(1.0));

        let phone = &result.pii_findings[1];
        assert_eq!(phone.entity_type, "PHONE_NUMBER");
        assert_eq!(phone.audio_start, Some(1.1));
        assert_eq!(phone.audio_end, Some(1.8));
    }

    #[tokio::test]
    async fn test_no_timestamps_unless_requested() {
        let redactor = redactor(call_john_transcription(), call_john_entities());

        let result = redactor
            .redact(Path::new("call.wav"), &RedactionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.pii_findings.len(), 2);
        assert!(result.pii_findings.iter().all(|f| !f.has_audio()));
    }

    #[tokio::test]
    async fn test_no_pii_leaves_text_untouched() {
        let redactor = redactor(call_john_transcription(), vec![]);

        let result = redactor
            .redact(Path::new("call.wav"), &RedactionConfig::default())
            .await
            .unwrap();

        assert_eq!(result.redacted_text, result.original_text);
        assert!(result.pii_findings.is_empty());
    }

    #[tokio::test]
    async fn test_idempotent_across_runs() {
        let redactor = redactor(call_john_transcription(), call_john_entities());
        let config = RedactionConfig {
            return_timestamps: true,
            ..Default::default()
        };

        let first = redactor.redact(Path::new("call.wav"), &config).await.unwrap();
        let second = redactor.redact(Path::new("call.wav"), &config).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_degraded_index_suppresses_all_timestamps() {
        // Timed words bear no resemblance to the transcript text the
        // detector saw, so the index degrades.
        let transcription = TranscriptionResult {
            text: "Call John Smith at 555-1234".to_string(),
            words: vec![
                Word::new("zebra", 0.0, 0.3),
                Word::new("quartz", 0.3, 0.6),
                Word::new("xylophone", 0.6, 0.9),
            ],
            language: "en".to_string(),
        };
        let redactor = redactor(transcription, call_john_entities());
        let config = RedactionConfig {
            return_timestamps: true,
            ..Default::default()
        };

        let result = redactor.redact(Path::new("call.wav"), &config).await.unwrap();

        // Redaction itself is unaffected
        assert_eq!(result.redacted_text, "Call <PERSON> at <PHONE_NUMBER>");
        assert_eq!(result.pii_findings.len(), 2);
        assert!(result.pii_findings.iter().all(|f| !f.has_audio()));
    }

    #[tokio::test]
    async fn test_filter_applies_threshold_and_types() {
        let redactor = redactor(call_john_transcription(), call_john_entities());
        let config = RedactionConfig {
            entities: Some(vec!["PHONE_NUMBER".to_string()]),
            score_threshold: 0.5,
            ..Default::default()
        };

        let result = redactor.redact(Path::new("call.wav"), &config).await.unwrap();

        assert_eq!(result.pii_findings.len(), 1);
        assert_eq!(result.pii_findings[0].entity_type, "PHONE_NUMBER");
        assert_eq!(result.redacted_text, "Call John Smith at <PHONE_NUMBER>");
    }

    #[tokio::test]
    async fn test_engine_failure_carries_stage() {
        let redactor = AudioRedactor::new(
            Arc::new(MockTranscriber {
                result: call_john_transcription(),
            }),
            Arc::new(FailingDetector),
            Arc::new(MockAnonymizer),
        );

        let err = redactor
            .redact(Path::new("call.wav"), &RedactionConfig::default())
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Detecting));
    }

    #[tokio::test]
    async fn test_invalid_config_rejected_before_transcription() {
        // The transcriber would fail, but validation never lets it run
        let redactor = AudioRedactor::new(
            Arc::new(FailingTranscriber),
            Arc::new(FailingDetector),
            Arc::new(MockAnonymizer),
        );
        let config = RedactionConfig {
            score_threshold: 2.0,
            ..Default::default()
        };

        let err = redactor
            .redact(Path::new("call.wav"), &config)
            .await
            .unwrap_err();

        assert!(matches!(err, RedactionError::InvalidConfig(_)));
    }

    #[tokio::test]
    async fn test_cancelled_before_first_stage() {
        let cancel = CancelToken::new();
        let redactor = redactor(call_john_transcription(), call_john_entities())
            .with_cancel_token(cancel.clone());
        cancel.cancel();

        let err = redactor
            .redact(Path::new("call.wav"), &RedactionConfig::default())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            RedactionError::Cancelled {
                stage: Stage::Transcribing
            }
        ));
    }

    #[tokio::test]
    async fn test_redact_and_save_default_path() {
        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("meeting.wav");
        let redactor = redactor(call_john_transcription(), call_john_entities());

        let path = redactor
            .redact_and_save(&audio, &RedactionConfig::default(), None)
            .await
            .unwrap();

        assert_eq!(path, dir.path().join("meeting_redacted.txt"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Call <PERSON> at <PHONE_NUMBER>");
    }
}
