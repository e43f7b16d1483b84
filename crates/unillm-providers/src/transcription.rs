//! Speech-to-text via OpenAI-compatible Whisper endpoints.
//!
//! Groq's endpoint is the default (fast, free tier available); anything that
//! serves `/audio/transcriptions` with `verbose_json` output works.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, error, warn};

use unillm_core::config::schema::TranscriptionConfig;

// ─────────────────────────────────────────────
// Trait
// ─────────────────────────────────────────────

/// Text recovered from an audio file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Transcript {
    pub text: String,
    /// Confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Trait for speech-to-text transcription providers.
#[async_trait]
pub trait TranscriptionProvider: Send + Sync {
    /// Transcribe an audio file.
    ///
    /// An unconfigured provider or a missing file yields an empty transcript.
    async fn transcribe(&self, file_path: &Path) -> anyhow::Result<Transcript>;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}

// ─────────────────────────────────────────────
// Whisper
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<Segment>,
}

#[derive(Debug, Deserialize)]
struct Segment {
    avg_logprob: Option<f64>,
}

/// Whisper transcription over multipart upload.
pub struct WhisperTranscriber {
    api_key: String,
    api_url: String,
    model: String,
    client: reqwest::Client,
}

impl WhisperTranscriber {
    /// Build from config. Falls back to `GROQ_API_KEY` when no key is configured.
    pub fn new(config: &TranscriptionConfig) -> Self {
        let api_key = if config.api_key.is_empty() {
            std::env::var("GROQ_API_KEY").unwrap_or_default()
        } else {
            config.api_key.clone()
        };

        Self {
            api_key,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            client: reqwest::Client::new(),
        }
    }

    /// Check if the transcriber is configured (has an API key).
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

#[async_trait]
impl TranscriptionProvider for WhisperTranscriber {
    async fn transcribe(&self, file_path: &Path) -> anyhow::Result<Transcript> {
        if !self.is_configured() {
            warn!("transcription: no API key configured, skipping");
            return Ok(Transcript::default());
        }

        if !file_path.exists() {
            warn!(path = %file_path.display(), "transcription: file not found");
            return Ok(Transcript::default());
        }

        let file_name = file_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        debug!(
            path = %file_path.display(),
            model = %self.model,
            "transcribing audio"
        );

        let file_bytes = tokio::fs::read(file_path).await?;

        let file_part = reqwest::multipart::Part::bytes(file_bytes)
            .file_name(file_name)
            .mime_str("application/octet-stream")?;

        let form = reqwest::multipart::Form::new()
            .part("file", file_part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(Duration::from_secs(60))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "transcription API error");
            return Err(anyhow::anyhow!(
                "transcription API returned {}: {}",
                status,
                body
            ));
        }

        let parsed: VerboseTranscription = response.json().await?;
        let transcript = Transcript {
            confidence: confidence(&parsed.segments),
            text: parsed.text.trim().to_string(),
        };

        debug!(
            chars = transcript.text.len(),
            confidence = transcript.confidence,
            "transcription complete"
        );

        Ok(transcript)
    }

    fn display_name(&self) -> &str {
        "Whisper"
    }
}

/// `exp(mean avg_logprob)` over segments that report one, clamped to `[0, 1]`.
/// 1.0 when no segment reports a log-probability.
fn confidence(segments: &[Segment]) -> f64 {
    let logprobs: Vec<f64> = segments.iter().filter_map(|s| s.avg_logprob).collect();
    if logprobs.is_empty() {
        return 1.0;
    }
    let mean = logprobs.iter().sum::<f64>() / logprobs.len() as f64;
    mean.exp().clamp(0.0, 1.0)
}

// ─────────────────────────────────────────────
// Helper
// ─────────────────────────────────────────────

/// Check if a file path looks like an audio file.
pub fn is_audio_file(path: &str) -> bool {
    const AUDIO_EXTENSIONS: &[&str] = &[
        ".ogg", ".oga", ".opus", ".mp3", ".m4a", ".wav", ".flac", ".aac", ".wma", ".webm",
    ];
    let lower = path.to_lowercase();
    AUDIO_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
