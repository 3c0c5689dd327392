use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::{SpeakerConfig, SpeechConfig};
use crate::error::{Error, Result};

/// Speech-to-text collaborator
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;
}

/// Text-to-speech collaborator
#[async_trait]
pub trait Speaker: Send + Sync {
    async fn speak(&self, text: &str) -> Result<()>;
}

pub fn transcriber_from_config(config: &SpeechConfig) -> Result<Box<dyn Transcriber>> {
    match &config.endpoint {
        Some(endpoint) => Ok(Box::new(HttpTranscriber::new(endpoint.clone(), config)?)),
        None => Ok(Box::new(DisabledTranscriber)),
    }
}

pub fn speaker_from_config(config: &SpeakerConfig) -> Box<dyn Speaker> {
    if config.enabled {
        Box::new(CommandSpeaker::new(config.command.clone(), config.args.clone()))
    } else {
        Box::new(SilentSpeaker)
    }
}

#[derive(Debug, Deserialize)]
struct RecognitionResponse {
    #[serde(default)]
    transcript: Option<String>,
}

/// Posts recorded audio to an HTTP recognition service.
///
/// The service receives the raw WAV bytes and answers with
/// `{"transcript": "..."}`.
pub struct HttpTranscriber {
    client: reqwest::Client,
    endpoint: String,
    language: String,
    api_key: Option<String>,
}

impl HttpTranscriber {
    pub fn new(endpoint: String, config: &SpeechConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Config(format!("failed to build speech client: {e}")))?;

        let api_key = config
            .api_key_env
            .as_deref()
            .and_then(|var| std::env::var(var).ok());

        Ok(HttpTranscriber {
            client,
            endpoint,
            language: config.language.clone(),
            api_key,
        })
    }
}

#[async_trait]
impl Transcriber for HttpTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio).await?;

        let mut request = self
            .client
            .post(&self.endpoint)
            .query(&[("lang", self.language.as_str())])
            .header(reqwest::header::CONTENT_TYPE, "audio/wav")
            .body(bytes);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::ServiceUnavailable(e.to_string()))?;

        // 400/422 mean the audio itself was rejected; any other failure
        // status is a problem with the service or our credentials.
        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNPROCESSABLE_ENTITY {
            tracing::debug!(%status, "recognition service rejected audio");
            return Err(Error::UnrecognizedSpeech);
        }
        if !status.is_success() {
            return Err(Error::ServiceUnavailable(format!(
                "recognition service returned {status}"
            )));
        }

        let body: RecognitionResponse = response
            .json()
            .await
            .map_err(|e| Error::ServiceUnavailable(format!("invalid recognition response: {e}")))?;

        match body.transcript {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(Error::UnrecognizedSpeech),
        }
    }
}

/// Used when no recognition endpoint is configured.
pub struct DisabledTranscriber;

#[async_trait]
impl Transcriber for DisabledTranscriber {
    async fn transcribe(&self, _audio: &Path) -> Result<String> {
        Err(Error::ServiceUnavailable(
            "speech recognition is not configured".to_string(),
        ))
    }
}

/// Renders speech by running a local synthesizer such as `espeak`.
///
/// The text is passed after `--` so it is never parsed as an option.
pub struct CommandSpeaker {
    program: String,
    args: Vec<String>,
}

impl CommandSpeaker {
    pub fn new(program: String, args: Vec<String>) -> Self {
        CommandSpeaker { program, args }
    }
}

#[async_trait]
impl Speaker for CommandSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        let status = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg("--")
            .arg(text)
            .status()
            .await
            .map_err(|e| Error::Synthesis(format!("failed to run {}: {e}", self.program)))?;

        if !status.success() {
            return Err(Error::Synthesis(format!(
                "{} exited with {status}",
                self.program
            )));
        }
        Ok(())
    }
}

/// Logs the text instead of rendering it.
pub struct SilentSpeaker;

#[async_trait]
impl Speaker for SilentSpeaker {
    async fn speak(&self, text: &str) -> Result<()> {
        tracing::info!(chars = text.len(), "speech output disabled, skipping");
        Ok(())
    }
}
