// src/provider/groq.rs
// Groq Whisper transcription client

use super::{
    classify_status, classify_transport, file_name_of, read_audio, stage, ProgressSink,
    ProviderError, SpeechProvider,
};
use crate::transcript::{Segment, Transcript};
use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::path::Path;

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-large-v3";
const PROVIDER_NAME: &str = "Groq";

/// Whisper `verbose_json` response shape. Segments are absent when the
/// model returns text only.
#[derive(Debug, Deserialize)]
struct GroqResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<GroqSegment>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct GroqSegment {
    start: f64,
    end: f64,
    text: String,
}

pub struct GroqProvider {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl GroqProvider {
    pub fn new(api_key: String, client: reqwest::Client, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        tracing::info!("Groq provider initialized (model {})", model);
        Self {
            api_key,
            client,
            model,
        }
    }

    fn to_transcript(&self, response: GroqResponse) -> Result<Transcript, ProviderError> {
        let duration = response
            .duration
            .or_else(|| response.segments.last().map(|s| s.end))
            .unwrap_or(0.0);

        let segments: Vec<Segment> = response
            .segments
            .into_iter()
            .filter(|s| !s.text.trim().is_empty())
            .map(|s| Segment::new(s.start, s.end, s.text.trim()))
            .collect();

        if !segments.is_empty() {
            return Ok(Transcript {
                segments,
                language: response.language,
                duration_secs: duration,
                provider: PROVIDER_NAME.to_string(),
            });
        }

        // Text-only response: one segment spanning the reported duration.
        let text = response.text.trim();
        if text.is_empty() {
            return Err(ProviderError::Unknown("empty transcript".to_string()));
        }
        Ok(Transcript::from_text(
            text,
            duration,
            response.language,
            PROVIDER_NAME,
        ))
    }
}

#[async_trait]
impl SpeechProvider for GroqProvider {
    async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
        on_progress: &ProgressSink,
    ) -> Result<Transcript, ProviderError> {
        on_progress(stage::PREPARING);
        let bytes = read_audio(path).await?;
        tracing::info!(
            "Groq: transcribing {} ({} bytes)",
            path.display(),
            bytes.len()
        );

        let file_part = multipart::Part::bytes(bytes).file_name(file_name_of(path));
        let mut form = multipart::Form::new()
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .part("file", file_part);
        if let Some(lang) = language.filter(|l| !l.is_empty()) {
            form = form.text("language", lang.to_string());
        }

        on_progress(stage::UPLOADING);
        let response = self
            .client
            .post(GROQ_API_URL)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(classify_transport)?;
        on_progress(stage::PROCESSING);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Groq: HTTP {} for {}", status, path.display());
            return Err(classify_status(status, &body));
        }

        let payload: GroqResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("malformed response: {}", e)))?;
        on_progress(stage::FORMATTING);

        let transcript = self.to_transcript(payload)?;
        tracing::info!(
            "Groq: {} segments for {}",
            transcript.segments.len(),
            path.display()
        );
        Ok(transcript)
    }

    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> GroqProvider {
        GroqProvider::new("gsk_test".to_string(), reqwest::Client::new(), None)
    }

    #[test]
    fn verbose_json_maps_to_segments() {
        let payload: GroqResponse = serde_json::from_str(
            r#"{
                "text": " hello world",
                "segments": [
                    {"start": 0.0, "end": 1.2, "text": " hello"},
                    {"start": 1.2, "end": 3.0, "text": " world"}
                ],
                "language": "en",
                "duration": 3.0
            }"#,
        )
        .unwrap();

        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "hello");
        assert_eq!(transcript.segments[1].end_secs, 3.0);
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert!(transcript.validate().is_ok());
    }

    #[test]
    fn text_only_response_becomes_single_segment() {
        let payload: GroqResponse =
            serde_json::from_str(r#"{"text": "just text", "duration": 4.5}"#).unwrap();
        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].start_secs, 0.0);
        assert_eq!(transcript.segments[0].end_secs, 4.5);
        assert_eq!(transcript.segments[0].text, "just text");
    }

    #[test]
    fn blank_segments_are_dropped() {
        let payload: GroqResponse = serde_json::from_str(
            r#"{
                "text": "kept",
                "segments": [
                    {"start": 0.0, "end": 1.0, "text": "  "},
                    {"start": 1.0, "end": 2.0, "text": "kept"}
                ]
            }"#,
        )
        .unwrap();
        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].text, "kept");
    }

    #[test]
    fn empty_response_is_an_error() {
        let payload: GroqResponse = serde_json::from_str(r#"{"text": "  "}"#).unwrap();
        assert!(matches!(
            provider().to_transcript(payload),
            Err(ProviderError::Unknown(_))
        ));
    }

    #[test]
    fn duration_falls_back_to_last_segment_end() {
        let payload: GroqResponse = serde_json::from_str(
            r#"{"segments": [{"start": 0.0, "end": 2.5, "text": "hi"}]}"#,
        )
        .unwrap();
        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.duration_secs, 2.5);
    }
}
