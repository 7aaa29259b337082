// src/provider/deepgram.rs
// Deepgram pre-recorded transcription client

use super::{
    classify_status, classify_transport, read_audio, stage, ProgressSink, ProviderError,
    SpeechProvider,
};
use crate::transcript::{Segment, Transcript};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;

const DEEPGRAM_API_URL: &str = "https://api.deepgram.com/v1/listen";
const DEFAULT_MODEL: &str = "nova-2";
const PROVIDER_NAME: &str = "Deepgram";

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    #[serde(default)]
    metadata: Option<DeepgramMetadata>,
    #[serde(default)]
    results: Option<DeepgramResults>,
}

#[derive(Debug, Deserialize)]
struct DeepgramMetadata {
    #[serde(default)]
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct DeepgramResults {
    #[serde(default)]
    utterances: Vec<DeepgramUtterance>,
    #[serde(default)]
    channels: Vec<DeepgramChannel>,
}

#[derive(Debug, Deserialize)]
struct DeepgramUtterance {
    start: f64,
    end: f64,
    #[serde(default)]
    transcript: String,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    #[serde(default)]
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    #[serde(default)]
    transcript: String,
    #[serde(default)]
    detected_language: Option<String>,
}

pub struct DeepgramProvider {
    api_key: String,
    client: reqwest::Client,
    model: String,
}

impl DeepgramProvider {
    pub fn new(api_key: String, client: reqwest::Client, model: Option<String>) -> Self {
        let model = model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        tracing::info!("Deepgram provider initialized (model {})", model);
        Self {
            api_key,
            client,
            model,
        }
    }

    fn to_transcript(&self, response: DeepgramResponse) -> Result<Transcript, ProviderError> {
        let duration = response
            .metadata
            .as_ref()
            .and_then(|m| m.duration)
            .unwrap_or(0.0);
        let results = response
            .results
            .ok_or_else(|| ProviderError::Unknown("response carries no results".to_string()))?;

        let language = results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .and_then(|a| a.detected_language.clone());

        let segments: Vec<Segment> = results
            .utterances
            .iter()
            .filter(|u| !u.transcript.trim().is_empty())
            .map(|u| Segment::new(u.start, u.end, u.transcript.trim()))
            .collect();

        if !segments.is_empty() {
            return Ok(Transcript {
                segments,
                language,
                duration_secs: duration,
                provider: PROVIDER_NAME.to_string(),
            });
        }

        // No utterance timing: fall back to the first channel transcript.
        let text = results
            .channels
            .first()
            .and_then(|c| c.alternatives.first())
            .map(|a| a.transcript.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ProviderError::Unknown("empty transcript".to_string()));
        }
        Ok(Transcript::from_text(text, duration, language, PROVIDER_NAME))
    }
}

#[async_trait]
impl SpeechProvider for DeepgramProvider {
    async fn transcribe(
        &self,
        path: &Path,
        language: Option<&str>,
        on_progress: &ProgressSink,
    ) -> Result<Transcript, ProviderError> {
        on_progress(stage::PREPARING);
        let bytes = read_audio(path).await?;
        tracing::info!(
            "Deepgram: transcribing {} ({} bytes)",
            path.display(),
            bytes.len()
        );

        let mut query: Vec<(&str, String)> = vec![
            ("model", self.model.clone()),
            ("smart_format", "true".to_string()),
            ("punctuate", "true".to_string()),
            ("utterances", "true".to_string()),
        ];
        match language.filter(|l| !l.is_empty()) {
            Some(lang) => query.push(("language", lang.to_string())),
            None => query.push(("detect_language", "true".to_string())),
        }

        on_progress(stage::UPLOADING);
        let response = self
            .client
            .post(DEEPGRAM_API_URL)
            .query(&query)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(classify_transport)?;
        on_progress(stage::PROCESSING);

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("Deepgram: HTTP {} for {}", status, path.display());
            return Err(classify_status(status, &body));
        }

        let payload: DeepgramResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Unknown(format!("malformed response: {}", e)))?;
        on_progress(stage::FORMATTING);

        let transcript = self.to_transcript(payload)?;
        tracing::info!(
            "Deepgram: {} segments for {}",
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

    fn provider() -> DeepgramProvider {
        DeepgramProvider::new("dg_test".to_string(), reqwest::Client::new(), None)
    }

    #[test]
    fn utterances_map_to_segments() {
        let payload: DeepgramResponse = serde_json::from_str(
            r#"{
                "metadata": {"duration": 4.0},
                "results": {
                    "utterances": [
                        {"start": 0.0, "end": 2.5, "transcript": " hi there "},
                        {"start": 2.5, "end": 4.0, "transcript": "bye"}
                    ],
                    "channels": [
                        {"alternatives": [{"transcript": "hi there bye", "detected_language": "en"}]}
                    ]
                }
            }"#,
        )
        .unwrap();

        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.segments.len(), 2);
        assert_eq!(transcript.segments[0].text, "hi there");
        assert_eq!(transcript.duration_secs, 4.0);
        assert_eq!(transcript.language.as_deref(), Some("en"));
        assert!(transcript.validate().is_ok());
    }

    #[test]
    fn channel_transcript_fallback_is_single_segment() {
        let payload: DeepgramResponse = serde_json::from_str(
            r#"{
                "metadata": {"duration": 7.25},
                "results": {
                    "channels": [{"alternatives": [{"transcript": "all in one go"}]}]
                }
            }"#,
        )
        .unwrap();

        let transcript = provider().to_transcript(payload).unwrap();
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].end_secs, 7.25);
        assert_eq!(transcript.segments[0].text, "all in one go");
    }

    #[test]
    fn missing_results_is_an_error() {
        let payload: DeepgramResponse = serde_json::from_str(r#"{"metadata": {}}"#).unwrap();
        assert!(matches!(
            provider().to_transcript(payload),
            Err(ProviderError::Unknown(_))
        ));
    }

    #[test]
    fn empty_channel_transcript_is_an_error() {
        let payload: DeepgramResponse = serde_json::from_str(
            r#"{"results": {"channels": [{"alternatives": [{"transcript": "  "}]}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            provider().to_transcript(payload),
            Err(ProviderError::Unknown(_))
        ));
    }
}
