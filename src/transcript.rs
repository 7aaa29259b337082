// src/transcript.rs
// Canonical transcript model shared by providers and formatters

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One timed span of transcribed speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start offset in seconds from the beginning of the audio.
    pub start_secs: f64,
    /// End offset in seconds; always >= `start_secs`.
    pub end_secs: f64,
    pub text: String,
}

impl Segment {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
        }
    }
}

/// Transcription result normalized from any provider response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Segments in time order.
    pub segments: Vec<Segment>,
    /// Detected or requested language (e.g. "en", "zh"), if known.
    pub language: Option<String>,
    /// Total audio duration in seconds, 0.0 if the provider did not report it.
    pub duration_secs: f64,
    /// Provider name (e.g. "Groq", "Deepgram").
    pub provider: String,
}

/// Violation of the segment ordering invariants. Indicates a bug in a
/// provider mapping, not bad user input.
#[derive(Debug, Error)]
pub enum InvalidTranscript {
    #[error("transcript has no segments")]
    Empty,

    #[error("segment {index} has negative time: start={start_secs}")]
    NegativeTime { index: usize, start_secs: f64 },

    #[error("segment {index} ends before it starts: {start_secs} > {end_secs}")]
    Inverted {
        index: usize,
        start_secs: f64,
        end_secs: f64,
    },

    #[error("segment {index} starts earlier than its predecessor")]
    OutOfOrder { index: usize },
}

impl Transcript {
    /// Build a transcript from a provider that returned text without timing.
    /// The whole text becomes one segment spanning `[0, duration]` (a
    /// zero-duration span when the duration is unknown).
    pub fn from_text(
        text: impl Into<String>,
        duration_secs: f64,
        language: Option<String>,
        provider: impl Into<String>,
    ) -> Self {
        let duration_secs = duration_secs.max(0.0);
        Self {
            segments: vec![Segment::new(0.0, duration_secs, text)],
            language,
            duration_secs,
            provider: provider.into(),
        }
    }

    /// Check the segment invariants: at least one segment, non-negative
    /// times, end >= start, starts non-decreasing across the sequence.
    pub fn validate(&self) -> Result<(), InvalidTranscript> {
        if self.segments.is_empty() {
            return Err(InvalidTranscript::Empty);
        }

        let mut previous_start = 0.0f64;
        for (index, segment) in self.segments.iter().enumerate() {
            if segment.start_secs < 0.0 {
                return Err(InvalidTranscript::NegativeTime {
                    index,
                    start_secs: segment.start_secs,
                });
            }
            if segment.end_secs < segment.start_secs {
                return Err(InvalidTranscript::Inverted {
                    index,
                    start_secs: segment.start_secs,
                    end_secs: segment.end_secs,
                });
            }
            if index > 0 && segment.start_secs < previous_start {
                return Err(InvalidTranscript::OutOfOrder { index });
            }
            previous_start = segment.start_secs;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_segments_are_valid() {
        let transcript = Transcript {
            segments: vec![
                Segment::new(0.0, 1.2, "hello"),
                Segment::new(1.2, 3.0, "world"),
            ],
            language: Some("en".to_string()),
            duration_secs: 3.0,
            provider: "Groq".to_string(),
        };
        assert!(transcript.validate().is_ok());
    }

    #[test]
    fn empty_transcript_is_invalid() {
        let transcript = Transcript {
            segments: vec![],
            language: None,
            duration_secs: 0.0,
            provider: "Groq".to_string(),
        };
        assert!(matches!(
            transcript.validate(),
            Err(InvalidTranscript::Empty)
        ));
    }

    #[test]
    fn inverted_segment_is_invalid() {
        let transcript = Transcript {
            segments: vec![Segment::new(2.0, 1.0, "backwards")],
            language: None,
            duration_secs: 2.0,
            provider: "Groq".to_string(),
        };
        assert!(matches!(
            transcript.validate(),
            Err(InvalidTranscript::Inverted { index: 0, .. })
        ));
    }

    #[test]
    fn out_of_order_segments_are_invalid() {
        let transcript = Transcript {
            segments: vec![
                Segment::new(5.0, 6.0, "later"),
                Segment::new(1.0, 2.0, "earlier"),
            ],
            language: None,
            duration_secs: 6.0,
            provider: "Deepgram".to_string(),
        };
        assert!(matches!(
            transcript.validate(),
            Err(InvalidTranscript::OutOfOrder { index: 1 })
        ));
    }

    #[test]
    fn from_text_spans_whole_duration() {
        let transcript = Transcript::from_text("hi there", 2.5, None, "Groq");
        assert_eq!(transcript.segments.len(), 1);
        assert_eq!(transcript.segments[0].start_secs, 0.0);
        assert_eq!(transcript.segments[0].end_secs, 2.5);
        assert!(transcript.validate().is_ok());
    }

    #[test]
    fn from_text_without_duration_is_zero_span() {
        let transcript = Transcript::from_text("hi", 0.0, None, "Groq");
        assert_eq!(transcript.segments[0].end_secs, 0.0);
        assert!(transcript.validate().is_ok());
    }
}
