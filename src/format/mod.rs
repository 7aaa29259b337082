// src/format/mod.rs
// Rendering of canonical transcripts into caller-facing text

mod srt;

use crate::transcript::{InvalidTranscript, Transcript};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::config::ConfigurationError;

/// The formatter received a transcript violating the segment invariants.
/// That is a provider mapping bug; the job fails, the batch continues.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("malformed transcript: {0}")]
    InvalidTranscript(#[from] InvalidTranscript),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Srt,
    PlainText,
}

impl FromStr for OutputFormat {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "srt" => Ok(OutputFormat::Srt),
            "plaintext" | "text" | "txt" => Ok(OutputFormat::PlainText),
            other => Err(ConfigurationError::UnknownOutputFormat(other.to_string())),
        }
    }
}

/// File extension callers typically use when persisting rendered output
/// next to the source audio.
pub fn extension(format: OutputFormat) -> &'static str {
    match format {
        OutputFormat::Srt => "srt",
        OutputFormat::PlainText => "txt",
    }
}

/// Line layout applied to SRT cue text. A `max_line_width` of 0 disables
/// wrapping entirely.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubtitleLayout {
    pub max_line_count: usize,
    pub max_line_width: usize,
}

impl Default for SubtitleLayout {
    fn default() -> Self {
        Self {
            max_line_count: 2,
            max_line_width: 42,
        }
    }
}

impl SubtitleLayout {
    pub fn unwrapped() -> Self {
        Self {
            max_line_count: 0,
            max_line_width: 0,
        }
    }
}

/// Render a transcript. Pure and deterministic: the same transcript and
/// format always produce byte-identical output.
pub fn render(
    transcript: &Transcript,
    format: OutputFormat,
    layout: &SubtitleLayout,
) -> Result<String, FormatError> {
    transcript.validate()?;
    Ok(match format {
        OutputFormat::Srt => srt::render(transcript, layout),
        OutputFormat::PlainText => render_plain(transcript),
    })
}

fn render_plain(transcript: &Transcript) -> String {
    transcript
        .segments
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::Segment;

    fn transcript(segments: Vec<Segment>) -> Transcript {
        Transcript {
            segments,
            language: None,
            duration_secs: 0.0,
            provider: "test".to_string(),
        }
    }

    #[test]
    fn output_format_parses_exact_values() {
        assert_eq!("srt".parse::<OutputFormat>().unwrap(), OutputFormat::Srt);
        assert_eq!(
            "PlainText".parse::<OutputFormat>().unwrap(),
            OutputFormat::PlainText
        );
        assert!(matches!(
            "vtt".parse::<OutputFormat>(),
            Err(ConfigurationError::UnknownOutputFormat(_))
        ));
    }

    #[test]
    fn plain_text_joins_segments_with_newlines() {
        let t = transcript(vec![
            Segment::new(0.0, 1.0, "one"),
            Segment::new(1.0, 2.0, "two"),
            Segment::new(2.0, 3.0, "three"),
        ]);
        let out = render(&t, OutputFormat::PlainText, &SubtitleLayout::default()).unwrap();
        assert_eq!(out, "one\ntwo\nthree");
        assert_eq!(out.lines().count(), 3);
    }

    #[test]
    fn rendering_is_deterministic() {
        let t = transcript(vec![
            Segment::new(0.0, 1.2, "hello"),
            Segment::new(1.2, 3.0, "world"),
        ]);
        let layout = SubtitleLayout::default();
        let first = render(&t, OutputFormat::Srt, &layout).unwrap();
        let second = render(&t, OutputFormat::Srt, &layout).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn malformed_transcript_is_a_format_error() {
        let t = transcript(vec![Segment::new(3.0, 1.0, "bad")]);
        assert!(matches!(
            render(&t, OutputFormat::Srt, &SubtitleLayout::default()),
            Err(FormatError::InvalidTranscript(_))
        ));
    }

    #[test]
    fn extension_matches_format() {
        assert_eq!(extension(OutputFormat::Srt), "srt");
        assert_eq!(extension(OutputFormat::PlainText), "txt");
    }
}
