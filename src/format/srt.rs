// src/format/srt.rs
// SRT (SubRip) block rendering

use super::SubtitleLayout;
use crate::transcript::Transcript;
use regex::Regex;
use std::fmt::Write as _;
use std::sync::OnceLock;

/// Emit one numbered block per segment, indices starting at 1.
pub(super) fn render(transcript: &Transcript, layout: &SubtitleLayout) -> String {
    let mut out = String::new();
    for (i, segment) in transcript.segments.iter().enumerate() {
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            format_timestamp(segment.start_secs),
            format_timestamp(segment.end_secs),
            wrap_cue_text(&segment.text, layout)
        );
    }
    out
}

/// Seconds to the SRT time form `HH:MM:SS,mmm`, rounded to the nearest
/// millisecond.
pub(crate) fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let secs = (total_ms % 60_000) / 1_000;
    let millis = total_ms % 1_000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

fn cue_parts(text: &str) -> Vec<&str> {
    // Runs of text ending at a sentence delimiter (ASCII and CJK forms),
    // delimiter kept attached to its clause.
    static PARTS_RE: OnceLock<Regex> = OnceLock::new();
    let re = PARTS_RE.get_or_init(|| {
        Regex::new(r"[^,.!?;，。！？；]+[,.!?;，。！？；]?|[,.!?;，。！？；]")
            .expect("valid cue delimiter regex")
    });
    re.find_iter(text).map(|m| m.as_str()).collect()
}

/// Break cue text into at most `max_line_count` lines of at most
/// `max_line_width` characters, preferring punctuation boundaries.
/// Overflow beyond the last line is truncated with an ellipsis.
fn wrap_cue_text(text: &str, layout: &SubtitleLayout) -> String {
    let width = layout.max_line_width;
    if width == 0 || text.chars().count() <= width {
        return text.to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for part in cue_parts(text) {
        if current.chars().count() + part.chars().count() <= width {
            current.push_str(part);
        } else {
            if !current.is_empty() {
                lines.push(current);
            }
            current = part.to_string();
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    let max_lines = layout.max_line_count;
    if max_lines > 0 && lines.len() > max_lines {
        let remainder = lines.split_off(max_lines - 1).join(" ");
        let truncated = if remainder.chars().count() > width {
            let kept: String = remainder.chars().take(width.saturating_sub(3)).collect();
            format!("{}...", kept)
        } else {
            remainder
        };
        lines.push(truncated);
    }

    lines.join("\n")
}
