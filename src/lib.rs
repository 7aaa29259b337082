//! Batch transcription core: feeds local audio files to remote
//! speech-to-text providers (optionally through an HTTP or SOCKS5 proxy)
//! and renders the results as SRT subtitles or plain text.
//!
//! The caller builds a [`BatchRequest`], hands it to [`submit`], and
//! observes per-job progress on the returned event stream. One job's
//! failure never affects another; the final [`BatchSummary`] reports every
//! job's terminal state.

mod batch;
mod config;
mod format;
mod provider;
mod transcript;
mod transport;

pub use batch::{
    submit, BatchCanceller, BatchEvent, BatchHandle, BatchSummary, JobSnapshot, JobStatus,
};
pub use config::{
    BatchRequest, ConfigurationError, ProxyConfig, ProxyKind, DEFAULT_CONCURRENCY,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use format::{extension, render, FormatError, OutputFormat, SubtitleLayout};
pub use provider::{
    DeepgramProvider, GroqProvider, ProgressSink, ProviderError, ProviderId, SpeechProvider,
};
pub use transcript::{InvalidTranscript, Segment, Transcript};
pub use transport::build_client;
