//! Error types for faqbot.
//!
//! Startup errors (dataset, index, config) are fatal. Speech errors are
//! recoverable and get turned into a textual reply by the HTTP handlers.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for faqbot operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// No entries to build an index from
    #[error("knowledge base is empty, no index can be built")]
    EmptyCorpus,

    /// Dataset file is missing or unreadable
    #[error("failed to read dataset {path:?}: {source}")]
    Dataset {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dataset row could not be decoded into a question/answer pair
    #[error("malformed dataset row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },

    #[error("unsupported dataset format: {0}")]
    UnsupportedFormat(String),

    /// Speech-to-text produced nothing usable
    #[error("speech was not recognized")]
    UnrecognizedSpeech,

    /// Speech-to-text service could not be reached or is not configured
    #[error("{0}")]
    ServiceUnavailable(String),

    /// Text-to-speech failed to render
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    /// Voice upload missing or unreadable
    #[error("invalid upload: {0}")]
    Upload(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

