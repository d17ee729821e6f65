/*!
 * Error types for the shiori application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. Rejected sentences and
 * furigana fallbacks are expected outcomes and are not represented here.
 */

use thiserror::Error;

/// Errors raised when a source document does not have the shape its kind promises
#[derive(Error, Debug)]
pub enum DocumentError {
    /// A cue timing line could not be parsed
    #[error("Malformed timestamp at line {line}: {content}")]
    MalformedTimestamp {
        /// 1-based line number in the subtitle body
        line: usize,
        /// The offending line
        content: String,
    },

    /// The subtitle body contained no usable cue
    #[error("No subtitle cues found")]
    NoCues,

    /// The HTML body has no single root element to read paragraphs from
    #[error("Document has no root element")]
    MissingRoot,

    /// The document envelope declares a type we cannot process
    #[error("Unsupported document type: {0}")]
    UnsupportedKind(String),

    /// A location string did not follow the `t:` / `a:` form
    #[error("Invalid locator: {0}")]
    InvalidLocator(String),
}

/// Errors from the external morphological analyzer
#[derive(Error, Debug)]
pub enum AnalyzerError {
    /// The analyzer process could not be started
    #[error("Failed to spawn analyzer '{command}': {source}")]
    Spawn {
        /// Command that was run
        command: String,
        /// Underlying spawn error
        source: std::io::Error,
    },

    /// Reading from or writing to the analyzer failed
    #[error("Analyzer I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The analyzer exited unsuccessfully
    #[error("Analyzer exited with {status}: {stderr}")]
    NonZeroExit {
        /// Exit status description
        status: String,
        /// Captured standard error
        stderr: String,
    },

    /// The analyzer took longer than the configured timeout
    #[error("Analyzer timed out after {0} seconds")]
    Timeout(u64),

    /// An output line did not have the expected tab-separated fields
    #[error("Malformed analyzer output at line {line}: {content}")]
    MalformedOutput {
        /// 1-based line number in the analyzer output
        line: usize,
        /// The offending line
        content: String,
    },
}

/// Errors from the persistence layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite reported an error
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A stored record could not be decoded
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from document parsing
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Error from the analyzer
    #[error("Analyzer error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Error from storage
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}
