use anyhow::{anyhow, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::path::PathBuf;

use crate::chunk_partitioner::PartitionLimits;
use crate::sentence_splitter::SplitterRules;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Config {
    /// Chunk size limits
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Sentence acceptance rules
    #[serde(default)]
    pub fragmenting: FragmentingConfig,

    /// Reading alignment settings
    #[serde(default)]
    pub furigana: FuriganaConfig,

    /// External morphological analyzer
    #[serde(default)]
    pub analyzer: AnalyzerConfig,

    /// SQLite storage
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Index pass settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Chunking limits, counted in meaty characters
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChunkingConfig {
    // @field: Max chars of a subtitle chunk
    #[serde(default = "default_subtitle_max_chunk_chars")]
    pub subtitle_max_chunk_chars: usize,

    // @field: Pause in ms that always starts a new subtitle chunk
    #[serde(default = "default_subtitle_forced_gap_ms")]
    pub subtitle_forced_gap_ms: u64,

    // @field: Max chars of a novel chunk
    #[serde(default = "default_html_max_chunk_chars")]
    pub html_max_chunk_chars: usize,
}

impl ChunkingConfig {
    /// A lone cue above this size is dropped from subtitle chunks
    pub fn subtitle_reject_chunk_chars(&self) -> usize {
        2 * self.subtitle_max_chunk_chars
    }

    pub fn subtitle_limits(&self) -> PartitionLimits {
        PartitionLimits::new(self.subtitle_max_chunk_chars)
            .with_reject_size(self.subtitle_reject_chunk_chars())
            .with_forced_gap(i64::try_from(self.subtitle_forced_gap_ms).unwrap_or(i64::MAX))
    }

    pub fn html_limits(&self) -> PartitionLimits {
        PartitionLimits::new(self.html_max_chunk_chars)
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            subtitle_max_chunk_chars: default_subtitle_max_chunk_chars(),
            subtitle_forced_gap_ms: default_subtitle_forced_gap_ms(),
            html_max_chunk_chars: default_html_max_chunk_chars(),
        }
    }
}

/// Sentence acceptance rules
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FragmentingConfig {
    /// Reject sentences without kana or kanji
    #[serde(default = "default_true")]
    pub require_japanese: bool,
}

impl FragmentingConfig {
    pub fn subtitle_rules(&self) -> SplitterRules {
        SplitterRules::subtitle().with_require_japanese(self.require_japanese)
    }

    pub fn novel_rules(&self) -> SplitterRules {
        SplitterRules::novel().with_require_japanese(self.require_japanese)
    }
}

impl Default for FragmentingConfig {
    fn default() -> Self {
        Self { require_japanese: true }
    }
}

/// Reading alignment settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct FuriganaConfig {
    /// Search states explored before an alignment falls back to the surface
    #[serde(default = "default_max_search_states")]
    pub max_search_states: usize,
}

impl Default for FuriganaConfig {
    fn default() -> Self {
        Self {
            max_search_states: default_max_search_states(),
        }
    }
}

/// External analyzer process
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct AnalyzerConfig {
    // @field: Executable name or path
    #[serde(default = "default_analyzer_command")]
    pub command: String,

    // @field: Arguments passed before input
    #[serde(default = "default_analyzer_args")]
    pub args: Vec<String>,

    // @field: Timeout seconds per analysis
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            command: default_analyzer_command(),
            args: default_analyzer_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Storage location
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Default)]
pub struct DatabaseConfig {
    /// Database file; the user data directory is used when unset
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Index pass settings
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct IndexConfig {
    /// Source references kept per indexed fragment
    #[serde(default = "default_max_refs")]
    pub max_refs: usize,

    /// Fragments analyzed at the same time
    #[serde(default = "default_concurrent_requests")]
    pub concurrent_requests: usize,

    /// Seed for sampling references, so repeated runs pick the same ones
    #[serde(default)]
    pub seed: u64,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            max_refs: default_max_refs(),
            concurrent_requests: default_concurrent_requests(),
            seed: 0,
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_subtitle_max_chunk_chars() -> usize {
    80
}

fn default_subtitle_forced_gap_ms() -> u64 {
    5000
}

fn default_html_max_chunk_chars() -> usize {
    200
}

fn default_max_search_states() -> usize {
    100_000
}

fn default_analyzer_command() -> String {
    "sudachipy".to_string()
}

fn default_analyzer_args() -> Vec<String> {
    vec!["-a".to_string()]
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_refs() -> usize {
    20
}

fn default_concurrent_requests() -> usize {
    4
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.chunking.subtitle_max_chunk_chars == 0 {
            return Err(anyhow!("chunking.subtitle_max_chunk_chars must be greater than zero"));
        }
        if self.chunking.html_max_chunk_chars == 0 {
            return Err(anyhow!("chunking.html_max_chunk_chars must be greater than zero"));
        }
        if self.furigana.max_search_states == 0 {
            return Err(anyhow!("furigana.max_search_states must be greater than zero"));
        }
        if self.analyzer.command.trim().is_empty() {
            return Err(anyhow!("analyzer.command must not be empty"));
        }
        if self.index.max_refs == 0 {
            return Err(anyhow!("index.max_refs must be greater than zero"));
        }
        if self.index.concurrent_requests == 0 {
            return Err(anyhow!("index.concurrent_requests must be greater than zero"));
        }

        Ok(())
    }
}
