/*!
 * Morphological analyzer boundary.
 *
 * Fragments are tokenized by an external program. `CommandAnalyzer` runs it as a
 * child process per call, `StaticAnalyzer` serves canned results for tests.
 */

use async_trait::async_trait;
use log::{debug, trace};
use std::collections::HashMap;
use std::fmt::Debug;
use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::app_config::AnalyzerConfig;
use crate::errors::AnalyzerError;
use crate::morpheme::{parse_analyzer_output, MorphemeRecord};

/// Common trait for morphological analyzers
#[async_trait]
pub trait MorphemeAnalyzer: Send + Sync + Debug {
    /// Split one line of text into morphemes, in order
    async fn analyze(&self, text: &str) -> Result<Vec<MorphemeRecord>, AnalyzerError>;
}

/// Analyzer backed by an external command reading text on stdin
#[derive(Debug, Clone)]
pub struct CommandAnalyzer {
    command: String,
    args: Vec<String>,
    timeout_secs: u64,
}

impl CommandAnalyzer {
    pub fn new(command: impl Into<String>, args: Vec<String>, timeout_secs: u64) -> Self {
        Self {
            command: command.into(),
            args,
            timeout_secs,
        }
    }

    pub fn from_config(config: &AnalyzerConfig) -> Self {
        Self::new(config.command.clone(), config.args.clone(), config.timeout_secs)
    }

    async fn run(&self, input: String) -> Result<String, AnalyzerError> {
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| AnalyzerError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        let mut stdin = child.stdin.take().ok_or_else(|| {
            AnalyzerError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "analyzer stdin is not available",
            ))
        })?;

        let write = async move {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output = output?;

        // A process that exits early closes its stdin; report the exit, not the pipe
        if !output.status.success() {
            return Err(AnalyzerError::NonZeroExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        written?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl MorphemeAnalyzer for CommandAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Vec<MorphemeRecord>, AnalyzerError> {
        let input = format!("{}\n", text.replace(['\r', '\n'], " "));
        trace!("Analyzing {:?} with {}", text, self.command);

        let stdout = timeout(Duration::from_secs(self.timeout_secs), self.run(input))
            .await
            .map_err(|_| AnalyzerError::Timeout(self.timeout_secs))??;

        let morphemes = parse_analyzer_output(&stdout)?;
        debug!("Analyzer returned {} morphemes", morphemes.len());
        Ok(morphemes)
    }
}

/// Analyzer returning fixed morphemes per text; unknown texts become one morpheme
#[derive(Debug, Default)]
pub struct StaticAnalyzer {
    entries: HashMap<String, Vec<MorphemeRecord>>,
    /// Number of analyze calls
    call_count: Arc<AtomicUsize>,
}

impl StaticAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, text: &str, morphemes: Vec<MorphemeRecord>) -> Self {
        self.entries.insert(text.to_string(), morphemes);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MorphemeAnalyzer for StaticAnalyzer {
    async fn analyze(&self, text: &str) -> Result<Vec<MorphemeRecord>, AnalyzerError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        match self.entries.get(text) {
            Some(morphemes) => Ok(morphemes.clone()),
            None => Ok(vec![MorphemeRecord::new(text, "", "名詞,普通名詞,一般,*,*,*")]),
        }
    }
}
