use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{debug, error, info, trace, warn};
use serde_json::json;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use crate::analyzer::MorphemeAnalyzer;
use crate::app_config::Config;
use crate::database::{ProcessingStage, Repository};
use crate::document::{chunk_document, document_plain_text, fragment_document, SourceDocument};
use crate::errors::AnalyzerError;
use crate::file_utils::FileManager;
use crate::indexing::{analyze_fragment, BulkWriter, IndexDocument, IndexRef};
use crate::sentence_splitter::RejectLog;

// @module: Application controller for document processing

/// Where fragment and chunk results go
pub enum OutputTarget {
    /// Store in the database, skipping documents whose body is unchanged
    Database(Repository),
    /// One JSON object per line
    JsonLines(Box<dyn Write + Send>),
}

/// Counts for a batch of documents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub processed: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Fragments or chunks produced
    pub items: usize,
}

/// Counts for an index run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexSummary {
    pub indexed: usize,
    pub repetitive: usize,
    pub failed: usize,
}

enum DocumentOutcome {
    Stored(usize),
    Unchanged,
}

/// Main application controller
pub struct Controller {
    // @field: App configuration
    config: Config,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fragment every document under `input`
    pub async fn run_fragment(&self, input: &Path, output: &mut OutputTarget, force: bool) -> Result<BatchSummary> {
        self.run_stage(input, output, ProcessingStage::Fragments, force).await
    }

    /// Chunk every document under `input`
    pub async fn run_chunk(&self, input: &Path, output: &mut OutputTarget, force: bool) -> Result<BatchSummary> {
        self.run_stage(input, output, ProcessingStage::Chunks, force).await
    }

    async fn run_stage(
        &self,
        input: &Path,
        output: &mut OutputTarget,
        stage: ProcessingStage,
        force: bool,
    ) -> Result<BatchSummary> {
        let start_time = std::time::Instant::now();
        let paths = FileManager::find_documents(input)?;
        if paths.is_empty() {
            return Err(anyhow::anyhow!("No documents found under: {:?}", input));
        }

        let progress_bar = Self::progress_bar(paths.len() as u64, "documents");
        progress_bar.set_message(format!("Storing {}", stage));

        let mut summary = BatchSummary::default();
        for path in &paths {
            let file_name = Self::display_name(path);
            progress_bar.set_message(format!("Processing: {}", file_name));

            match self.process_document(path, output, stage, force).await {
                Ok(DocumentOutcome::Stored(items)) => {
                    summary.processed += 1;
                    summary.items += items;
                }
                Ok(DocumentOutcome::Unchanged) => {
                    debug!("Skipping unchanged document {}", file_name);
                    summary.skipped += 1;
                }
                Err(e) => {
                    error!("Error processing file {}: {:#}", file_name, e);
                    summary.failed += 1;
                }
            }
            progress_bar.inc(1);
        }

        if let OutputTarget::JsonLines(writer) = output {
            writer.flush().context("Failed to flush output")?;
        }

        progress_bar.finish_and_clear();
        info!(
            "Stored {} for {} documents: {} items, {} unchanged, {} errors ({})",
            stage,
            summary.processed,
            summary.items,
            summary.skipped,
            summary.failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(summary)
    }

    async fn process_document(
        &self,
        path: &Path,
        output: &mut OutputTarget,
        stage: ProcessingStage,
        force: bool,
    ) -> Result<DocumentOutcome> {
        let doc = FileManager::load_document(path)?;

        if let OutputTarget::Database(repo) = output {
            if !force && repo.source_hash(&doc.key, stage).await? == Some(doc.body_hash()) {
                return Ok(DocumentOutcome::Unchanged);
            }
        }

        match stage {
            ProcessingStage::Fragments => self.store_fragments(&doc, output).await,
            ProcessingStage::Chunks => self.store_chunks(&doc, output).await,
        }
    }

    async fn store_fragments(&self, doc: &SourceDocument, output: &mut OutputTarget) -> Result<DocumentOutcome> {
        let mut rejects = RejectLog::default();
        let fragments = fragment_document(doc, &self.config.fragmenting, Some(&mut rejects))?;
        for (candidate, reason) in &rejects.entries {
            trace!("Rejected {:?} in {}: {:?}", candidate, doc.key, reason);
        }
        debug!(
            "{}: {} fragments, {} rejected candidates",
            doc.key,
            fragments.len(),
            rejects.entries.len()
        );

        match output {
            OutputTarget::Database(repo) => {
                repo.store_source_fragments(doc, &fragments).await?;
            }
            OutputTarget::JsonLines(writer) => {
                for fragment in &fragments {
                    let line = json!({
                        "source": doc.key,
                        "text": fragment.text,
                        "loc": fragment.loc.as_ref().map(|loc| loc.to_string()),
                    });
                    writeln!(writer, "{}", line).context("Failed to write fragment")?;
                }
            }
        }
        Ok(DocumentOutcome::Stored(fragments.len()))
    }

    async fn store_chunks(&self, doc: &SourceDocument, output: &mut OutputTarget) -> Result<DocumentOutcome> {
        let chunks = chunk_document(doc, &self.config.chunking)?;
        debug!("{}: {} chunks", doc.key, chunks.len());

        match output {
            OutputTarget::Database(repo) => {
                repo.replace_source_chunks(doc, &chunks).await?;
            }
            OutputTarget::JsonLines(writer) => {
                for (seq, chunk) in chunks.iter().enumerate() {
                    let line = json!({
                        "source": doc.key,
                        "seq": seq,
                        "text": chunk.text,
                        "html": chunk.html,
                        "loc": chunk.loc.as_ref().map(|loc| loc.to_string()),
                    });
                    writeln!(writer, "{}", line).context("Failed to write chunk")?;
                }
            }
        }
        Ok(DocumentOutcome::Stored(chunks.len()))
    }

    /// Analyze every stored fragment and write bulk index documents.
    /// Fragments are analyzed concurrently but written in id order.
    pub async fn run_index<W: Write>(
        &self,
        repo: &Repository,
        analyzer: Arc<dyn MorphemeAnalyzer>,
        writer: W,
    ) -> Result<IndexSummary> {
        let start_time = std::time::Instant::now();
        let index_config = &self.config.index;
        let max_states = self.config.furigana.max_search_states;

        let fragments = repo
            .fragments_with_refs(index_config.max_refs, index_config.seed)
            .await?;
        info!("Indexing {} fragments with {:?}", fragments.len(), analyzer);

        let progress_bar = Self::progress_bar(fragments.len() as u64, "fragments");
        let mut bulk = BulkWriter::new(writer);
        let mut summary = IndexSummary::default();

        let results = stream::iter(fragments)
            .map(|item| {
                let analyzer = analyzer.clone();
                async move {
                    let annotation = analyze_fragment(analyzer.as_ref(), &item.fragment.text, max_states).await;
                    (item, annotation)
                }
            })
            .buffered(index_config.concurrent_requests);
        let mut results = std::pin::pin!(results);

        while let Some((item, annotation)) = results.next().await {
            progress_bar.inc(1);
            match annotation {
                Ok(Some(annotation)) => {
                    let refs = item.refs.iter().map(IndexRef::from).collect();
                    bulk.write(&IndexDocument::new(item.fragment.text, annotation, refs))?;
                    summary.indexed += 1;
                }
                Ok(None) => summary.repetitive += 1,
                Err(e @ AnalyzerError::Spawn { .. }) => {
                    progress_bar.abandon();
                    return Err(e.into());
                }
                Err(e) => {
                    warn!("Failed to analyze fragment {}: {}", item.fragment.id, e);
                    summary.failed += 1;
                }
            }
        }

        bulk.finish()?;
        progress_bar.finish_and_clear();
        info!(
            "Indexed {} fragments: {} repetitive, {} errors ({})",
            summary.indexed,
            summary.repetitive,
            summary.failed,
            Self::format_duration(start_time.elapsed())
        );
        Ok(summary)
    }

    /// Plain text of every document under `input`, separated by blank lines
    pub fn run_text(&self, input: &Path) -> Result<String> {
        let mut texts = Vec::new();
        for path in FileManager::find_documents(input)? {
            let doc = FileManager::load_document(&path)?;
            let text = document_plain_text(&doc).with_context(|| format!("Failed to read {:?}", path))?;
            texts.push(text);
        }
        Ok(texts.join("\n\n"))
    }

    fn progress_bar(len: u64, unit: &str) -> ProgressBar {
        if len <= 1 {
            return ProgressBar::hidden();
        }

        let progress_bar = ProgressBar::new(len);
        let template = format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
            unit
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        progress_bar.set_style(style.progress_chars("█▓▒░"));
        progress_bar
    }

    fn display_name(path: &Path) -> String {
        path.file_name()
            .map(|f| f.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string())
    }

    // Format duration in a human-readable format
    fn format_duration(duration: std::time::Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
