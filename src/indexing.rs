/*!
 * Index-time processing of stored fragments.
 *
 * Each fragment is analyzed, dropped if repetitive, and otherwise turned into an
 * `IndexDocument` with its furigana reading, token runs and normal-form counts.
 * Documents are written as bulk NDJSON: an action line followed by the document.
 */

use anyhow::{Context, Result};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;

use crate::analyzer::MorphemeAnalyzer;
use crate::database::HitRef;
use crate::document::deep_link;
use crate::errors::AnalyzerError;
use crate::furigana::morphemes_reading;
use crate::morpheme::{normal_stats, token_runs, MorphemeRecord, NormalStats, TokenSpan};
use crate::repetition::is_repetitive;

/// Analysis results attached to a fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub reading: String,
    pub tokens: Vec<Vec<TokenSpan>>,
    pub normals: BTreeMap<String, NormalStats>,
}

/// Annotate analyzed text, or `None` when it is too repetitive to index
pub fn annotate(text: &str, morphemes: &[MorphemeRecord], max_states: usize) -> Option<Annotation> {
    if is_repetitive(text, morphemes) {
        debug!("Skipping repetitive fragment: {}", text);
        return None;
    }

    Some(Annotation {
        reading: morphemes_reading(morphemes, max_states),
        tokens: token_runs(morphemes),
        normals: normal_stats(morphemes),
    })
}

/// Analyze and annotate one fragment
pub async fn analyze_fragment(
    analyzer: &dyn MorphemeAnalyzer,
    text: &str,
    max_states: usize,
) -> Result<Option<Annotation>, AnalyzerError> {
    let morphemes = analyzer.analyze(text).await?;
    Ok(annotate(text, &morphemes, max_states))
}

/// Where an indexed fragment occurs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexRef {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<String>,
    /// Deep link into the source
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub tags: String,
}

impl From<&HitRef> for IndexRef {
    fn from(hit: &HitRef) -> Self {
        Self {
            source: hit.source_key.clone(),
            title: hit.title.clone(),
            loc: hit.loc.as_ref().map(|loc| loc.to_string()),
            url: hit
                .url
                .as_deref()
                .and_then(|url| deep_link(url, hit.loc.as_ref()))
                .map(String::from),
            tags: hit.tags.clone(),
        }
    }
}

/// Search document for one fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDocument {
    pub text: String,
    pub reading: String,
    pub tokens: Vec<Vec<TokenSpan>>,
    pub normals: BTreeMap<String, NormalStats>,
    pub refs: Vec<IndexRef>,
}

impl IndexDocument {
    pub fn new(text: impl Into<String>, annotation: Annotation, refs: Vec<IndexRef>) -> Self {
        Self {
            text: text.into(),
            reading: annotation.reading,
            tokens: annotation.tokens,
            normals: annotation.normals,
            refs,
        }
    }
}

/// Writes index documents as bulk NDJSON
pub struct BulkWriter<W: Write> {
    writer: W,
    written: usize,
}

impl<W: Write> BulkWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    pub fn write(&mut self, doc: &IndexDocument) -> Result<()> {
        writeln!(self.writer, "{}", r#"{"index":{}}"#).context("Failed to write bulk action line")?;
        serde_json::to_writer(&mut self.writer, doc).context("Failed to serialize index document")?;
        writeln!(self.writer).context("Failed to write bulk document line")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn finish(mut self) -> Result<W> {
        self.writer.flush().context("Failed to flush bulk output")?;
        Ok(self.writer)
    }
}
