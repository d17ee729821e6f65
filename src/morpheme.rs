/*!
 * Morphemes produced by the external analyzer.
 *
 * The analyzer prints one morpheme per line:
 * `surface \t pos1,pos2,pos3,pos4,pos5,pos6 \t normalized \t dictionary \t reading [\t ...]`
 * and `EOS` after each input line. Spans are character offsets into the analyzed text.
 */

use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

use crate::errors::AnalyzerError;

/// First part-of-speech levels that carry no lexical content
const IGNORED_POS: &[&str] = &["補助記号", "空白"];

/// Fields required on each analyzer line
const REQUIRED_FIELDS: usize = 5;

/// One morpheme of analyzed text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphemeRecord {
    pub surface: String,
    /// Katakana reading, may be empty for unknown words
    pub reading: String,
    pub normalized_form: String,
    pub dictionary_form: String,
    pub pos_path: Vec<String>,
    /// Character offsets in the analyzed text
    pub span: Range<usize>,
}

impl MorphemeRecord {
    /// Build a record, deriving forms from the surface. Used by tests and the
    /// static analyzer.
    pub fn new(surface: &str, reading: &str, pos: &str) -> Self {
        Self {
            surface: surface.to_string(),
            reading: reading.to_string(),
            normalized_form: surface.to_string(),
            dictionary_form: surface.to_string(),
            pos_path: pos.split(',').map(str::to_string).collect(),
            span: 0..surface.chars().count(),
        }
    }

    pub fn with_forms(mut self, normalized_form: &str, dictionary_form: &str) -> Self {
        self.normalized_form = normalized_form.to_string();
        self.dictionary_form = dictionary_form.to_string();
        self
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = span;
        self
    }

    /// Punctuation and whitespace morphemes
    pub fn is_ignorable(&self) -> bool {
        self.pos_path
            .first()
            .is_some_and(|pos| IGNORED_POS.contains(&pos.as_str()))
    }
}

/// Parse analyzer output into morphemes with spans accumulated over surfaces
pub fn parse_analyzer_output(output: &str) -> Result<Vec<MorphemeRecord>, AnalyzerError> {
    let mut morphemes = Vec::new();
    let mut offset = 0;

    for (idx, line) in output.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() || line == "EOS" {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < REQUIRED_FIELDS {
            return Err(AnalyzerError::MalformedOutput {
                line: idx + 1,
                content: line.to_string(),
            });
        }

        let surface = fields[0].to_string();
        let len = surface.chars().count();
        morphemes.push(MorphemeRecord {
            pos_path: fields[1].split(',').map(str::to_string).collect(),
            normalized_form: fields[2].to_string(),
            dictionary_form: fields[3].to_string(),
            reading: fields[4].to_string(),
            span: offset..offset + len,
            surface,
        });
        offset += len;
    }

    Ok(morphemes)
}

/// Occurrence counts for one normalized form
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalStats {
    #[serde(rename = "c")]
    pub count: usize,
    /// Counts by surface form
    #[serde(rename = "sc")]
    pub surfaces: BTreeMap<String, usize>,
    /// Counts by dictionary form
    #[serde(rename = "dc")]
    pub dictionary_forms: BTreeMap<String, usize>,
}

/// Count normalized forms of the non-ignorable morphemes
pub fn normal_stats(morphemes: &[MorphemeRecord]) -> BTreeMap<String, NormalStats> {
    let mut stats: BTreeMap<String, NormalStats> = BTreeMap::new();
    for m in morphemes.iter().filter(|m| !m.is_ignorable()) {
        let entry = stats.entry(m.normalized_form.clone()).or_default();
        entry.count += 1;
        *entry.surfaces.entry(m.surface.clone()).or_default() += 1;
        *entry.dictionary_forms.entry(m.dictionary_form.clone()).or_default() += 1;
    }
    stats
}

/// Token of a tokenization run, serialized compactly for the index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenSpan {
    /// Normalized form
    pub t: String,
    /// Begin offset
    pub b: usize,
    /// End offset
    pub e: usize,
}

/// Group consecutive non-ignorable morphemes into runs
pub fn token_runs(morphemes: &[MorphemeRecord]) -> Vec<Vec<TokenSpan>> {
    let mut runs = Vec::new();
    let mut current: Vec<TokenSpan> = Vec::new();

    for m in morphemes {
        if m.is_ignorable() {
            if !current.is_empty() {
                runs.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(TokenSpan {
            t: m.normalized_form.clone(),
            b: m.span.start,
            e: m.span.end,
        });
    }
    if !current.is_empty() {
        runs.push(current);
    }

    runs
}
