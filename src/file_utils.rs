use anyhow::{Context, Result};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::document::{DocumentKind, SourceDocument};
use crate::errors::DocumentError;

// @module: File and directory utilities

// @const: First cue of an SRT body
static SRT_CUE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\d+\s*\r?\n\d{2}:\d{2}:\d{2}[,.]\d{3}\s+-->\s+\d{2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("Invalid SRT cue regex")
});

// @const: Extensions picked up when walking an input directory
const DOCUMENT_EXTENSIONS: &[&str] = &["json", "srt", "html", "htm"];

// @struct: File operations utility
pub struct FileManager;

impl FileManager {
    // @creates: Directory and parents if needed
    pub fn ensure_dir<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        if !path.as_os_str().is_empty() && !path.exists() {
            fs::create_dir_all(path)?;
        }
        Ok(())
    }

    /// Collect document files under a path. A file path is returned as is;
    /// a directory is walked recursively and sorted for a stable order.
    pub fn find_documents<P: AsRef<Path>>(input: P) -> Result<Vec<PathBuf>> {
        let input = input.as_ref();
        if input.is_file() {
            return Ok(vec![input.to_path_buf()]);
        }
        if !input.is_dir() {
            return Err(anyhow::anyhow!("Input path does not exist: {:?}", input));
        }

        let mut result = Vec::new();
        for entry in WalkDir::new(input).follow_links(true) {
            let entry = entry.context("Failed to read directory entry")?;
            let path = entry.path();

            if path.is_file() {
                if let Some(ext) = path.extension() {
                    let ext = ext.to_string_lossy().to_lowercase();
                    if DOCUMENT_EXTENSIONS.contains(&ext.as_str()) {
                        result.push(path.to_path_buf());
                    }
                }
            }
        }

        result.sort();
        debug!("Found {} documents under {:?}", result.len(), input);
        Ok(result)
    }

    /// Read a file to a string
    pub fn read_to_string<P: AsRef<Path>>(path: P) -> Result<String> {
        fs::read_to_string(&path).with_context(|| format!("Failed to read file: {:?}", path.as_ref()))
    }

    /// Write a string to a file
    pub fn write_to_file<P: AsRef<Path>>(path: P, content: &str) -> Result<()> {
        if let Some(parent) = path.as_ref().parent() {
            Self::ensure_dir(parent)?;
        }

        fs::write(&path, content).with_context(|| format!("Failed to write to file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// Detect whether a file is a JSON document envelope, a subtitle track or an HTML chapter
    pub fn detect_file_type<P: AsRef<Path>>(path: P) -> Result<FileType> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(anyhow::anyhow!("File does not exist: {:?}", path));
        }

        if let Some(ext) = path.extension() {
            match ext.to_string_lossy().to_lowercase().as_str() {
                "json" => return Ok(FileType::DocumentJson),
                "srt" => return Ok(FileType::Subtitle),
                "html" | "htm" => return Ok(FileType::Html),
                _ => {}
            }
        }

        // Fall back to examining file contents
        if let Ok(content) = fs::read_to_string(path) {
            let trimmed = content.trim_start_matches('\u{feff}').trim_start();
            if trimmed.starts_with('{') {
                return Ok(FileType::DocumentJson);
            }
            if SRT_CUE_REGEX.is_match(trimmed) {
                return Ok(FileType::Subtitle);
            }
            if trimmed.starts_with('<') {
                return Ok(FileType::Html);
            }
        }

        Ok(FileType::Unknown)
    }

    /// Load a source document from a JSON envelope or a bare subtitle/HTML file.
    /// Envelopes without a key are keyed by file stem.
    pub fn load_document<P: AsRef<Path>>(path: P) -> Result<SourceDocument> {
        let path = path.as_ref();
        let content = Self::read_to_string(path)?;
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        match Self::detect_file_type(path)? {
            FileType::DocumentJson => {
                let mut doc: SourceDocument = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse document envelope: {:?}", path))?;
                if doc.key.is_empty() {
                    doc.key = stem;
                }
                Ok(doc)
            }
            FileType::Subtitle => Self::bare_document(path, stem, DocumentKind::Subtitle, content),
            FileType::Html => Self::bare_document(path, stem, DocumentKind::NovelHtml, content),
            FileType::Unknown => {
                let ext = path
                    .extension()
                    .map(|e| e.to_string_lossy().to_string())
                    .unwrap_or_default();
                Err(DocumentError::UnsupportedKind(ext).into())
            }
        }
    }

    fn bare_document(path: &Path, stem: String, kind: DocumentKind, body: String) -> Result<SourceDocument> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        if DocumentKind::from_extension(&ext).is_some() {
            return Ok(SourceDocument::from_bare_file(path, body)?);
        }

        debug!("Detected {:?} content in {:?}", kind, path);
        let mut doc = SourceDocument::new(stem.clone(), kind, body);
        doc.title = Some(stem);
        Ok(doc)
    }
}

/// Enum representing the input file types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// JSON envelope holding a source document
    DocumentJson,
    /// Subtitle file (SRT)
    Subtitle,
    /// HTML novel chapter
    Html,
    /// Unknown file type
    Unknown,
}
