/*!
 * Source documents and the records derived from them.
 *
 * A `SourceDocument` is the JSON envelope a crawler stores for one subtitle track or
 * one novel chapter. Fragmenting it yields `Fragment`s for search, chunking it
 * yields `Chunk`s for display; both may carry a `Loc` pointing back into the source.
 */

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use url::Url;

use crate::app_config::{ChunkingConfig, FragmentingConfig};
use crate::errors::DocumentError;
use crate::novel_processor::NovelChapter;
use crate::sentence_splitter::RejectSink;
use crate::subtitle_processor::SubtitleTrack;

/// Kind of source body, serialized as its MIME type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// SubRip subtitle track
    #[serde(rename = "application/x-subrip")]
    Subtitle,
    /// HTML novel chapter with a single root element
    #[serde(rename = "text/html")]
    NovelHtml,
}

impl DocumentKind {
    /// Comma separated tags stored with the source
    pub fn tags(&self) -> &'static str {
        match self {
            DocumentKind::Subtitle => "drama,subs",
            DocumentKind::NovelHtml => "novel",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            DocumentKind::Subtitle => "application/x-subrip",
            DocumentKind::NovelHtml => "text/html",
        }
    }

    /// Guess the kind of a bare file from its extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(DocumentKind::Subtitle),
            "html" | "htm" => Some(DocumentKind::NovelHtml),
            _ => None,
        }
    }
}

impl FromStr for DocumentKind {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "application/x-subrip" => Ok(DocumentKind::Subtitle),
            "text/html" => Ok(DocumentKind::NovelHtml),
            other => Err(DocumentError::UnsupportedKind(other.to_string())),
        }
    }
}

/// A stored source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceDocument {
    /// Storage key, unique per source
    #[serde(default)]
    pub key: String,

    #[serde(rename = "type")]
    pub kind: DocumentKind,

    #[serde(default)]
    pub title: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub published: Option<String>,

    /// Raw subtitle or HTML body
    #[serde(rename = "text")]
    pub body: String,
}

impl SourceDocument {
    pub fn new(key: impl Into<String>, kind: DocumentKind, body: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            title: None,
            url: None,
            published: None,
            body: body.into(),
        }
    }

    /// Build a document from a bare `.srt` or `.html` file body, keyed by file stem
    pub fn from_bare_file(path: &Path, body: String) -> Result<Self, DocumentError> {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_default();
        let kind = DocumentKind::from_extension(&ext)
            .ok_or_else(|| DocumentError::UnsupportedKind(ext.clone()))?;
        let key = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut doc = Self::new(key.clone(), kind, body);
        doc.title = Some(key);
        Ok(doc)
    }

    /// Hex SHA-256 of the body, used to skip unchanged documents
    pub fn body_hash(&self) -> String {
        let digest = Sha256::digest(self.body.as_bytes());
        digest.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Link to a location inside this document, when it has a URL
    pub fn deep_link(&self, loc: Option<&Loc>) -> Option<Url> {
        deep_link(self.url.as_deref()?, loc)
    }
}

/// Append a location to a source URL as its fragment. Unparseable URLs give `None`.
pub fn deep_link(url: &str, loc: Option<&Loc>) -> Option<Url> {
    let mut url = Url::parse(url).ok()?;
    if let Some(loc) = loc {
        url.set_fragment(Some(&loc.url_fragment()));
    }
    Some(url)
}

/// Location of a fragment or chunk inside its source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Loc {
    /// Time range of a subtitle cue group, in milliseconds
    Time { start_ms: u64, end_ms: u64 },
    /// Element id inside an HTML document
    Anchor(String),
}

impl Loc {
    /// Fragment part of a deep link: a media fragment for time ranges, the id otherwise
    pub fn url_fragment(&self) -> String {
        match self {
            Loc::Time { start_ms, end_ms } => {
                format!("t={},{}", format_seconds(*start_ms), format_seconds(*end_ms))
            }
            Loc::Anchor(id) => id.clone(),
        }
    }
}

/// Milliseconds as seconds with three decimals
pub fn format_seconds(ms: u64) -> String {
    format!("{}.{:03}", ms / 1000, ms % 1000)
}

fn parse_seconds(s: &str) -> Option<u64> {
    let (secs, frac) = s.split_once('.').unwrap_or((s, "0"));
    if frac.is_empty() || frac.len() > 3 || !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let secs: u64 = secs.parse().ok()?;
    let millis: u64 = format!("{:0<3}", frac).parse().ok()?;
    Some(secs * 1000 + millis)
}

impl fmt::Display for Loc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Loc::Time { start_ms, end_ms } => {
                write!(f, "t:{}-{}", format_seconds(*start_ms), format_seconds(*end_ms))
            }
            Loc::Anchor(id) => write!(f, "a:{}", id),
        }
    }
}

impl FromStr for Loc {
    type Err = DocumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DocumentError::InvalidLocator(s.to_string());
        if let Some(range) = s.strip_prefix("t:") {
            let (start, end) = range.split_once('-').ok_or_else(invalid)?;
            let start_ms = parse_seconds(start).ok_or_else(invalid)?;
            let end_ms = parse_seconds(end).ok_or_else(invalid)?;
            Ok(Loc::Time { start_ms, end_ms })
        } else if let Some(id) = s.strip_prefix("a:") {
            if id.is_empty() {
                return Err(invalid());
            }
            Ok(Loc::Anchor(id.to_string()))
        } else {
            Err(invalid())
        }
    }
}

impl TryFrom<String> for Loc {
    type Error = DocumentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Loc> for String {
    fn from(loc: Loc) -> Self {
        loc.to_string()
    }
}

/// A cleaned, independently searchable sentence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

impl Fragment {
    pub fn new(text: impl Into<String>, loc: Option<Loc>) -> Self {
        Self {
            text: text.into(),
            loc,
        }
    }
}

/// A display-sized group of cues or paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Plain text, one line per cue or sentence
    pub text: String,
    /// Markup keeping paragraph boundaries, time attributes, anchors and ruby
    pub html: String,
    /// Location of the first constituent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loc: Option<Loc>,
}

/// Escape text for inclusion in HTML content or attribute values
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Split a document into search fragments
pub fn fragment_document(
    doc: &SourceDocument,
    config: &FragmentingConfig,
    sink: Option<&mut dyn RejectSink>,
) -> Result<Vec<Fragment>, DocumentError> {
    match doc.kind {
        DocumentKind::Subtitle => {
            let track = SubtitleTrack::parse_srt_string(&doc.body)?;
            Ok(track.fragments(&config.subtitle_rules(), sink))
        }
        DocumentKind::NovelHtml => {
            let chapter = NovelChapter::parse_html(&doc.body)?;
            Ok(chapter.fragments(&config.novel_rules(), sink))
        }
    }
}

/// Group a document into display chunks
pub fn chunk_document(doc: &SourceDocument, config: &ChunkingConfig) -> Result<Vec<Chunk>, DocumentError> {
    match doc.kind {
        DocumentKind::Subtitle => {
            let track = SubtitleTrack::parse_srt_string(&doc.body)?;
            Ok(track.chunks(config))
        }
        DocumentKind::NovelHtml => {
            let chapter = NovelChapter::parse_html(&doc.body)?;
            Ok(chapter.chunks(config))
        }
    }
}

/// Plain text of a document, one cue or paragraph per line
pub fn document_plain_text(doc: &SourceDocument) -> Result<String, DocumentError> {
    match doc.kind {
        DocumentKind::Subtitle => Ok(SubtitleTrack::parse_srt_string(&doc.body)?.plain_text()),
        DocumentKind::NovelHtml => Ok(NovelChapter::parse_html(&doc.body)?.plain_text()),
    }
}
