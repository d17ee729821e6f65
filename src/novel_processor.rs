/*!
 * Novel chapter parsing, fragmenting and chunking.
 *
 * A chapter is a single-root HTML tree whose direct `<p>` children are the
 * paragraphs. Paragraph markup is simplified down to text plus `<ruby>` elements,
 * split into sentences, and grouped into display chunks. Paragraphs without any
 * meaty characters never produce fragments and separate chunking runs.
 */

use log::debug;
use scraper::node::Node;
use scraper::{ElementRef, Html};

use crate::app_config::ChunkingConfig;
use crate::char_class::meaty_char_count;
use crate::chunk_partitioner::{partition, PartitionLimits, Partitionable};
use crate::document::{escape_html, Chunk, Fragment, Loc};
use crate::errors::DocumentError;
use crate::sentence_splitter::{split_and_clean, split_sentences, RejectSink, SplitterRules, SplitterVariant};

/// Elements whose text is an annotation, not part of the sentence
const ANNOTATION_ELEMENTS: &[&str] = &["rt", "rp"];

/// One sentence of a paragraph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    /// Plain text without ruby annotations
    pub text: String,
    /// Simplified markup, text plus `<ruby>` elements
    pub markup: String,
    pub meaty_chars: usize,
}

impl Sentence {
    pub fn from_markup(markup: impl Into<String>) -> Self {
        let markup = markup.into();
        let text = plain_text_of_markup(&markup).trim().to_string();
        let meaty_chars = meaty_char_count(&text);
        Self { text, markup, meaty_chars }
    }
}

impl Partitionable for Sentence {
    fn size(&self) -> usize {
        self.meaty_chars
    }
}

/// One `<p>` element of a chapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paragraph {
    pub sentences: Vec<Sentence>,
    pub meaty_chars: usize,
    /// Element id, used for deep links
    pub anchor: Option<String>,
    /// Plain text of the whole paragraph
    pub text: String,
}

impl Paragraph {
    fn from_element(element: ElementRef) -> Self {
        let mut markup = String::new();
        simplified_inner_html(element, &mut markup);

        let sentences: Vec<Sentence> = split_sentences(&markup, SplitterVariant::Novel)
            .into_iter()
            .map(Sentence::from_markup)
            .collect();
        let meaty_chars = sentences.iter().map(|s| s.meaty_chars).sum();

        let mut text = String::new();
        collect_plain_text(element, &mut text);

        let anchor = element
            .value()
            .attr("id")
            .filter(|id| !id.is_empty())
            .map(str::to_string);

        Self {
            sentences,
            meaty_chars,
            anchor,
            text,
        }
    }

    pub fn loc(&self) -> Option<Loc> {
        self.anchor.clone().map(Loc::Anchor)
    }
}

/// A parsed novel chapter
#[derive(Debug, Clone, Default)]
pub struct NovelChapter {
    pub paragraphs: Vec<Paragraph>,
}

impl NovelChapter {
    /// Parse a chapter body. Only direct `<p>` children of the first root element
    /// are read.
    pub fn parse_html(body: &str) -> Result<Self, DocumentError> {
        let fragment = Html::parse_fragment(body.trim());

        let root = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .ok_or(DocumentError::MissingRoot)?;

        let paragraphs: Vec<Paragraph> = root
            .children()
            .filter_map(ElementRef::wrap)
            .filter(|child| child.value().name() == "p")
            .map(Paragraph::from_element)
            .collect();

        debug!("Parsed {} paragraphs from <{}> root", paragraphs.len(), root.value().name());
        Ok(Self { paragraphs })
    }

    /// Cleaned sentences of every paragraph that has meaty characters
    pub fn fragments(&self, rules: &SplitterRules, mut sink: Option<&mut dyn RejectSink>) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        for paragraph in self.paragraphs.iter().filter(|p| p.meaty_chars > 0) {
            let loc = paragraph.loc();
            for text in split_and_clean(&paragraph.text, rules, sink.as_deref_mut()) {
                fragments.push(Fragment::new(text, loc.clone()));
            }
        }
        fragments
    }

    /// Display chunks. Empty paragraphs split the chapter into independently
    /// chunked runs; paragraphs over the size limit are broken into sentence groups.
    pub fn chunks(&self, config: &ChunkingConfig) -> Vec<Chunk> {
        let limits = config.html_limits();
        let mut chunks = Vec::new();

        for run in self.paragraphs.split(|p| p.meaty_chars == 0) {
            if run.is_empty() {
                continue;
            }

            let pieces = paragraph_pieces(run, &limits);
            for group in partition(&pieces, &limits) {
                chunks.push(novel_chunk(group));
            }
        }

        chunks
    }

    /// Plain text of the chapter, one paragraph per line
    pub fn plain_text(&self) -> String {
        self.paragraphs
            .iter()
            .filter(|p| p.meaty_chars > 0)
            .map(|p| p.text.trim())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A whole paragraph, or a group of sentences from an oversized one
#[derive(Debug)]
struct ParagraphPiece<'a> {
    paragraph: &'a Paragraph,
    sentences: &'a [Sentence],
}

impl Partitionable for ParagraphPiece<'_> {
    fn size(&self) -> usize {
        self.sentences.iter().map(|s| s.meaty_chars).sum()
    }
}

fn paragraph_pieces<'a>(run: &'a [Paragraph], limits: &PartitionLimits) -> Vec<ParagraphPiece<'a>> {
    let mut pieces = Vec::new();
    for paragraph in run {
        if paragraph.meaty_chars <= limits.max_size {
            pieces.push(ParagraphPiece {
                paragraph,
                sentences: &paragraph.sentences,
            });
            continue;
        }

        debug!(
            "Splitting paragraph {:?} ({} chars) into sentence groups",
            paragraph.anchor, paragraph.meaty_chars
        );
        for sentences in partition(&paragraph.sentences, limits) {
            pieces.push(ParagraphPiece { paragraph, sentences });
        }
    }
    pieces
}

fn novel_chunk(group: &[ParagraphPiece]) -> Chunk {
    let text = group
        .iter()
        .flat_map(|piece| piece.sentences.iter().map(|s| s.text.as_str()))
        .collect::<Vec<_>>()
        .join("\n");

    // Consecutive pieces of one paragraph share a single <p>
    let mut html = String::new();
    let mut open: Option<&Paragraph> = None;
    for piece in group {
        if !open.is_some_and(|p| std::ptr::eq(p, piece.paragraph)) {
            if open.is_some() {
                html.push_str("</p>");
            }
            match &piece.paragraph.anchor {
                Some(id) => html.push_str(&format!("<p id=\"{}\">", escape_html(id))),
                None => html.push_str("<p>"),
            }
            open = Some(piece.paragraph);
        }
        for sentence in piece.sentences {
            html.push_str(&sentence.markup);
        }
    }
    if open.is_some() {
        html.push_str("</p>");
    }

    let loc = group.first().and_then(|piece| piece.paragraph.loc());

    Chunk { text, html, loc }
}

/// Inner HTML with every element except `<ruby>` replaced by its contents
fn simplified_inner_html(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(&escape_html(text)),
            Node::Element(el) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if el.name() == "ruby" {
                        out.push_str(&child_element.html());
                    } else {
                        simplified_inner_html(child_element, out);
                    }
                }
            }
            _ => {}
        }
    }
}

fn collect_plain_text(element: ElementRef, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                if ANNOTATION_ELEMENTS.contains(&el.name()) {
                    continue;
                }
                if let Some(child_element) = ElementRef::wrap(child) {
                    collect_plain_text(child_element, out);
                }
            }
            _ => {}
        }
    }
}

fn plain_text_of_markup(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    let mut text = String::new();
    collect_plain_text(fragment.root_element(), &mut text);
    text
}
