/*!
 * Sentence splitting and cleanup.
 *
 * A line of source text (one subtitle cue, one novel paragraph) is split on terminal
 * punctuation, then every candidate goes through a cleanup pass that strips
 * decorative brackets, speaker tags and leading dashes, repairs a single dangling
 * quote and rejects anything that is not a usable standalone sentence.
 */

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::char_class::{extract_kana_kanji, extract_weird_punct, halfwidth_kana_to_fullwidth};
use crate::quote_balance::{closer_for, is_closer, is_opener, is_unbalanced, opener_for, strip_outer_pair};

// @const: Sentence pattern for novel text
static NOVEL_SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^。！…？]*[。！…？]?").expect("novel sentence pattern is valid"));

// @const: Sentence pattern for subtitles, which also end on ASCII marks
static SUBTITLE_SENTENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^。！…？!?]*[。！…？!?]?").expect("subtitle sentence pattern is valid"));

/// Longest bracketed speaker name removed from a sentence start
const MAX_SPEAKER_TAG_CHARS: usize = 6;

/// Decoration markers dropped from a sentence start
const LEADING_MARKERS: &str = "♬☎♪";

/// Stylistic characters stripped from a sentence start
const LEADING_DECORATION: &str = "…‥―─—";

/// Which kind of source a line comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitterVariant {
    /// Subtitle cues, where ASCII `!` and `?` also end a sentence
    Subtitle,
    /// Novel paragraphs
    Novel,
}

/// Rules applied when splitting and cleaning a line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitterRules {
    pub variant: SplitterVariant,
    /// Reject sentences without any kana or kanji
    pub require_japanese: bool,
}

impl SplitterRules {
    pub fn subtitle() -> Self {
        Self {
            variant: SplitterVariant::Subtitle,
            require_japanese: true,
        }
    }

    pub fn novel() -> Self {
        Self {
            variant: SplitterVariant::Novel,
            require_japanese: true,
        }
    }

    pub fn with_require_japanese(mut self, require_japanese: bool) -> Self {
        self.require_japanese = require_japanese;
        self
    }
}

/// Why a candidate sentence was not accepted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Nothing left after cleanup
    Empty,
    /// Starts with a closing bracket whose opener is in another sentence
    DanglingCloser,
    /// Bracket nesting is broken
    Unbalanced,
    /// Contains punctuation or symbols outside the allow-list
    WeirdPunctuation,
    /// Contains no kana or kanji
    NoJapanese,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RejectReason::Empty => "empty",
            RejectReason::DanglingCloser => "dangling closer",
            RejectReason::Unbalanced => "unbalanced brackets",
            RejectReason::WeirdPunctuation => "weird punctuation",
            RejectReason::NoJapanese => "no japanese",
        };
        write!(f, "{}", label)
    }
}

/// Receives candidates that were rejected during cleanup
pub trait RejectSink {
    fn reject(&mut self, candidate: &str, reason: RejectReason);
}

/// Sink that keeps every rejection in memory
#[derive(Debug, Default)]
pub struct RejectLog {
    pub entries: Vec<(String, RejectReason)>,
}

impl RejectSink for RejectLog {
    fn reject(&mut self, candidate: &str, reason: RejectReason) {
        self.entries.push((candidate.to_string(), reason));
    }
}

/// Split a line into raw candidate sentences. Half-width kana are widened first;
/// each candidate extends up to and including one terminal mark and is trimmed.
pub fn split_sentences(line: &str, variant: SplitterVariant) -> Vec<String> {
    let line = halfwidth_kana_to_fullwidth(line);
    let line = if line.contains(['\r', '\n']) {
        line.replace(['\r', '\n'], " ")
    } else {
        line
    };

    let pattern = match variant {
        SplitterVariant::Subtitle => &*SUBTITLE_SENTENCE_RE,
        SplitterVariant::Novel => &*NOVEL_SENTENCE_RE,
    };

    pattern
        .find_iter(&line)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split a line and clean every candidate, returning the accepted sentences in order
pub fn split_and_clean(
    line: &str,
    rules: &SplitterRules,
    mut sink: Option<&mut (dyn RejectSink + '_)>,
) -> Vec<String> {
    let mut accepted = Vec::new();
    for candidate in split_sentences(line, rules.variant) {
        match clean_sentence(&candidate, rules) {
            Ok(sentence) => accepted.push(sentence),
            Err(reason) => {
                trace!("Rejected sentence ({}): {}", reason, candidate);
                if let Some(sink) = sink.as_mut() {
                    sink.reject(&candidate, reason);
                }
            }
        }
    }
    accepted
}

/// Clean one candidate sentence. The cleanup is repeated until it no longer changes
/// the text, so cleaning an accepted sentence again returns it unchanged.
pub fn clean_sentence(candidate: &str, rules: &SplitterRules) -> Result<String, RejectReason> {
    let mut current = candidate.trim().to_string();
    loop {
        let next = clean_once(&current, rules)?;
        if next == current {
            return Ok(next);
        }
        current = next;
    }
}

fn clean_once(text: &str, rules: &SplitterRules) -> Result<String, RejectReason> {
    let text = strip_outer_pair(text.trim()).trim();
    let text = strip_leading_tags(text);
    let text = strip_outer_pair(text).trim();

    let first = text.chars().next().ok_or(RejectReason::Empty)?;
    if is_closer(first) {
        return Err(RejectReason::DanglingCloser);
    }

    let text = repair_dangling_quotes(text);
    if is_unbalanced(text) {
        return Err(RejectReason::Unbalanced);
    }

    let text = text
        .trim_start_matches(|c: char| c.is_whitespace() || LEADING_DECORATION.contains(c))
        .trim_end();
    if text.is_empty() {
        return Err(RejectReason::Empty);
    }
    if !extract_weird_punct(text).is_empty() {
        return Err(RejectReason::WeirdPunctuation);
    }
    if rules.require_japanese && extract_kana_kanji(text).is_empty() {
        return Err(RejectReason::NoJapanese);
    }

    Ok(text.to_string())
}

/// Drop leading decoration markers and bracketed speaker names
fn strip_leading_tags(text: &str) -> &str {
    let mut rest = text.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix(|c: char| LEADING_MARKERS.contains(c)) {
            rest = after.trim_start();
        } else if let Some(after) = strip_speaker_tag(rest) {
            rest = after;
        } else {
            return rest;
        }
    }
}

/// Remove a 1 to 6 character bracketed span at the start, as long as text follows it
fn strip_speaker_tag(text: &str) -> Option<&str> {
    let mut chars = text.char_indices();
    let (_, open) = chars.next()?;
    let close = closer_for(open)?;

    for (count, (idx, c)) in chars.enumerate() {
        if c == close {
            if count == 0 {
                return None;
            }
            let rest = text[idx + c.len_utf8()..].trim_start();
            return (!rest.is_empty()).then_some(rest);
        }
        if count >= MAX_SPEAKER_TAG_CHARS || is_opener(c) || is_closer(c) {
            return None;
        }
    }
    None
}

/// Drop a leading opener whose closer never appears, and a trailing closer whose
/// opener never appears. At most one mark is removed at each end.
fn repair_dangling_quotes(text: &str) -> &str {
    let mut text = text;

    if let Some(first) = text.chars().next() {
        if let Some(close) = closer_for(first) {
            if count_char(text, first) > count_char(text, close) {
                text = text[first.len_utf8()..].trim_start();
            }
        }
    }

    if let Some(last) = text.chars().next_back() {
        if let Some(open) = opener_for(last) {
            if count_char(text, last) > count_char(text, open) {
                text = text[..text.len() - last.len_utf8()].trim_end();
            }
        }
    }

    text
}

fn count_char(text: &str, target: char) -> usize {
    text.chars().filter(|&c| c == target).count()
}
