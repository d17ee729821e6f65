/*!
 * Furigana alignment.
 *
 * Readings are attached to runs of kanji (and numerals, iteration marks and small
 * kana) in bracket notation: `繰[く]り 返[かえ]す`. Alignment is a depth-first search
 * over (surface position, reading position) pairs kept on an explicit stack; the
 * first complete alignment wins.
 */

use log::warn;
use std::fmt;

use crate::char_class::{
    char_could_have_reading, has_any_kanji, has_any_numerals, hiragana_char_to_katakana, is_all_numerals,
    katakana_to_hiragana,
};
use crate::morpheme::MorphemeRecord;

/// Search states explored before giving up on one alignment
pub const DEFAULT_MAX_SEARCH_STATES: usize = 100_000;

/// Whole-word readings used instead of the analyzer's, keyed by surface and a
/// part-of-speech prefix
const READING_OVERRIDES: &[(&str, &[&str], &str)] = &[
    ("日本", &["名詞", "固有名詞", "地名", "国", "*", "*"], "日本[にほん]"),
    ("私", &["代名詞", "*", "*", "*", "*", "*"], "私[わたし]"),
];

/// Why an alignment produced no annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignmentFailure {
    /// Every branch of the search dead-ended
    NoSolution,
    /// The search hit the state limit
    StateLimit,
}

impl fmt::Display for AlignmentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AlignmentFailure::NoSolution => write!(f, "no alignment"),
            AlignmentFailure::StateLimit => write!(f, "search state limit reached"),
        }
    }
}

#[derive(Debug)]
struct SearchState {
    surface_idx: usize,
    reading_idx: usize,
    result: String,
    accum_kana: String,
}

fn kana_equivalent(surface_char: char, reading_char: char) -> bool {
    let s = hiragana_char_to_katakana(surface_char);
    let r = hiragana_char_to_katakana(reading_char);
    s == r || matches!((s, r), ('ハ', 'ワ') | ('ヂ', 'ジ') | ('ヅ', 'ズ'))
}

/// Align `reading` to `surface`, failing instead of falling back.
///
/// `not_start` asks for a separating space before the first annotated run, for
/// units that follow other text.
pub fn try_match_furigana(
    surface: &str,
    reading: &str,
    not_start: bool,
    max_states: usize,
) -> Result<String, AlignmentFailure> {
    let surface: Vec<char> = surface.chars().collect();
    let reading: Vec<char> = reading.chars().collect();

    let mut stack = vec![SearchState {
        surface_idx: 0,
        reading_idx: 0,
        result: String::new(),
        accum_kana: String::new(),
    }];
    let mut explored = 0;

    while let Some(state) = stack.pop() {
        explored += 1;
        if explored > max_states {
            return Err(AlignmentFailure::StateLimit);
        }

        let SearchState {
            surface_idx,
            reading_idx,
            result,
            accum_kana,
        } = state;

        if surface_idx == surface.len() {
            if reading_idx == reading.len() && accum_kana.is_empty() {
                return Ok(result);
            }
            continue;
        }
        if reading_idx == reading.len() {
            continue;
        }

        let surface_char = surface[surface_idx];
        let reading_char = reading[reading_idx];

        if accum_kana.is_empty() && kana_equivalent(surface_char, reading_char) {
            let mut result = result;
            result.push(surface_char);
            stack.push(SearchState {
                surface_idx: surface_idx + 1,
                reading_idx: reading_idx + 1,
                result,
                accum_kana,
            });
        } else if char_could_have_reading(surface_char) {
            let run_end = surface[surface_idx..]
                .iter()
                .position(|&c| !char_could_have_reading(c))
                .map_or(surface.len(), |offset| surface_idx + offset);

            let mut longer_kana = accum_kana.clone();
            longer_kana.push(reading_char);

            let separator = if not_start || !result.is_empty() { " " } else { "" };
            let run: String = surface[surface_idx..run_end].iter().collect();
            let closed = format!("{}{}{}[{}]", result, separator, run, katakana_to_hiragana(&longer_kana));

            // The close branch is pushed last so it is tried first
            stack.push(SearchState {
                surface_idx,
                reading_idx: reading_idx + 1,
                result,
                accum_kana: longer_kana,
            });
            stack.push(SearchState {
                surface_idx: run_end,
                reading_idx: reading_idx + 1,
                result: closed,
                accum_kana: String::new(),
            });
        }
    }

    Err(AlignmentFailure::NoSolution)
}

/// Align with an explicit state limit, returning the bare surface on failure
pub fn match_furigana_bounded(surface: &str, reading: &str, not_start: bool, max_states: usize) -> String {
    match try_match_furigana(surface, reading, not_start, max_states) {
        Ok(annotated) => annotated,
        Err(failure) => {
            warn!("Furigana fallback for {:?} / {:?}: {}", surface, reading, failure);
            surface.to_string()
        }
    }
}

pub fn match_furigana(surface: &str, reading: &str, not_start: bool) -> String {
    match_furigana_bounded(surface, reading, not_start, DEFAULT_MAX_SEARCH_STATES)
}

fn override_reading(morpheme: &MorphemeRecord) -> Option<&'static str> {
    READING_OVERRIDES
        .iter()
        .find(|(surface, pos, _)| {
            *surface == morpheme.surface
                && morpheme.pos_path.iter().zip(pos.iter()).all(|(actual, expected)| actual == expected)
        })
        .map(|&(_, _, reading)| reading)
}

/// Annotated reading of a whole analyzed sentence
pub fn morphemes_reading(morphemes: &[MorphemeRecord], max_states: usize) -> String {
    let mut pieces: Vec<String> = Vec::with_capacity(morphemes.len());

    for m in morphemes {
        let piece = if let Some(reading) = override_reading(m) {
            if pieces.is_empty() {
                reading.to_string()
            } else {
                format!(" {}", reading)
            }
        } else if m.reading.is_empty()
            || !(has_any_kanji(&m.surface) || has_any_numerals(&m.surface))
            || is_all_numerals(&m.surface)
        {
            m.surface.clone()
        } else {
            match_furigana_bounded(&m.surface, &m.reading, !pieces.is_empty(), max_states)
        };
        pieces.push(piece);
    }

    pieces.concat()
}
