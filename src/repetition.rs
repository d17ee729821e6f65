/*!
 * Repetition detection.
 *
 * Stuttering and sound-effect lines are dropped before indexing: a text is
 * repetitive when one character repeats four times in a row, or when one
 * morpheme surface repeats three times in a row once symbols and whitespace are
 * skipped.
 */

use crate::morpheme::MorphemeRecord;

/// Same character this many times in a row marks text as repetitive
const REPEATED_CHAR_RUN: usize = 4;

/// Same morpheme surface this many times in a row marks text as repetitive
const REPEATED_MORPHEME_RUN: usize = 3;

/// True when some character occurs 4 or more times consecutively
pub fn has_repeated_chars(text: &str) -> bool {
    let mut run = 0;
    let mut prev = None;
    for c in text.chars() {
        if prev == Some(c) {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        if run >= REPEATED_CHAR_RUN {
            return true;
        }
    }
    false
}

/// True when a content morpheme repeats 3 times in a row. Punctuation and
/// whitespace morphemes are skipped, so they neither break nor extend a run.
pub fn has_repeated_morphemes(morphemes: &[MorphemeRecord]) -> bool {
    let mut run = 0;
    let mut prev: Option<&str> = None;
    for m in morphemes.iter().filter(|m| !m.is_ignorable()) {
        if prev == Some(m.surface.as_str()) {
            run += 1;
            if run >= REPEATED_MORPHEME_RUN - 1 {
                return true;
            }
        } else {
            run = 0;
        }
        prev = Some(m.surface.as_str());
    }
    false
}

/// Stuttering or sound-effect text that should not be indexed
pub fn is_repetitive(text: &str, morphemes: &[MorphemeRecord]) -> bool {
    has_repeated_chars(text) || has_repeated_morphemes(morphemes)
}
