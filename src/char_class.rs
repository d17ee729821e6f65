/*!
 * Character classification for Japanese text.
 *
 * Counting "meaty" characters (everything except whitespace, punctuation and
 * symbols), extracting kana/kanji content, spotting unexpected punctuation and
 * the small amount of kana arithmetic the furigana aligner needs.
 */

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// @const: Whitespace, punctuation (P*) and symbol (S*) characters
static NON_MEATY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\s\p{P}\p{S}]").expect("non-meaty character class is valid"));

// @const: Punctuation (P*) and symbol (S*) characters
static PUNCT_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\p{P}\p{S}]").expect("punctuation character class is valid"));

/// Punctuation and symbols that may legitimately appear inside a sentence
pub const ALLOWED_PUNCTUATION: &str = concat!(
    "「」『』〝〟【】（）()≪≫<>《》｟｠＜＞⦅⦆〈〉［］[]",
    "、。，．・：；？！…‥―─～〜",
    ",.!?:;'\"’-",
    "♪♬☆★※＆&％%／/＝=＋+",
);

/// Kana and repeat marks that can stand in for part of a reading
const READING_CAPABLE_KANA: &str = "々〇カケヵヶぁぃぅぇぉァィゥェォ";

/// Offset between the hiragana and katakana blocks
const KANA_BLOCK_OFFSET: u32 = 0x30a1 - 0x3041;

/// Count characters that are neither whitespace, punctuation nor symbols
pub fn meaty_char_count(text: &str) -> usize {
    text.chars().count() - NON_MEATY_RE.find_iter(text).count()
}

/// Remove whitespace, punctuation and symbols from a text
pub fn remove_spaces_punctuation(text: &str) -> String {
    NON_MEATY_RE.replace_all(text, "").into_owned()
}

/// Returns true for characters whose Unicode name mentions HIRAGANA, KATAKANA or CJK
pub fn is_kana_or_kanji(c: char) -> bool {
    matches!(c as u32,
        0x3041..=0x309f      // Hiragana
        | 0x30a0..=0x30ff    // Katakana
        | 0x31f0..=0x31ff    // Katakana phonetic extensions
        | 0x32d0..=0x32fe    // Circled katakana
        | 0xff65..=0xff9f    // Halfwidth katakana
        | 0x2e80..=0x2eff    // CJK radicals supplement
        | 0x31c0..=0x31ef    // CJK strokes
        | 0x3400..=0x4dbf    // CJK unified ideographs extension A
        | 0x4e00..=0x9fff    // CJK unified ideographs
        | 0xf900..=0xfaff    // CJK compatibility ideographs
        | 0x1aff0..=0x1afff  // Kana extended B
        | 0x1b000..=0x1b16f  // Kana supplement, kana extended A, small kana extension
        | 0x1f200..=0x1f202  // Square hiragana hoka, squared katakana koko and sa
        | 0x1f210..=0x1f23b  // Squared katakana de and squared CJK unified ideographs
        | 0x1f240..=0x1f248  // Tortoise shell bracketed CJK unified ideographs
        | 0x20000..=0x2a6df  // Extension B
        | 0x2a700..=0x2ebef  // Extensions C to F
        | 0x2ebf0..=0x2ee5f  // Extension I
        | 0x2f800..=0x2fa1f  // Compatibility ideographs supplement
        | 0x30000..=0x3134f  // Extension G
        | 0x31350..=0x323af  // Extension H
    )
}

/// Keep only kana and kanji characters
pub fn extract_kana_kanji(text: &str) -> String {
    text.chars().filter(|&c| is_kana_or_kanji(c)).collect()
}

/// Keep only punctuation and symbols that are not in the allow-list
pub fn extract_weird_punct(text: &str) -> String {
    PUNCT_SYMBOL_RE
        .find_iter(text)
        .flat_map(|m| m.as_str().chars())
        .filter(|&c| !ALLOWED_PUNCTUATION.contains(c))
        .collect()
}

/// Kanji as matched by the `[一-龯]` range
pub fn is_kanji(c: char) -> bool {
    ('\u{4e00}'..='\u{9faf}').contains(&c)
}

/// ASCII or full-width decimal digit
pub fn is_numeral(c: char) -> bool {
    c.is_ascii_digit() || ('０'..='９').contains(&c)
}

pub fn has_any_kanji(text: &str) -> bool {
    text.chars().any(is_kanji)
}

pub fn has_any_numerals(text: &str) -> bool {
    text.chars().any(is_numeral)
}

/// True for a non-empty text made only of digits
pub fn is_all_numerals(text: &str) -> bool {
    !text.is_empty() && text.chars().all(is_numeral)
}

/// Characters over which a reading may be spread by the furigana aligner
pub fn char_could_have_reading(c: char) -> bool {
    is_kanji(c) || is_numeral(c) || READING_CAPABLE_KANA.contains(c)
}

/// Map hiragana to katakana, leaving everything else untouched
pub fn hiragana_to_katakana(text: &str) -> String {
    text.chars().map(hiragana_char_to_katakana).collect()
}

/// Map katakana to hiragana, leaving everything else untouched
pub fn katakana_to_hiragana(text: &str) -> String {
    text.chars()
        .map(|c| match c as u32 {
            code @ 0x30a1..=0x30f6 => char::from_u32(code - KANA_BLOCK_OFFSET).unwrap_or(c),
            _ => c,
        })
        .collect()
}

pub fn hiragana_char_to_katakana(c: char) -> char {
    match c as u32 {
        code @ 0x3041..=0x3096 => char::from_u32(code + KANA_BLOCK_OFFSET).unwrap_or(c),
        _ => c,
    }
}

fn is_halfwidth_kana(c: char) -> bool {
    ('\u{ff61}'..='\u{ff9f}').contains(&c)
}

/// Convert half-width katakana (and its punctuation) to full-width, composing
/// voiced and semi-voiced marks. Other characters, ASCII included, are kept.
pub fn halfwidth_kana_to_fullwidth(text: &str) -> String {
    if !text.chars().any(is_halfwidth_kana) {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len());
    let mut run = String::new();
    for c in text.chars() {
        if is_halfwidth_kana(c) {
            run.push(c);
        } else {
            flush_halfwidth_run(&mut run, &mut result);
            result.push(c);
        }
    }
    flush_halfwidth_run(&mut run, &mut result);
    result
}

fn flush_halfwidth_run(run: &mut String, out: &mut String) {
    // A mark that found nothing to compose with stays a spacing mark
    out.extend(run.nfkc().map(|c| match c {
        '\u{3099}' => '゛',
        '\u{309a}' => '゜',
        c => c,
    }));
    run.clear();
}
