/*!
 * Tests for reading alignment and repetition detection
 */

use proptest::prelude::*;
use regex::Regex;

use shiori::char_class::hiragana_to_katakana;
use shiori::furigana::{match_furigana, morphemes_reading, try_match_furigana, DEFAULT_MAX_SEARCH_STATES};
use shiori::morpheme::MorphemeRecord;
use shiori::repetition::is_repetitive;

use crate::common::morpheme;

/// Remove bracketed readings and run separators from an annotated string
fn strip_annotations(annotated: &str) -> String {
    let re = Regex::new(r"\[[^\]]*\]| ").unwrap();
    re.replace_all(annotated, "").into_owned()
}

proptest! {
    #[test]
    fn test_matchFurigana_withKanaOnlySurface_shouldReturnSurface(surface in "[ぁ-ゖ]{1,12}") {
        let reading = hiragana_to_katakana(&surface);
        prop_assert_eq!(match_furigana(&surface, &reading, false), surface);
    }

    #[test]
    fn test_tryMatchFurigana_withSuccess_shouldPreserveSurface(
        surface in "[日本語学校食物あいかす]{1,6}",
        reading in "[ア-ン]{1,10}",
    ) {
        if let Ok(annotated) = try_match_furigana(&surface, &reading, false, 10_000) {
            prop_assert_eq!(strip_annotations(&annotated), surface);
        }
    }
}

/// Test the literal alignment scenarios with a hiragana reading
#[test]
fn test_matchFurigana_withHiraganaReading_shouldAnnotate() {
    assert_eq!(match_furigana("様々", "さまざま", false), "様々[さまざま]");
    assert_eq!(match_furigana("食べ物", "たべもの", false), "食[た]べ 物[もの]");
}

/// Test the place-name override ignores the analyzer reading
#[test]
fn test_morphemesReading_withPlaceName_shouldUseOverride() {
    let morphemes = vec![
        morpheme("日本", "ニッポン", "名詞,固有名詞,地名,国,*,*", 0),
        morpheme("へ", "エ", "助詞,格助詞,*,*,*,*", 2),
        morpheme("行く", "イク", "動詞,非自立可能,*,*,五段-カ行,終止形-一般", 3),
    ];
    assert_eq!(
        morphemes_reading(&morphemes, DEFAULT_MAX_SEARCH_STATES),
        "日本[にほん]へ 行[い]く"
    );
}

/// Test the override only applies to the matching part of speech
#[test]
fn test_morphemesReading_withOtherPartOfSpeech_shouldAlignNormally() {
    let morphemes = vec![MorphemeRecord::new("日本", "ニッポン", "名詞,普通名詞,一般,*,*,*")];
    assert_eq!(morphemes_reading(&morphemes, DEFAULT_MAX_SEARCH_STATES), "日本[にっぽん]");
}

/// Test stuttering detection on characters and morphemes
#[test]
fn test_isRepetitive_withScenarios_shouldFlagOnlyLongRuns() {
    assert!(is_repetitive("あばばばばばばばばっ！", &[]));

    let twice = vec![
        morpheme("長い", "ナガイ", "形容詞,一般,*,*,形容詞,連体形-一般", 0),
        morpheme("長い", "ナガイ", "形容詞,一般,*,*,形容詞,連体形-一般", 2),
        morpheme("時間", "ジカン", "名詞,普通名詞,一般,*,*,*", 4),
        morpheme("が", "ガ", "助詞,格助詞,*,*,*,*", 6),
        morpheme("かかっ", "カカッ", "動詞,一般,*,*,五段-ラ行,連用形-促音便", 7),
        morpheme("た", "タ", "助動詞,*,*,*,助動詞-タ,終止形-一般", 10),
        morpheme("。", "。", "補助記号,句点,*,*,*,*", 11),
    ];
    assert!(!is_repetitive("長い長い時間がかかった。", &twice));

    let thrice = vec![
        morpheme("ねえ", "ネエ", "感動詞,一般,*,*,*,*", 0),
        morpheme("、", "、", "補助記号,読点,*,*,*,*", 2),
        morpheme("ねえ", "ネエ", "感動詞,一般,*,*,*,*", 3),
        morpheme("、", "、", "補助記号,読点,*,*,*,*", 5),
        morpheme("ねえ", "ネエ", "感動詞,一般,*,*,*,*", 6),
    ];
    assert!(is_repetitive("ねえ、ねえ、ねえ", &thrice));
}
