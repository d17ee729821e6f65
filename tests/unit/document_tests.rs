/*!
 * Tests for subtitle and novel document processing
 */

use shiori::app_config::{ChunkingConfig, FragmentingConfig};
use shiori::document::{chunk_document, document_plain_text, fragment_document, DocumentKind, Loc, SourceDocument};
use shiori::errors::DocumentError;
use shiori::sentence_splitter::{RejectLog, RejectReason};

use crate::common::{SAMPLE_CHAPTER, SAMPLE_SRT};

fn time(start_ms: u64, end_ms: u64) -> Option<Loc> {
    Some(Loc::Time { start_ms, end_ms })
}

/// Test the two-cue English scenario, accepted when Japanese is not required
#[test]
fn test_fragmentDocument_withEnglishCues_shouldKeepCueTimes() {
    let srt = "1
00:02:17,440 --> 00:02:20,375
Senator, we're making
our final approach into Coruscant.

2
00:02:20,476 --> 00:02:22,501
Very good, Lieutenant.
";
    let doc = SourceDocument::new("starwars", DocumentKind::Subtitle, srt);
    let config = FragmentingConfig { require_japanese: false };

    let fragments = fragment_document(&doc, &config, None).unwrap();

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].text, "Senator, we're making our final approach into Coruscant.");
    assert_eq!(fragments[0].loc.as_ref().unwrap().to_string(), "t:137.440-140.375");
    assert_eq!(fragments[1].text, "Very good, Lieutenant.");
    assert_eq!(fragments[1].loc.as_ref().unwrap().to_string(), "t:140.476-142.501");
}

/// Test that the same English cues are rejected under default rules
#[test]
fn test_fragmentDocument_withEnglishCuesAndDefaultRules_shouldRejectAll() {
    let srt = "1\n00:00:01,000 --> 00:00:02,000\nVery good, Lieutenant.\n";
    let doc = SourceDocument::new("en", DocumentKind::Subtitle, srt);
    let mut log = RejectLog::default();

    let fragments = fragment_document(&doc, &FragmentingConfig::default(), Some(&mut log)).unwrap();

    assert!(fragments.is_empty());
    assert_eq!(log.entries[0].1, RejectReason::NoJapanese);
}

/// Test subtitle fragments skip sound-effect cues
#[test]
fn test_fragmentDocument_withSampleTrack_shouldDropSoundEffects() {
    let doc = SourceDocument::new("sample", DocumentKind::Subtitle, SAMPLE_SRT);
    let fragments = fragment_document(&doc, &FragmentingConfig::default(), None).unwrap();

    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["おはようございます。", "今日はいい天気ですね。", "そうですね。"]);
    assert_eq!(fragments[1].loc, time(3500, 5000));
}

/// Test subtitle chunks break at long pauses
#[test]
fn test_chunkDocument_withSampleTrack_shouldSplitAtLongPauses() {
    let doc = SourceDocument::new("sample", DocumentKind::Subtitle, SAMPLE_SRT);
    let chunks = chunk_document(&doc, &ChunkingConfig::default()).unwrap();

    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[0].text, "おはようございます。\n今日はいい天気ですね。");
    assert_eq!(chunks[0].loc, time(1000, 5000));
    assert!(chunks[0].html.starts_with("<p data-t=\"1.000-3.000\">"));
    assert_eq!(chunks[2].loc, time(30_000, 32_000));
}

/// Test a subtitle body with a broken timing line
#[test]
fn test_fragmentDocument_withBadTimingLine_shouldFail() {
    let doc = SourceDocument::new("bad", DocumentKind::Subtitle, "1\n00:00:01 -> 00:00:02\nはい\n");
    let result = fragment_document(&doc, &FragmentingConfig::default(), None);
    assert!(matches!(result, Err(DocumentError::MalformedTimestamp { line: 2, .. })));
}

/// Test novel fragments carry paragraph anchors and drop dangling closers
#[test]
fn test_fragmentDocument_withSampleChapter_shouldUseAnchors() {
    let doc = SourceDocument::new("chapter", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    let mut log = RejectLog::default();

    let fragments = fragment_document(&doc, &FragmentingConfig::default(), Some(&mut log)).unwrap();

    assert_eq!(fragments.len(), 2);
    assert_eq!(fragments[0].text, "ああ、畜生");
    assert_eq!(fragments[0].loc, Some(Loc::Anchor("L1".to_string())));
    assert_eq!(fragments[1].text, "部屋に入った。");
    assert_eq!(fragments[1].loc.as_ref().unwrap().to_string(), "a:L4");
    assert_eq!(log.entries.len(), 1);
    assert_eq!(log.entries[0].1, RejectReason::DanglingCloser);
}

/// Test every sentence of an anchored paragraph shares its anchor and deep link
#[test]
fn test_fragmentDocument_withAnchoredChapter_shouldLocateEverySentence() {
    let html = r#"<div id="novel_honbun">
<p id="L1">「ああ、畜生」</p>
<p id="L2">」と見開いた。</p>
<p id="L3"><ruby>扉<rp>(</rp><rt>とびら</rt><rp>)</rp></ruby>が開いた。誰も来ない。</p>
<p>静かだ。</p>
</div>"#;
    let mut doc = SourceDocument::new("ja/novel/n0001/1", DocumentKind::NovelHtml, html);
    doc.url = Some("https://ncode.example.com/n0001/1/".to_string());

    let fragments = fragment_document(&doc, &FragmentingConfig::default(), None).unwrap();

    let texts: Vec<&str> = fragments.iter().map(|f| f.text.as_str()).collect();
    assert_eq!(texts, vec!["ああ、畜生", "扉が開いた。", "誰も来ない。", "静かだ。"]);
    let locs: Vec<Option<String>> = fragments.iter().map(|f| f.loc.as_ref().map(|l| l.to_string())).collect();
    assert_eq!(
        locs,
        vec![Some("a:L1".to_string()), Some("a:L3".to_string()), Some("a:L3".to_string()), None]
    );

    let link = doc.deep_link(fragments[2].loc.as_ref()).unwrap();
    assert_eq!(link.as_str(), "https://ncode.example.com/n0001/1/#L3");
}

/// Test the bare paragraph scenario without anchors
#[test]
fn test_fragmentDocument_withoutAnchors_shouldHaveNoLocation() {
    let doc = SourceDocument::new("bare", DocumentKind::NovelHtml, "<div><p>「ああ、畜生」</p></div>");
    let fragments = fragment_document(&doc, &FragmentingConfig::default(), None).unwrap();

    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].text, "ああ、畜生");
    assert_eq!(fragments[0].loc, None);
}

/// Test novel chunks keep ruby markup and split at empty paragraphs
#[test]
fn test_chunkDocument_withSampleChapter_shouldSplitAtEmptyParagraph() {
    let doc = SourceDocument::new("chapter", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    let chunks = chunk_document(&doc, &ChunkingConfig::default()).unwrap();

    assert_eq!(chunks.len(), 2);
    assert_eq!(chunks[0].loc, Some(Loc::Anchor("L1".to_string())));
    assert!(chunks[0].html.starts_with("<p id=\"L1\">"));
    assert!(chunks[0].html.contains("<p id=\"L2\">"));
    assert!(chunks[1].html.contains("<ruby>"));
    assert!(chunks[1].html.contains("<rt>へや</rt>"));
    assert!(!chunks[1].text.contains("へや"));
}

/// Test an HTML body without a root element
#[test]
fn test_chunkDocument_withoutRootElement_shouldFail() {
    let doc = SourceDocument::new("empty", DocumentKind::NovelHtml, "just text");
    assert!(matches!(
        chunk_document(&doc, &ChunkingConfig::default()),
        Err(DocumentError::MissingRoot)
    ));
}

/// Test plain text extraction for both kinds
#[test]
fn test_documentPlainText_shouldListLines() {
    let track = SourceDocument::new("sample", DocumentKind::Subtitle, SAMPLE_SRT);
    let text = document_plain_text(&track).unwrap();
    assert!(text.starts_with("おはようございます。\n今日はいい天気ですね。"));

    let chapter = SourceDocument::new("chapter", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    assert_eq!(
        document_plain_text(&chapter).unwrap(),
        "「ああ、畜生」\n」と見開いた。\n部屋に入った。"
    );
}

/// Test deep links into the source
#[test]
fn test_deepLink_withAnchor_shouldSetFragment() {
    let mut doc = SourceDocument::new("chapter", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    doc.url = Some("https://ncode.example.com/n0001/1/".to_string());

    let link = doc.deep_link(Some(&Loc::Anchor("L4".to_string()))).unwrap();
    assert_eq!(link.as_str(), "https://ncode.example.com/n0001/1/#L4");
}
