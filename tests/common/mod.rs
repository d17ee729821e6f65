/*!
 * Common test utilities for the shiori test suite
 */

use anyhow::Result;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use shiori::morpheme::MorphemeRecord;

/// Routes library logs to the test output, once per test binary
pub fn init_test_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Two Japanese cues separated by a short pause, then one after a long pause
pub const SAMPLE_SRT: &str = "1
00:00:01,000 --> 00:00:03,000
おはようございます。

2
00:00:03,500 --> 00:00:05,000
今日はいい天気ですね。

3
00:00:20,000 --> 00:00:22,000
♪～

4
00:00:30,000 --> 00:00:32,000
そうですね。
";

/// A chapter with anchored paragraphs, a blank separator and ruby
pub const SAMPLE_CHAPTER: &str = r#"<div id="novel_honbun">
<p id="L1">「ああ、畜生」</p>
<p id="L2">」と見開いた。</p>
<p id="L3"><br></p>
<p id="L4"><ruby>部屋<rp>(</rp><rt>へや</rt><rp>)</rp></ruby>に入った。</p>
</div>"#;

/// Creates a JSON document envelope for a subtitle track
pub fn create_subtitle_envelope(dir: &Path, filename: &str, key: &str, srt: &str) -> Result<PathBuf> {
    let envelope = serde_json::json!({
        "key": key,
        "type": "application/x-subrip",
        "title": "テストドラマ 第1話",
        "url": "https://example.com/drama/1",
        "text": srt,
    });
    create_test_file(dir, filename, &envelope.to_string())
}

/// Creates a JSON document envelope for a novel chapter
pub fn create_chapter_envelope(dir: &Path, filename: &str, key: &str, html: &str) -> Result<PathBuf> {
    let envelope = serde_json::json!({
        "key": key,
        "type": "text/html",
        "title": "テスト小説 第一話",
        "url": "https://ncode.example.com/n0001/1/",
        "text": html,
    });
    create_test_file(dir, filename, &envelope.to_string())
}

/// Builds a morpheme with a character span
pub fn morpheme(surface: &str, reading: &str, pos: &str, begin: usize) -> MorphemeRecord {
    let end = begin + surface.chars().count();
    MorphemeRecord::new(surface, reading, pos).with_span(begin..end)
}
