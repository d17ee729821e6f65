/*!
 * Integration tests for index runs over stored fragments
 */

use anyhow::Result;
use std::sync::Arc;

use shiori::analyzer::{MorphemeAnalyzer, StaticAnalyzer};
use shiori::app_config::Config;
use shiori::app_controller::{Controller, OutputTarget};
use shiori::database::Repository;

use crate::common::{self, morpheme};

fn sample_analyzer() -> StaticAnalyzer {
    StaticAnalyzer::new()
        .with_entry(
            "部屋に入った。",
            vec![
                morpheme("部屋", "ヘヤ", "名詞,普通名詞,一般,*,*,*", 0),
                morpheme("に", "ニ", "助詞,格助詞,*,*,*,*", 2),
                morpheme("入っ", "ハイッ", "動詞,一般,*,*,五段-ラ行,連用形-促音便", 3).with_forms("入る", "入る"),
                morpheme("た", "タ", "助動詞,*,*,*,助動詞-タ,終止形-一般", 5),
                morpheme("。", "。", "補助記号,句点,*,*,*,*", 6),
            ],
        )
        .with_entry(
            "ああ、畜生",
            vec![
                morpheme("ああ", "アア", "感動詞,一般,*,*,*,*", 0),
                morpheme("、", "、", "補助記号,読点,*,*,*,*", 2),
                morpheme("畜生", "チクショウ", "名詞,普通名詞,一般,*,*,*", 3),
            ],
        )
}

/// Test stored fragments become bulk documents with readings and references
#[tokio::test]
async fn test_runIndex_withStoredChapter_shouldWriteBulkDocuments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_chapter_envelope(temp_dir.path(), "ch01.json", "ja/novel/n0001/1", common::SAMPLE_CHAPTER)?;

    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut output = OutputTarget::Database(repo.clone());
    controller.run_fragment(temp_dir.path(), &mut output, false).await?;

    let analyzer = Arc::new(sample_analyzer());
    let mut buffer = Vec::new();
    let summary = controller
        .run_index(&repo, analyzer.clone() as Arc<dyn MorphemeAnalyzer>, &mut buffer)
        .await?;

    assert_eq!(summary.indexed, 2);
    assert_eq!(summary.repetitive, 0);
    assert_eq!(analyzer.call_count(), 2);

    let output = String::from_utf8(buffer)?;
    let lines: Vec<&str> = output.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], r#"{"index":{}}"#);

    let first: serde_json::Value = serde_json::from_str(lines[1])?;
    assert_eq!(first["text"], "ああ、畜生");
    assert_eq!(first["reading"], "ああ、 畜生[ちくしょう]");
    assert_eq!(first["refs"][0]["source"], "ja/novel/n0001/1");
    assert_eq!(first["refs"][0]["url"], "https://ncode.example.com/n0001/1/#L1");

    let second: serde_json::Value = serde_json::from_str(lines[3])?;
    assert_eq!(second["reading"], "部屋[へや]に 入[はい]った。");
    assert_eq!(second["normals"]["入る"]["c"], 1);
    Ok(())
}

/// Test repetitive fragments are left out of the index
#[tokio::test]
async fn test_runIndex_withRepetitiveFragment_shouldSkipIt() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let srt = "1\n00:00:01,000 --> 00:00:02,000\nあばばばばばばばばっ！\n\n2\n00:00:03,000 --> 00:00:04,000\nはい。\n";
    common::create_test_file(temp_dir.path(), "ep.srt", srt)?;

    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut output = OutputTarget::Database(repo.clone());
    controller.run_fragment(temp_dir.path(), &mut output, false).await?;

    let mut buffer = Vec::new();
    let summary = controller
        .run_index(&repo, Arc::new(StaticAnalyzer::new()), &mut buffer)
        .await?;

    assert_eq!(summary.indexed, 1);
    assert_eq!(summary.repetitive, 1);
    let output = String::from_utf8(buffer)?;
    assert!(output.contains("はい。"));
    assert!(!output.contains("あばば"));
    Ok(())
}

/// Test an empty database produces no output
#[tokio::test]
async fn test_runIndex_withEmptyDatabase_shouldWriteNothing() -> Result<()> {
    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut buffer = Vec::new();

    let summary = controller
        .run_index(&repo, Arc::new(StaticAnalyzer::new()), &mut buffer)
        .await?;

    assert_eq!(summary.indexed, 0);
    assert!(buffer.is_empty());
    Ok(())
}
