/*!
 * Integration tests for fragment and chunk runs
 */

use anyhow::Result;
use std::fs::{self, File};

use shiori::app_config::Config;
use shiori::app_controller::{Controller, OutputTarget};
use shiori::database::{ProcessingStage, Repository};
use shiori::document::Loc;

use crate::common;

/// Test fragments of a folder of envelopes are stored with their locations
#[tokio::test]
async fn test_runFragment_withDatabase_shouldStoreSourcesAndHits() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_subtitle_envelope(temp_dir.path(), "drama/ep01.json", "ja/drama/ep01", common::SAMPLE_SRT)?;
    common::create_chapter_envelope(temp_dir.path(), "novel/ch01.json", "ja/novel/n0001/1", common::SAMPLE_CHAPTER)?;

    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut output = OutputTarget::Database(repo.clone());

    let summary = controller.run_fragment(temp_dir.path(), &mut output, false).await?;

    assert_eq!(summary.processed, 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.items, 5);

    let stats = repo.stats()?;
    assert_eq!(stats.source_count, 2);
    assert_eq!(stats.fragment_count, 5);
    assert_eq!(stats.hit_count, 5);

    let fragments = repo.fragments_with_refs(20, 0).await?;
    let anchored = fragments
        .iter()
        .find(|f| f.fragment.text == "部屋に入った。")
        .expect("chapter fragment should be stored");
    assert_eq!(anchored.refs[0].source_key, "ja/novel/n0001/1");
    assert_eq!(anchored.refs[0].loc, Some(Loc::Anchor("L4".to_string())));
    assert_eq!(anchored.refs[0].tags, "novel");
    Ok(())
}

/// Test unchanged documents are skipped unless forced
#[tokio::test]
async fn test_runFragment_calledTwice_shouldSkipUnchangedDocuments() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = common::create_subtitle_envelope(temp_dir.path(), "ep01.json", "ja/drama/ep01", common::SAMPLE_SRT)?;

    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut output = OutputTarget::Database(repo.clone());

    controller.run_fragment(&path, &mut output, false).await?;
    let second = controller.run_fragment(&path, &mut output, false).await?;
    assert_eq!(second.processed, 0);
    assert_eq!(second.skipped, 1);

    let forced = controller.run_fragment(&path, &mut output, true).await?;
    assert_eq!(forced.processed, 1);
    assert_eq!(repo.stats()?.hit_count, 3);

    // Chunks have their own hash, so the first chunk run still processes the document
    let chunked = controller.run_chunk(&path, &mut output, false).await?;
    assert_eq!(chunked.processed, 1);
    assert_eq!(
        repo.source_hash("ja/drama/ep01", ProcessingStage::Chunks).await?,
        repo.source_hash("ja/drama/ep01", ProcessingStage::Fragments).await?
    );
    Ok(())
}

/// Test a changed body is reprocessed and old occurrences are replaced
#[tokio::test]
async fn test_runFragment_withChangedBody_shouldReplaceHits() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let repo = Repository::new_in_memory()?;
    let mut output = OutputTarget::Database(repo.clone());

    let path = common::create_subtitle_envelope(temp_dir.path(), "ep01.json", "ja/drama/ep01", common::SAMPLE_SRT)?;
    controller.run_fragment(&path, &mut output, false).await?;

    let revised = "1\n00:00:01,000 --> 00:00:02,000\nさようなら。\n";
    common::create_subtitle_envelope(temp_dir.path(), "ep01.json", "ja/drama/ep01", revised)?;
    let summary = controller.run_fragment(&path, &mut output, false).await?;

    assert_eq!(summary.processed, 1);
    let stats = repo.stats()?;
    assert_eq!(stats.source_count, 1);
    assert_eq!(stats.hit_count, 1);
    assert_eq!(stats.fragment_count, 1);

    let fragments = repo.fragments_with_refs(20, 0).await?;
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].fragment.text, "さようなら。");
    assert_eq!(fragments[0].refs[0].loc, Some(Loc::Time { start_ms: 1000, end_ms: 2000 }));
    Ok(())
}

/// Test chunks written as JSON lines
#[tokio::test]
async fn test_runChunk_withJsonLines_shouldWriteOneObjectPerChunk() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "chapter.html", common::SAMPLE_CHAPTER)?;
    let output_path = temp_dir.path().join("chunks.jsonl");

    let controller = Controller::with_config(Config::default())?;
    let mut output = OutputTarget::JsonLines(Box::new(File::create(&output_path)?));
    let summary = controller.run_chunk(&input, &mut output, false).await?;
    drop(output);

    assert_eq!(summary.items, 2);
    let content = fs::read_to_string(&output_path)?;
    let lines: Vec<serde_json::Value> = content
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["source"], "chapter");
    assert_eq!(lines[0]["seq"], 0);
    assert_eq!(lines[0]["loc"], "a:L1");
    assert!(lines[1]["html"].as_str().unwrap().contains("<ruby>"));
    Ok(())
}

/// Test a broken document is counted without stopping the batch
#[tokio::test]
async fn test_runFragment_withBrokenDocument_shouldContinue() -> Result<()> {
    common::init_test_logging();
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "a_broken.srt", "1\nnot a timing line\nはい\n")?;
    common::create_test_file(temp_dir.path(), "b_good.srt", common::SAMPLE_SRT)?;
    let output_path = temp_dir.path().join("fragments.jsonl");

    let controller = Controller::with_config(Config::default())?;
    let mut output = OutputTarget::JsonLines(Box::new(File::create(&output_path)?));
    let summary = controller.run_fragment(temp_dir.path(), &mut output, false).await?;
    drop(output);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.processed, 1);
    let content = fs::read_to_string(&output_path)?;
    assert_eq!(content.lines().count(), 3);
    assert!(content.contains(r#""loc":"t:1.000-3.000""#));
    Ok(())
}

/// Test plain text output for a folder
#[test]
fn test_runText_withSubtitleFile_shouldPrintCueLines() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    common::create_test_file(temp_dir.path(), "ep01.srt", common::SAMPLE_SRT)?;

    let controller = Controller::with_config(Config::default())?;
    let text = controller.run_text(temp_dir.path())?;

    assert_eq!(text.lines().next(), Some("おはようございます。"));
    assert!(text.contains("そうですね。"));
    Ok(())
}

/// Test an empty input folder is an error
#[test]
fn test_runChunk_withEmptyFolder_shouldFail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = Controller::with_config(Config::default())?;
    let mut output = OutputTarget::Database(Repository::new_in_memory()?);

    let result = tokio_test::block_on(async { controller.run_chunk(temp_dir.path(), &mut output, false).await });
    assert!(result.is_err());
    Ok(())
}
