/*!
 * Tests for storing fragments of changing sources
 */

use anyhow::Result;

use shiori::app_config::FragmentingConfig;
use shiori::database::Repository;
use shiori::document::{fragment_document, DocumentKind, Loc, SourceDocument};

use crate::common::SAMPLE_CHAPTER;

/// Test a changed body leaves no fragment behind that only the old body had
#[tokio::test]
async fn test_storeSourceFragments_withChangedChapter_shouldIndexOnlyCurrentText() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let config = FragmentingConfig::default();

    let old = SourceDocument::new("ja/novel/n0001/1", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    repo.store_source_fragments(&old, &fragment_document(&old, &config, None)?)
        .await?;

    let revised = r#"<div><p id="L1">「ああ、畜生」</p><p id="L2">窓を開けた。</p></div>"#;
    let new = SourceDocument::new("ja/novel/n0001/1", DocumentKind::NovelHtml, revised);
    let summary = repo
        .store_source_fragments(&new, &fragment_document(&new, &config, None)?)
        .await?;

    assert_eq!(summary.removed_fragments, 1);
    assert!(repo.get_fragment("部屋に入った。").await?.is_none());

    let fragments = repo.fragments_with_refs(20, 0).await?;
    let texts: Vec<&str> = fragments.iter().map(|f| f.fragment.text.as_str()).collect();
    assert_eq!(texts, vec!["ああ、畜生", "窓を開けた。"]);
    assert_eq!(fragments[1].refs.len(), 1);
    assert_eq!(fragments[1].refs[0].loc, Some(Loc::Anchor("L2".to_string())));
    Ok(())
}

/// Test a fragment another source still uses survives the change
#[tokio::test]
async fn test_storeSourceFragments_withSharedText_shouldKeepOtherSourceRefs() -> Result<()> {
    let repo = Repository::new_in_memory()?;
    let config = FragmentingConfig::default();

    let first = SourceDocument::new("a", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    let second = SourceDocument::new("b", DocumentKind::NovelHtml, SAMPLE_CHAPTER);
    for doc in [&first, &second] {
        repo.store_source_fragments(doc, &fragment_document(doc, &config, None)?)
            .await?;
    }

    let emptied = SourceDocument::new("a", DocumentKind::NovelHtml, "<div><p></p></div>");
    let summary = repo.store_source_fragments(&emptied, &[]).await?;

    assert_eq!(summary.removed_fragments, 0);
    let fragments = repo.fragments_with_refs(20, 0).await?;
    assert_eq!(fragments.len(), 2);
    assert!(fragments.iter().all(|f| f.total_refs == 1 && f.refs[0].source_key == "b"));
    Ok(())
}
