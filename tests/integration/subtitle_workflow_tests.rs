/*!
 * Integration tests for subtitle-only jobs
 */

use anyhow::Result;
use std::sync::Arc;

use resegment::cache::ContentCache;
use resegment::file_utils::FileManager;
use resegment::providers::mock::MockProvider;
use resegment::session::{CancellationFlag, JobMode, JobStatus, SessionController};
use resegment::subtitle_processor::SubtitleCollection;
use crate::common;

/// Resplit an existing SRT file and write the result next to it
#[test]
fn test_subtitleWorkflow_withLlm_shouldWriteSplitFile() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(dir.path(), "show.srt")?;
    let controller = SessionController::new(common::test_config())
        .with_cache(ContentCache::disabled())
        .with_llm_client(Arc::new(MockProvider::working()));

    let request = controller.request_for_file(&input)?;
    let outcome = tokio_test::block_on(controller.run(&request, None, &CancellationFlag::new()))?;

    assert_eq!(outcome.mode, JobMode::SubtitleOnly);
    assert_eq!(outcome.status(), JobStatus::Success);
    assert_eq!(outcome.cues.len(), 3);
    assert_eq!(outcome.cues[0].start, 1.0);
    assert!(outcome.cues[2].end <= 14.0 + 1e-9);

    let output = controller.output_path(&request, outcome.mode, None).expect("request has an input path");
    assert_eq!(output, dir.path().join("show_llm_split.srt"));
    controller.write_srt(&outcome, &output)?;

    let reread = SubtitleCollection::from_srt_file(&output)?;
    assert_eq!(reread.plain_text(), SubtitleCollection::from_srt_file(&input)?.plain_text());
    Ok(())
}

/// Without an LLM the same file goes through the rule-based segmenter
#[test]
fn test_subtitleWorkflow_withoutLlm_shouldUseRuleSuffix() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(dir.path(), "show.srt")?;
    let out_dir = dir.path().join("out");
    let controller = SessionController::new(common::test_config()).with_cache(ContentCache::disabled());

    let request = controller.request_for_file(&input)?;
    let outcome = tokio_test::block_on(controller.run(&request, None, &CancellationFlag::new()))?;
    assert_eq!(outcome.mode, JobMode::RuleBased);

    let output = controller
        .output_path(&request, outcome.mode, Some(&out_dir))
        .expect("request has an input path");
    controller.write_srt(&outcome, &output)?;

    assert!(FileManager::file_exists(out_dir.join("show_rule_split.srt")));
    let content = FileManager::read_to_string(&output)?;
    assert!(content.starts_with("1\n00:00:01,000 --> "));
    Ok(())
}

#[test]
fn test_requestForFile_unknownType_shouldFail() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let notes = common::create_test_file(dir.path(), "notes.txt", "not subtitles")?;
    let controller = SessionController::new(common::test_config()).with_cache(ContentCache::disabled());

    assert!(controller.request_for_file(&notes).is_err());
    assert!(controller.request_for_file(dir.path().join("missing.srt")).is_err());
    Ok(())
}
