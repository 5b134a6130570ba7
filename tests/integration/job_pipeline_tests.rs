/*!
 * Integration tests running whole jobs through the session controller
 */

use anyhow::Result;
use parking_lot::Mutex;
use std::sync::Arc;

use resegment::cache::ContentCache;
use resegment::errors::ResegmentError;
use resegment::file_utils::FileManager;
use resegment::providers::mock::MockProvider;
use resegment::session::{
    CancellationFlag, EventCallback, JobEvent, JobMode, JobRequest, JobStatus, SessionController,
};
use resegment::subtitle_processor::SubtitleCollection;
use crate::common::{self, FixtureRecognizer};

const SUBTITLE: &str = "1
00:00:00,000 --> 00:00:04,000
The quick brown fox jumps.

2
00:00:04,000 --> 00:00:08,000
It was late so we left. We all went home.
";

/// Recognizer output with a few misheard words
fn misheard_words() -> Vec<resegment::words::Word> {
    common::words_from("the quick bown fox jumps. it was late so we left we all went home", 0.5)
}

#[tokio::test]
async fn test_mediaWithSubtitle_shouldKeepSubtitleTextAndCacheWords() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let media = common::create_test_file(dir.path(), "talk.mp4", "fake media bytes")?;
    common::create_test_file(dir.path(), "talk.srt", SUBTITLE)?;

    let recognizer = FixtureRecognizer::new(misheard_words());
    let mock = MockProvider::working();
    let controller = SessionController::new(common::test_config())
        .with_cache(ContentCache::new(dir.path().join("cache"), true))
        .with_recognizer(Arc::new(recognizer.clone()))
        .with_llm_client(Arc::new(mock.clone()));

    let request = controller.request_for_file(&media)?;
    assert_eq!(controller.select_mode(&request)?, JobMode::MediaWithSubtitle);

    let outcome = controller.run(&request, None, &CancellationFlag::new()).await?;
    assert_eq!(outcome.status(), JobStatus::Success);
    assert_eq!(outcome.language, "en");
    let texts: Vec<&str> = outcome.cues.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["The quick brown fox jumps.", "It was late so we left.", "We all went home."]);
    assert!(mock.prompts()[0].contains("The quick brown fox jumps."));

    let output = controller.output_path(&request, outcome.mode, None).expect("request has an input path");
    assert_eq!(output, dir.path().join("talk_llm_smart.srt"));
    controller.write_srt(&outcome, &output)?;
    let written = SubtitleCollection::parse_srt_string(&FileManager::read_to_string(&output)?)?;
    assert_eq!(written.len(), 3);

    let again = controller.run(&request, None, &CancellationFlag::new()).await?;
    assert!(again.summary.cache_hit);
    assert_eq!(recognizer.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_multiChunkJob_failedChunk_shouldBePartial() -> Result<()> {
    let mut config = common::test_config();
    config.segmentation.max_chunk_size = 6;
    let mock = MockProvider::intermittent(2);
    let controller = SessionController::new(config)
        .with_cache(ContentCache::disabled())
        .with_recognizer(Arc::new(FixtureRecognizer::new(common::words_from(common::SAMPLE_TRANSCRIPT, 0.5))))
        .with_llm_client(Arc::new(mock.clone()));

    let outcome = controller
        .run(&JobRequest::media("talk.mp4"), None, &CancellationFlag::new())
        .await?;

    assert_eq!(mock.request_count(), 3);
    assert_eq!(outcome.summary.total_chunks, 3);
    assert_eq!(outcome.summary.llm_chunks, 2);
    assert_eq!(outcome.summary.fallback_chunks, 1);
    assert_eq!(outcome.status(), JobStatus::Partial);
    assert_eq!(outcome.cues.len(), 3);
    assert_eq!(outcome.cues[1].text, "It was late so we left.");
    for pair in outcome.cues.windows(2) {
        assert!(pair[0].end <= pair[1].start);
    }
    Ok(())
}

#[tokio::test]
async fn test_cancelBetweenChunks_shouldStopTheJob() {
    let mut config = common::test_config();
    config.segmentation.max_chunk_size = 6;
    let mock = MockProvider::working();
    let controller = SessionController::new(config)
        .with_cache(ContentCache::disabled())
        .with_recognizer(Arc::new(FixtureRecognizer::new(common::words_from(common::SAMPLE_TRANSCRIPT, 0.5))))
        .with_llm_client(Arc::new(mock.clone()));

    let cancel = CancellationFlag::new();
    let trigger = cancel.clone();
    let events: EventCallback = Arc::new(move |event: &JobEvent| {
        if matches!(event, JobEvent::ChunkFinished { index: 0, .. }) {
            trigger.cancel();
        }
    });

    let result = controller.run(&JobRequest::media("talk.mp4"), Some(events), &cancel).await;

    assert!(matches!(result, Err(ResegmentError::Cancelled)));
    assert_eq!(mock.request_count(), 1);
}

#[tokio::test]
async fn test_events_shouldReportCacheMissAndChunks() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let media = common::create_test_file(dir.path(), "clip.mkv", "other fake media")?;
    let seen: Arc<Mutex<Vec<JobEvent>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let events: EventCallback = Arc::new(move |event: &JobEvent| sink.lock().push(event.clone()));

    let controller = SessionController::new(common::test_config())
        .with_cache(ContentCache::new(dir.path().join("cache"), true))
        .with_recognizer(Arc::new(FixtureRecognizer::new(common::words_from(common::SAMPLE_TRANSCRIPT, 0.5))));

    let outcome = controller
        .run(&JobRequest::media(&media), Some(events), &CancellationFlag::new())
        .await?;
    assert_eq!(outcome.mode, JobMode::RuleBased);

    let events = seen.lock();
    assert!(events.iter().any(|e| matches!(e, JobEvent::CacheMiss { .. })));
    assert!(events.iter().any(|e| matches!(e, JobEvent::Recognized { words: 15, .. })));
    assert!(events.iter().any(|e| matches!(e, JobEvent::ChunkFinished { used_llm: false, .. })));
    assert!(!events.iter().any(|e| matches!(e, JobEvent::LlmFragment { .. })));
    Ok(())
}

#[tokio::test]
async fn test_recognizerFindsNothing_shouldFailWithNoSpeech() {
    let controller = SessionController::new(common::test_config())
        .with_cache(ContentCache::disabled())
        .with_recognizer(Arc::new(FixtureRecognizer::new(Vec::new())));

    let result = controller
        .run(&JobRequest::media("silence.wav"), None, &CancellationFlag::new())
        .await;

    assert!(matches!(result, Err(ResegmentError::Recognition(_))));
}
