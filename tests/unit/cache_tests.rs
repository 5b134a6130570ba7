/*!
 * Tests for the word timing cache
 */

use anyhow::Result;
use resegment::cache::{key_for_files, ContentCache, KeyPolicy};
use resegment::words::WordStore;
use crate::common;

#[test]
fn test_cache_scenarioD_missThenHit() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let cache = ContentCache::new(dir.path(), true);
    let words = WordStore::new(common::words_from(common::SAMPLE_TRANSCRIPT, 0.37));

    assert!(cache.get("abc123").is_none());
    cache.put("abc123", &words, "en")?;

    let entry = cache.get("abc123").expect("entry should be cached");
    assert_eq!(entry.words, words);
    assert_eq!(entry.language, "en");
    Ok(())
}

#[test]
fn test_cache_roundTrip_acrossInstances_shouldBeExact() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let words = WordStore::new(common::words_from("one two three", 0.1 + 0.2));

    ContentCache::new(dir.path(), true).put("key", &words, "de")?;
    let reopened = ContentCache::new(dir.path(), true);
    let entry = reopened.get("key").expect("entry should survive a new instance");

    assert_eq!(entry.words, words);
    assert_eq!(entry.key, "key");
    assert!(chrono::DateTime::parse_from_rfc3339(&entry.created_at).is_ok());
    Ok(())
}

#[test]
fn test_cache_unwritableDirectory_shouldBeUnavailable() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let blocker = common::create_test_file(dir.path(), "not_a_dir", "x")?;
    let cache = ContentCache::new(blocker.join("cache"), true);

    assert!(cache.ensure_directory().is_err());
    assert!(cache.put("k", &WordStore::default(), "en").is_err());
    assert!(cache.get("k").is_none());
    Ok(())
}

#[test]
fn test_keyForFiles_sameContent_shouldShareKey() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let a = common::create_test_file(dir.path(), "a.mp4", "identical bytes")?;
    let b = common::create_test_file(dir.path(), "b.mkv", "identical bytes")?;
    let c = common::create_test_file(dir.path(), "c.mp4", "different bytes")?;

    let key = |path: &std::path::Path| tokio_test::block_on(key_for_files(path, None, KeyPolicy::MediaOnly));
    assert_eq!(key(&a)?, key(&b)?);
    assert_ne!(key(&a)?, key(&c)?);
    assert_eq!(key(&a)?.len(), 64);
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cache_concurrentPutsAndGets_shouldNeverExposePartialEntry() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let cache = ContentCache::new(dir.path(), true);
    let words = WordStore::new(common::words_from(&common::SAMPLE_TRANSCRIPT.repeat(40), 0.25));

    let mut writers = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let words = words.clone();
        writers.push(tokio::spawn(async move {
            for _ in 0..5 {
                cache.store("shared", &words, "en").await?;
            }
            Ok::<_, resegment::errors::CacheError>(())
        }));
    }

    let mut readers = Vec::new();
    for _ in 0..4 {
        let cache = cache.clone();
        let words = words.clone();
        readers.push(tokio::task::spawn_blocking(move || {
            for _ in 0..25 {
                match cache.try_get("shared") {
                    Ok(None) => {}
                    Ok(Some(entry)) => assert_eq!(entry.words, words),
                    Err(e) => panic!("reader saw a broken entry: {}", e),
                }
            }
        }));
    }

    for writer in writers {
        writer.await??;
    }
    for reader in readers {
        reader.await?;
    }

    let entry = cache.get("shared").expect("entry should exist after the writers finish");
    assert_eq!(entry.words, words);
    Ok(())
}
