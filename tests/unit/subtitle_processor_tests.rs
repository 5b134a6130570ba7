/*!
 * Tests for SubRip reading and writing
 */

use anyhow::Result;
use resegment::subtitle_processor::{Cue, SubtitleCollection};
use resegment::words::WordStore;
use crate::common;

#[test]
fn test_fromSrtFile_sampleFile_shouldParseAllCues() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(dir.path(), "sample.srt")?;

    let collection = SubtitleCollection::from_srt_file(&path)?;
    assert_eq!(collection.cues.len(), 3);
    assert_eq!(collection.cues[1].start, 5.0);
    assert_eq!(collection.cues[2].text, "For testing purposes.");
    assert_eq!(
        collection.plain_text(),
        "This is a test subtitle. It contains multiple entries. For testing purposes."
    );
    Ok(())
}

#[test]
fn test_writeToSrt_thenRead_shouldKeepMillisecondTimes() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = dir.path().join("nested").join("out.srt");
    let cues = vec![Cue::new(0.0004, 1.2346, "First."), Cue::new(61.5, 3725.125, "Second\nline.")];

    SubtitleCollection::new(path.clone(), cues).write_to_srt(&path)?;
    let reread = SubtitleCollection::from_srt_file(&path)?;

    assert_eq!(reread.cues.len(), 2);
    assert_eq!(reread.cues[0].start, 0.0);
    assert_eq!(reread.cues[0].end, 1.235);
    assert_eq!(reread.cues[1].end, 3725.125);
    assert_eq!(reread.cues[1].text, "Second\nline.");
    Ok(())
}

#[test]
fn test_cueWordCount_shouldIgnorePunctuationAndCountIdeographs() {
    assert_eq!(Cue::new(0.0, 1.0, "Hello , world !").word_count(), 2);
    assert_eq!(Cue::new(0.0, 1.0, "我爱猫。").word_count(), 3);
}

#[test]
fn test_wordStoreFromCues_shouldStayInsideEachCue() -> Result<()> {
    let dir = common::create_temp_dir()?;
    let path = common::create_test_subtitle(dir.path(), "sample.srt")?;
    let collection = SubtitleCollection::from_srt_file(&path)?;

    let words = WordStore::from_cues(&collection.cues);
    assert_eq!(words.len(), 12);
    assert_eq!(words.words()[0].start, 1.0);
    assert!(words.iter().all(|w| w.start < w.end));
    assert!(words.words()[4].end <= 4.0 + 1e-9);
    assert_eq!(words.words()[5].start, 5.0);
    Ok(())
}
