use std::fs;
use std::fs::File;
use std::fmt;
use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{Result, Context, anyhow};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use log::{warn, debug};

// @module: SubRip reading and writing

// @const: SRT timestamp regex, tolerant of '.' separators and single-digit hours
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

// @struct: One subtitle display unit, times in seconds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    // @field: Start time in seconds
    pub start: f64,

    // @field: End time in seconds
    pub end: f64,

    // @field: Subtitle text
    pub text: String,
}

impl Cue {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Spoken word count; unspaced scripts count one word per character
    pub fn word_count(&self) -> usize {
        crate::words::token_spans(&self.text)
            .into_iter()
            .filter(|span| self.text[span.clone()].chars().any(char::is_alphanumeric))
            .count()
    }

    /// Parse an SRT timestamp (HH:MM:SS,mmm) to seconds
    pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
        let parts: Vec<&str> = timestamp.trim().split(&[':', ',', '.'][..]).collect();

        if parts.len() != 4 {
            return Err(anyhow!("Invalid timestamp format: {}", timestamp));
        }

        let hours: u64 = parts[0].parse().context("Failed to parse hours")?;
        let minutes: u64 = parts[1].parse().context("Failed to parse minutes")?;
        let seconds: u64 = parts[2].parse().context("Failed to parse seconds")?;
        let millis: u64 = parts[3].parse().context("Failed to parse milliseconds")?;

        if minutes >= 60 || seconds >= 60 || millis >= 1000 {
            return Err(anyhow!("Invalid time components in timestamp: {}", timestamp));
        }

        let total_ms = hours * 3_600_000 + minutes * 60_000 + seconds * 1_000 + millis;
        Ok(total_ms as f64 / 1000.0)
    }

    /// Format seconds as an SRT timestamp, rounded to the nearest millisecond
    pub fn format_timestamp(seconds: f64) -> String {
        let ms = if seconds.is_finite() && seconds > 0.0 {
            (seconds * 1000.0).round() as u64
        } else {
            0
        };
        let hours = ms / 3_600_000;
        let minutes = (ms % 3_600_000) / 60_000;
        let secs = (ms % 60_000) / 1_000;
        let millis = ms % 1_000;

        format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
    }

    /// Render this cue as a numbered SRT block
    pub fn to_srt_block(&self, index: usize) -> String {
        format!(
            "{}\n{} --> {}\n{}\n\n",
            index,
            Self::format_timestamp(self.start),
            Self::format_timestamp(self.end),
            self.text.trim()
        )
    }
}

/// Collection of cues with the file they belong to
#[derive(Debug, Clone)]
pub struct SubtitleCollection {
    /// Source or destination filename
    pub source_file: PathBuf,

    /// Cues in display order
    pub cues: Vec<Cue>,
}

impl SubtitleCollection {
    pub fn new(source_file: PathBuf, cues: Vec<Cue>) -> Self {
        Self { source_file, cues }
    }

    /// Read and parse an SRT file
    pub fn from_srt_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file: {}", path.display()))?;
        let cues = Self::parse_srt_string(&content)
            .with_context(|| format!("Failed to parse subtitle file: {}", path.display()))?;
        Ok(Self::new(path.to_path_buf(), cues))
    }

    /// Subtitle text joined into one block
    pub fn plain_text(&self) -> String {
        self.cues.iter()
            .map(|cue| cue.text.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Render all cues in SubRip format
    pub fn to_srt_string(&self) -> String {
        self.to_string()
    }

    /// Write subtitles to an SRT file
    pub fn write_to_srt<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
            }
        }

        let file = File::create(path)
            .with_context(|| format!("Failed to create subtitle file: {}", path.display()))?;
        let mut writer = BufWriter::new(file);
        write!(writer, "{}", self)?;
        writer.flush()?;

        debug!("Wrote {} cues to {}", self.cues.len(), path.display());
        Ok(())
    }

    /// Parse SRT format string into cues
    pub fn parse_srt_string(content: &str) -> Result<Vec<Cue>> {
        let content = content.trim_start_matches('\u{feff}');
        let mut cues = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(f64, f64)> = None;
        let mut current_text = String::new();

        let mut add_current_entry = |seq_num: usize, start: f64, end: f64, text: &str| {
            let text = text.trim();
            if text.is_empty() {
                warn!("Skipping empty subtitle entry {}", seq_num);
            } else if end <= start {
                warn!("Skipping subtitle entry {} with invalid time range", seq_num);
            } else {
                cues.push(Cue::new(start, end, text));
            }
        };

        for (line_no, line) in content.lines().enumerate() {
            let trimmed = line.trim();

            if trimmed.is_empty() {
                if let (Some(seq_num), Some((start, end))) = (current_seq_num, current_times) {
                    if !current_text.is_empty() {
                        add_current_entry(seq_num, start, end, &current_text);
                        current_seq_num = None;
                        current_times = None;
                        current_text.clear();
                    }
                }
                continue;
            }

            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_none() {
                if let Some(caps) = TIMESTAMP_REGEX.captures(trimmed) {
                    current_times = Some((Self::captured_seconds(&caps, 1), Self::captured_seconds(&caps, 5)));
                    continue;
                }
            }

            if current_seq_num.is_some() && current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_no + 1, trimmed);
            }
        }

        if let (Some(seq_num), Some((start, end))) = (current_seq_num, current_times) {
            if !current_text.is_empty() {
                add_current_entry(seq_num, start, end, &current_text);
            }
        }

        if cues.is_empty() {
            return Err(anyhow!("No valid subtitle entries were found in the SRT content"));
        }

        cues.sort_by(|a, b| a.start.total_cmp(&b.start));
        Ok(cues)
    }

    fn captured_seconds(caps: &regex::Captures, start_idx: usize) -> f64 {
        let part = |i: usize| -> u64 {
            caps.get(start_idx + i).map_or(0, |m| m.as_str().parse().unwrap_or(0))
        };
        let ms = (part(0) * 3600 + part(1) * 60 + part(2)) * 1000 + part(3);
        ms as f64 / 1000.0
    }
}

impl fmt::Display for SubtitleCollection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, cue) in self.cues.iter().enumerate() {
            write!(f, "{}", cue.to_srt_block(i + 1))?;
        }
        Ok(())
    }
}
