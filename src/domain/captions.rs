//! Caption payloads and their SubRip rendering.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Cue length used when the last word of a block carries no end time.
pub const DEFAULT_CUE_SECONDS: f64 = 0.5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptionWord {
    #[serde(alias = "word")]
    pub text: String,
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
    #[serde(default)]
    pub highlight: bool,
}

/// One on-screen line worth of words, in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptionBlock {
    #[serde(default)]
    pub words: Vec<CaptionWord>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

impl SubtitleCue {
    /// Derive a cue from a block, `None` when the block has no words.
    pub fn from_block(index: usize, block: &CaptionBlock) -> Option<Self> {
        let first = block.words.first()?;
        let last = block.words.last()?;

        let start = first.start;
        let end = last.end.unwrap_or(start + DEFAULT_CUE_SECONDS);
        let text = block
            .words
            .iter()
            .map(|word| {
                if word.highlight {
                    word.text.to_uppercase()
                } else {
                    word.text.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        Some(Self {
            index,
            start,
            end,
            text,
        })
    }
}

impl fmt::Display for SubtitleCue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(
            f,
            "{} --> {}",
            format_timestamp(self.start),
            format_timestamp(self.end)
        )?;
        writeln!(f, "{}", self.text)?;
        writeln!(f)
    }
}

/// Cues for every non-empty block, numbered from 1 without gaps.
pub fn build_cues(blocks: &[CaptionBlock]) -> Vec<SubtitleCue> {
    blocks
        .iter()
        .filter(|block| !block.words.is_empty())
        .enumerate()
        .filter_map(|(i, block)| SubtitleCue::from_block(i + 1, block))
        .collect()
}

/// Render `blocks` as a SubRip document.
pub fn to_srt(blocks: &[CaptionBlock]) -> String {
    build_cues(blocks)
        .iter()
        .map(ToString::to_string)
        .collect()
}

pub async fn write_srt(blocks: &[CaptionBlock], path: &Path) -> std::io::Result<usize> {
    let document = to_srt(blocks);
    tokio::fs::write(path, document.as_bytes()).await?;
    Ok(document.len())
}

/// `HH:MM:SS,mmm`, rounded to the nearest millisecond.
pub fn format_timestamp(seconds: f64) -> String {
    let millis = if seconds.is_finite() && seconds > 0.0 {
        (seconds * 1000.0).round() as u64
    } else {
        0
    };

    let hours = millis / 3_600_000;
    let minutes = (millis % 3_600_000) / 60_000;
    let secs = (millis % 60_000) / 1000;
    let ms = millis % 1000;
    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, ms)
}
