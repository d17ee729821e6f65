use regex::Regex;
use once_cell::sync::Lazy;
use anyhow::{anyhow, Result};
use log::{warn, debug};

use crate::app_config::ChunkingConfig;
use crate::char_class::meaty_char_count;
use crate::chunk_partitioner::{partition, Partitionable, CONTINUATION_GAP_WEIGHT};
use crate::document::{escape_html, format_seconds, Chunk, Fragment, Loc};
use crate::errors::DocumentError;
use crate::sentence_splitter::{split_and_clean, RejectSink, SplitterRules};

// @module: Subtitle parsing, fragmenting and chunking

// @const: SRT timing line regex, comma or dot before milliseconds
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d{1,2}):(\d{2}):(\d{2})[,.](\d{3})")
        .expect("timestamp regex is valid")
});

/// Glyphs marking that a cue's sentence continues in the next cue
pub const CONTINUATION_CHARS: &[char] = &['→', '➡'];

// @struct: Single subtitle cue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    // @field: Sequence number
    pub seq_num: usize,

    // @field: Start time in ms
    pub start_time_ms: u64,

    // @field: End time in ms
    pub end_time_ms: u64,

    // @field: Cue text, lines joined by '\n'
    pub content: String,
}

impl SubtitleCue {
    pub fn new(seq_num: usize, start_time_ms: u64, end_time_ms: u64, content: impl Into<String>) -> Self {
        SubtitleCue {
            seq_num,
            start_time_ms,
            end_time_ms,
            content: content.into(),
        }
    }

    // @creates: Validated subtitle cue
    // @validates: Time range and non-empty text
    pub fn new_validated(seq_num: usize, start_time_ms: u64, end_time_ms: u64, content: String) -> Result<Self> {
        if end_time_ms < start_time_ms {
            return Err(anyhow!(
                "Invalid time range: end time {} < start time {}",
                end_time_ms, start_time_ms
            ));
        }

        let trimmed = content.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("Empty subtitle text for cue {}", seq_num));
        }

        Ok(SubtitleCue {
            seq_num,
            start_time_ms,
            end_time_ms,
            content: trimmed.to_string(),
        })
    }

    /// True when the trimmed content ends in a continuation glyph
    pub fn continues(&self) -> bool {
        self.content.trim().ends_with(CONTINUATION_CHARS)
    }

    /// Content on one line, with continuation glyphs and carriage returns removed
    pub fn single_line(&self) -> String {
        self.content
            .trim()
            .trim_end_matches(CONTINUATION_CHARS)
            .replace('\r', "")
            .replace('\n', " ")
            .trim()
            .to_string()
    }

    pub fn meaty_chars(&self) -> usize {
        meaty_char_count(&self.content)
    }
}

impl Partitionable for SubtitleCue {
    fn size(&self) -> usize {
        self.meaty_chars()
    }

    fn gap_weight(&self, next: &Self) -> Option<i64> {
        if self.continues() {
            Some(CONTINUATION_GAP_WEIGHT)
        } else {
            Some(next.start_time_ms as i64 - self.end_time_ms as i64)
        }
    }
}

/// Opening and closing marks of subtitle asides
const ASIDE_PARENS: &[(char, char)] = &[('（', '）'), ('(', ')')];

/// Remove `（…）` and `(…)` asides from subtitle text. Nested asides are removed
/// whole; a closer with no matching opener is dropped, and an aside left open
/// runs to the end of the text.
pub fn remove_parenthesized(text: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut result = String::with_capacity(text.len());

    for c in text.chars() {
        if let Some(&(_, close)) = ASIDE_PARENS.iter().find(|(o, _)| *o == c) {
            open.push(close);
        } else if open.last() == Some(&c) {
            open.pop();
        } else if ASIDE_PARENS.iter().any(|&(o, cl)| o == c || cl == c) {
            continue;
        } else if open.is_empty() {
            result.push(c);
        }
    }

    result.trim().to_string()
}

/// Ordered cues of one subtitle track
#[derive(Debug, Clone, Default)]
pub struct SubtitleTrack {
    pub cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn new(cues: Vec<SubtitleCue>) -> Self {
        Self { cues }
    }

    /// Parse SRT content into a track. A timing line that cannot be read makes the
    /// whole document malformed; individual cues with bad ranges are skipped.
    pub fn parse_srt_string(content: &str) -> Result<Self, DocumentError> {
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);
        let mut cues = Vec::new();

        // State variables for parsing
        let mut current_seq_num: Option<usize> = None;
        let mut current_times: Option<(u64, u64)> = None;
        let mut current_text = String::new();

        for (line_idx, line) in content.lines().enumerate() {
            let line_number = line_idx + 1;
            let trimmed = line.trim();

            // Blank line closes the current cue
            if trimmed.is_empty() {
                if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
                    if current_text.is_empty() {
                        warn!("Skipping empty subtitle cue {}", seq_num);
                    } else {
                        push_cue(&mut cues, seq_num, start_ms, end_ms, &current_text);
                    }
                    current_seq_num = None;
                    current_times = None;
                    current_text.clear();
                }
                continue;
            }

            // Sequence number, only when starting a new cue
            if current_seq_num.is_none() && current_text.is_empty() {
                if let Ok(num) = trimmed.parse::<usize>() {
                    current_seq_num = Some(num);
                    continue;
                }
            }

            // Timing line
            if current_seq_num.is_some() && current_times.is_none() {
                let caps = TIMESTAMP_REGEX.captures(trimmed).ok_or_else(|| {
                    DocumentError::MalformedTimestamp {
                        line: line_number,
                        content: trimmed.to_string(),
                    }
                })?;
                let start_ms = parse_timestamp_to_ms(&caps, 1);
                let end_ms = parse_timestamp_to_ms(&caps, 5);
                match (start_ms, end_ms) {
                    (Some(start_ms), Some(end_ms)) => {
                        current_times = Some((start_ms, end_ms));
                        continue;
                    }
                    _ => {
                        return Err(DocumentError::MalformedTimestamp {
                            line: line_number,
                            content: trimmed.to_string(),
                        });
                    }
                }
            }

            if current_times.is_some() {
                if !current_text.is_empty() {
                    current_text.push('\n');
                }
                current_text.push_str(trimmed);
            } else {
                warn!("Unexpected text at line {} before sequence number or timestamp: {}", line_number, trimmed);
            }
        }

        if let (Some(seq_num), Some((start_ms, end_ms))) = (current_seq_num, current_times) {
            if !current_text.is_empty() {
                push_cue(&mut cues, seq_num, start_ms, end_ms, &current_text);
            }
        }

        if cues.is_empty() {
            warn!("No valid subtitle cues found in content");
            return Err(DocumentError::NoCues);
        }

        cues.sort_by_key(|cue| cue.start_time_ms);

        let overlap_count = cues
            .windows(2)
            .filter(|pair| pair[0].end_time_ms > pair[1].start_time_ms)
            .count();
        if overlap_count > 0 {
            debug!("Found {} overlapping subtitle cues", overlap_count);
        }

        for (i, cue) in cues.iter_mut().enumerate() {
            cue.seq_num = i + 1;
        }

        Ok(Self { cues })
    }

    /// Cleaned sentences of the track. Cues without meaty characters are dropped and
    /// cues ending in a continuation glyph are merged with the following ones; every
    /// fragment carries the time range of the cues it came from.
    pub fn fragments(&self, rules: &SplitterRules, mut sink: Option<&mut dyn RejectSink>) -> Vec<Fragment> {
        let cues: Vec<&SubtitleCue> = self.cues.iter().filter(|cue| cue.meaty_chars() > 0).collect();

        let mut fragments = Vec::new();
        let mut pending: Vec<&SubtitleCue> = Vec::new();
        for (idx, cue) in cues.iter().enumerate() {
            pending.push(cue);
            if cue.continues() && idx + 1 < cues.len() {
                continue;
            }

            let line = pending
                .iter()
                .map(|c| c.single_line())
                .collect::<Vec<_>>()
                .join(" ");
            let loc = Loc::Time {
                start_ms: pending[0].start_time_ms,
                end_ms: cue.end_time_ms,
            };

            for text in split_and_clean(&line, rules, sink.as_deref_mut()) {
                fragments.push(Fragment::new(text, Some(loc.clone())));
            }
            pending.clear();
        }

        fragments
    }

    /// Display chunks, split at long pauses and bounded by meaty character count
    pub fn chunks(&self, config: &ChunkingConfig) -> Vec<Chunk> {
        let groups = partition(&self.cues, &config.subtitle_limits());

        let covered: usize = groups.iter().map(|g| g.len()).sum();
        if covered != self.cues.len() {
            debug!("{} oversized cues left out of chunks", self.cues.len() - covered);
        }

        groups.into_iter().map(subtitle_chunk).collect()
    }

    /// Plain text of the track, one cue per line, with parenthesized asides removed
    pub fn plain_text(&self) -> String {
        self.cues
            .iter()
            .map(|cue| remove_parenthesized(&cue.single_line()))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn push_cue(cues: &mut Vec<SubtitleCue>, seq_num: usize, start_ms: u64, end_ms: u64, text: &str) {
    match SubtitleCue::new_validated(seq_num, start_ms, end_ms, text.to_string()) {
        Ok(cue) => cues.push(cue),
        Err(e) => warn!("Skipping invalid subtitle cue {}: {}", seq_num, e),
    }
}

fn parse_timestamp_to_ms(caps: &regex::Captures, start_idx: usize) -> Option<u64> {
    let field = |offset: usize| -> Option<u64> { caps.get(start_idx + offset)?.as_str().parse().ok() };
    let (hours, minutes, seconds, millis) = (field(0)?, field(1)?, field(2)?, field(3)?);
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    Some((hours * 3600 + minutes * 60 + seconds) * 1000 + millis)
}

fn subtitle_chunk(group: &[SubtitleCue]) -> Chunk {
    let text = group
        .iter()
        .map(SubtitleCue::single_line)
        .collect::<Vec<_>>()
        .join("\n");

    let html = group
        .iter()
        .map(|cue| {
            let lines: Vec<String> = cue.content.lines().map(|l| escape_html(l.trim())).collect();
            format!(
                "<p data-t=\"{}-{}\">{}</p>",
                format_seconds(cue.start_time_ms),
                format_seconds(cue.end_time_ms),
                lines.join("<br>")
            )
        })
        .collect::<String>();

    let loc = match (group.first(), group.last()) {
        (Some(first), Some(last)) => Some(Loc::Time {
            start_ms: first.start_time_ms,
            end_ms: last.end_time_ms,
        }),
        _ => None,
    };

    Chunk { text, html, loc }
}
