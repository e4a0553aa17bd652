//! # Timestamp Records
//!
//! Whisper emits timestamps as dedicated tokens quantized to 0.02 s,
//! interleaved with text tokens: `<|t0|> text <|t1|><|t1|> text <|t2|>`.
//! This module parses that stream into segment-level records and derives
//! the word- and character-level collections from each segment, so a
//! timestamped result always carries all three granularities in
//! parallel.

use crate::error::AppResult;
use serde::Serialize;

/// Seconds per timestamp-token step.
pub const TIME_PER_TOKEN: f64 = 0.02;

/// One timestamp record: a timed span of transcript text.
#[derive(Debug, Clone, Serialize)]
pub struct TimedSpan {
    /// Start of the span in seconds
    pub start: f64,
    /// End of the span in seconds
    pub end: f64,
    /// Text covered by the span
    pub text: String,
}

/// Parse generated tokens into segment-level records.
///
/// ## Parameters:
/// - **tokens**: generated tokens for one chunk (prompt and EOT removed)
/// - **timestamp_begin**: id of the `<|0.00|>` token; every id at or
///   above it is a timestamp
/// - **time_offset**: seconds to add to every timestamp (chunk start)
/// - **fallback_end**: end time used when the stream stops mid-segment
/// - **decode**: token-to-text decoder (borrowed from the tokenizer)
///
/// Segments are returned in stream order; an opening timestamp with no
/// text before the next one moves the cursor without emitting a record.
pub fn parse_segments<D>(
    tokens: &[u32],
    timestamp_begin: u32,
    time_offset: f64,
    fallback_end: f64,
    decode: D,
) -> AppResult<Vec<TimedSpan>>
where
    D: Fn(&[u32]) -> AppResult<String>,
{
    let mut segments = Vec::new();
    let mut pending: Vec<u32> = Vec::new();
    let mut open_start: Option<f64> = None;

    for &token in tokens {
        if token >= timestamp_begin {
            let time = time_offset + (token - timestamp_begin) as f64 * TIME_PER_TOKEN;
            if pending.is_empty() {
                // No text yet: this timestamp (re)opens the segment.
                open_start = Some(time);
            } else {
                let text = decode(&pending)?;
                let text = text.trim().to_string();
                if !text.is_empty() {
                    segments.push(TimedSpan {
                        start: open_start.unwrap_or(time_offset),
                        end: time,
                        text,
                    });
                }
                pending.clear();
                open_start = Some(time);
            }
        } else {
            pending.push(token);
        }
    }

    // Text after the last timestamp: close the segment at the chunk end.
    if !pending.is_empty() {
        let text = decode(&pending)?;
        let text = text.trim().to_string();
        if !text.is_empty() {
            segments.push(TimedSpan {
                start: open_start.unwrap_or(time_offset),
                end: fallback_end,
                text,
            });
        }
    }

    Ok(segments)
}

/// Derive word-level records from a segment.
///
/// The model does not emit sub-segment alignments, so the segment span
/// is divided among its words proportionally to their character counts.
/// Concatenating the word texts (space separated) reproduces the
/// whitespace-normalized segment text.
pub fn words_from_segment(segment: &TimedSpan) -> Vec<TimedSpan> {
    let words: Vec<&str> = segment.text.split_whitespace().collect();
    if words.is_empty() {
        return Vec::new();
    }

    let total_chars: usize = words.iter().map(|w| w.chars().count()).sum();
    let duration = (segment.end - segment.start).max(0.0);

    let mut spans = Vec::with_capacity(words.len());
    let mut consumed = 0usize;
    for word in words {
        let chars = word.chars().count();
        let start = segment.start + duration * consumed as f64 / total_chars as f64;
        consumed += chars;
        let end = segment.start + duration * consumed as f64 / total_chars as f64;
        spans.push(TimedSpan {
            start,
            end,
            text: word.to_string(),
        });
    }
    spans
}

/// Derive character-level records from a segment.
///
/// Every character of the segment text (whitespace included) gets an
/// equal slice of the segment span, in order.
pub fn chars_from_segment(segment: &TimedSpan) -> Vec<TimedSpan> {
    let chars: Vec<char> = segment.text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }

    let duration = (segment.end - segment.start).max(0.0);
    let step = duration / chars.len() as f64;

    chars
        .iter()
        .enumerate()
        .map(|(i, c)| TimedSpan {
            start: segment.start + step * i as f64,
            end: segment.start + step * (i + 1) as f64,
            text: c.to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fake decoder: renders each token id as a letter ('a' + id).
    fn fake_decode(tokens: &[u32]) -> AppResult<String> {
        Ok(tokens
            .iter()
            .map(|&t| char::from(b'a' + (t % 26) as u8))
            .collect())
    }

    const TS: u32 = 1000; // timestamp_begin for the synthetic streams

    #[test]
    fn test_parse_segments_basic() {
        // <|0.00|> a b <|1.00|> <|1.00|> c <|2.00|>
        let tokens = [TS, 0, 1, TS + 50, TS + 50, 2, TS + 100];
        let segments = parse_segments(&tokens, TS, 0.0, 3.0, fake_decode).unwrap();

        assert_eq!(segments.len(), 2);
        assert!((segments[0].start - 0.0).abs() < 1e-9);
        assert!((segments[0].end - 1.0).abs() < 1e-9);
        assert_eq!(segments[0].text, "ab");
        assert!((segments[1].start - 1.0).abs() < 1e-9);
        assert!((segments[1].end - 2.0).abs() < 1e-9);
        assert_eq!(segments[1].text, "c");

        // Stream order implies non-decreasing starts
        assert!(segments[0].start <= segments[1].start);
    }

    #[test]
    fn test_parse_segments_dangling_text_closes_at_fallback() {
        // <|0.40|> a b, with no closing timestamp
        let tokens = [TS + 20, 0, 1];
        let segments = parse_segments(&tokens, TS, 0.0, 2.5, fake_decode).unwrap();

        assert_eq!(segments.len(), 1);
        assert!((segments[0].start - 0.4).abs() < 1e-9);
        assert!((segments[0].end - 2.5).abs() < 1e-9);
    }

    #[test]
    fn test_parse_segments_applies_chunk_offset() {
        let tokens = [TS, 0, TS + 100];
        let segments = parse_segments(&tokens, TS, 30.0, 60.0, fake_decode).unwrap();

        assert_eq!(segments.len(), 1);
        assert!((segments[0].start - 30.0).abs() < 1e-9);
        assert!((segments[0].end - 32.0).abs() < 1e-9);
    }

    #[test]
    fn test_words_cover_segment_in_order() {
        let segment = TimedSpan {
            start: 1.0,
            end: 3.0,
            text: "hello brave world".to_string(),
        };
        let words = words_from_segment(&segment);

        assert_eq!(words.len(), 3);
        assert!((words[0].start - segment.start).abs() < 1e-9);
        assert!((words[2].end - segment.end).abs() < 1e-9);
        for pair in words.windows(2) {
            assert!(pair[0].end <= pair[1].start + 1e-9);
        }

        let rebuilt: Vec<&str> = words.iter().map(|w| w.text.as_str()).collect();
        assert_eq!(rebuilt.join(" "), "hello brave world");
    }

    #[test]
    fn test_chars_cover_segment_and_rebuild_text() {
        let segment = TimedSpan {
            start: 0.0,
            end: 1.0,
            text: "hi there".to_string(),
        };
        let chars = chars_from_segment(&segment);

        assert_eq!(chars.len(), 8);
        assert!((chars[0].start - 0.0).abs() < 1e-9);
        assert!((chars[7].end - 1.0).abs() < 1e-9);

        let rebuilt: String = chars.iter().map(|c| c.text.as_str()).collect::<String>();
        assert_eq!(rebuilt, "hi there");
    }

    #[test]
    fn test_empty_segment_yields_no_spans() {
        let segment = TimedSpan {
            start: 0.0,
            end: 1.0,
            text: "   ".to_string(),
        };
        assert!(words_from_segment(&segment).is_empty());
        // Whitespace still yields character records; an empty text does not.
        let empty = TimedSpan {
            start: 0.0,
            end: 1.0,
            text: String::new(),
        };
        assert!(chars_from_segment(&empty).is_empty());
    }
}
