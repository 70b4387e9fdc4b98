use async_trait::async_trait;
use regex::Regex;

use super::{SubtitleFormat, SubtitleShifter, apply_shift};
use crate::error::{JunkyardError, Result};

/// SubRip shifter.
///
/// A caption block is an index line, a timing line
/// (`HH:MM:SS,mmm --> HH:MM:SS,mmm`, optionally followed by position
/// settings) and text. Only timing lines directly below an index line are
/// rewritten; everything else passes through line by line.
pub struct SrtShifter {
    timing_pattern: Regex,
}

impl SrtShifter {
    pub fn new() -> Self {
        Self {
            timing_pattern: Regex::new(
                r"^\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})\s*-->\s*(\d+):(\d{2}):(\d{2})[,.](\d{3})(.*)$",
            )
            .expect("timing pattern is valid"),
        }
    }

    fn shift_timing_line(&self, line: &str, shift_millis: i64) -> Result<Option<String>> {
        let Some(caps) = self.timing_pattern.captures(line) else {
            return Ok(None);
        };

        let start = parse_srt_time(&caps[1], &caps[2], &caps[3], &caps[4])?;
        let end = parse_srt_time(&caps[5], &caps[6], &caps[7], &caps[8])?;

        Ok(Some(format!(
            "{} --> {}{}",
            format_srt_time(apply_shift(start, shift_millis)),
            format_srt_time(apply_shift(end, shift_millis)),
            &caps[9]
        )))
    }
}

impl Default for SrtShifter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubtitleShifter for SrtShifter {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Srt
    }

    fn shift_content(&self, content: &str, shift_millis: i64) -> Result<String> {
        let mut output = String::with_capacity(content.len());
        let mut previous_is_index = false;

        for raw in content.split_inclusive('\n') {
            let (line, ending) = split_line_ending(raw);
            let rewritten = if previous_is_index {
                self.shift_timing_line(line, shift_millis)?
            } else {
                None
            };

            previous_is_index = is_index_line(line);
            output.push_str(rewritten.as_deref().unwrap_or(line));
            output.push_str(ending);
        }

        Ok(output)
    }
}

/// Split a line from its own terminator (`\r\n`, `\n` or none)
fn split_line_ending(raw: &str) -> (&str, &str) {
    let body = raw
        .strip_suffix("\r\n")
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);
    raw.split_at(body.len())
}

fn is_index_line(line: &str) -> bool {
    let trimmed = line.trim().trim_start_matches('\u{feff}');
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}

/// Parse SRT time components to total milliseconds
fn parse_srt_time(hours: &str, minutes: &str, seconds: &str, millis: &str) -> Result<u64> {
    let parse = |value: &str| {
        value
            .parse::<u64>()
            .map_err(|e| JunkyardError::Subtitle(format!("Invalid timestamp component '{}': {}", value, e)))
    };

    let overflow = || JunkyardError::Subtitle(format!("Timestamp {}:{}:{},{} is out of range", hours, minutes, seconds, millis));

    let total = [(hours, 3_600_000u64), (minutes, 60_000), (seconds, 1_000), (millis, 1)]
        .into_iter()
        .try_fold(0u64, |total, (value, unit)| {
            parse(value)?
                .checked_mul(unit)
                .and_then(|part| total.checked_add(part))
                .ok_or_else(overflow)
        })?;
    Ok(total)
}

/// Format milliseconds to SRT time format (HH:MM:SS,mmm)
fn format_srt_time(total_milliseconds: u64) -> String {
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,500 --> 00:00:02,000\nFirst line\n\n2\n00:01:05,123 --> 00:01:07,000\nSecond\nsecond part\n";

    #[test]
    fn test_format_srt_time() {
        assert_eq!(format_srt_time(0), "00:00:00,000");
        assert_eq!(format_srt_time(65_123), "00:01:05,123");
        assert_eq!(format_srt_time(3_661_500), "01:01:01,500");
    }

    #[test]
    fn test_parse_srt_time() {
        assert_eq!(parse_srt_time("01", "01", "01", "500").unwrap(), 3_661_500);
    }

    #[test]
    fn test_shift_forward() {
        let shifted = SrtShifter::new().shift_content(SAMPLE, 1_000).unwrap();
        assert_eq!(
            shifted,
            "1\n00:00:01,500 --> 00:00:03,000\nFirst line\n\n2\n00:01:06,123 --> 00:01:08,000\nSecond\nsecond part\n"
        );
    }

    #[test]
    fn test_shift_clamps_at_zero() {
        let shifted = SrtShifter::new().shift_content(SAMPLE, -1_000).unwrap();
        assert!(shifted.starts_with("1\n00:00:00,000 --> 00:00:01,000\n"));
    }

    #[test]
    fn test_shift_is_invertible() {
        let shifter = SrtShifter::new();
        let forward = shifter.shift_content(SAMPLE, 250).unwrap();
        assert_eq!(shifter.shift_content(&forward, -250).unwrap(), SAMPLE);
    }

    #[test]
    fn test_crlf_and_position_settings_preserved() {
        let content = "1\r\n00:00:01,000 --> 00:00:02,000 X1:10 X2:20\r\nText\r\n";
        let shifted = SrtShifter::new().shift_content(content, 10).unwrap();
        assert_eq!(shifted, "1\r\n00:00:01,010 --> 00:00:02,010 X1:10 X2:20\r\nText\r\n");
    }

    #[test]
    fn test_oversized_hours_is_an_error() {
        assert!(matches!(
            parse_srt_time("10000000000000", "00", "00", "000"),
            Err(JunkyardError::Subtitle(_))
        ));

        let content = "1\n10000000000000:00:00,000 --> 10000000000000:00:01,000\nText\n";
        assert!(SrtShifter::new().shift_content(content, 100).is_err());
    }

    #[test]
    fn test_mixed_line_endings_keep_their_own_terminator() {
        let content = "1\r\n00:00:01,000 --> 00:00:02,000\r\nFirst\r\n\n2\n00:00:03,000 --> 00:00:04,000\nSecond";
        let shifted = SrtShifter::new().shift_content(content, 500).unwrap();
        assert_eq!(
            shifted,
            "1\r\n00:00:01,500 --> 00:00:02,500\r\nFirst\r\n\n2\n00:00:03,500 --> 00:00:04,500\nSecond"
        );
    }

    #[test]
    fn test_text_that_looks_like_timing_is_untouched() {
        // No index line above, so this is caption text
        let content = "1\n00:00:01,000 --> 00:00:02,000\n00:00:05,000 --> 00:00:06,000\n";
        let shifted = SrtShifter::new().shift_content(content, 100).unwrap();
        assert_eq!(shifted, "1\n00:00:01,100 --> 00:00:02,100\n00:00:05,000 --> 00:00:06,000\n");
    }
}
