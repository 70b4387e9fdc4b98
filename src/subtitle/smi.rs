use async_trait::async_trait;
use regex::{Captures, Regex};

use super::{SubtitleFormat, SubtitleShifter, apply_shift};
use crate::error::Result;

/// SAMI shifter: only the numeral inside `<SYNC Start=...>` changes
pub struct SmiShifter {
    sync_pattern: Regex,
}

impl SmiShifter {
    pub fn new() -> Self {
        Self {
            sync_pattern: Regex::new(r#"(?i)(<SYNC\s*Start\s*=\s*["']?)(\d+)"#)
                .expect("SYNC pattern is valid"),
        }
    }
}

impl Default for SmiShifter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubtitleShifter for SmiShifter {
    fn format(&self) -> SubtitleFormat {
        SubtitleFormat::Smi
    }

    fn shift_content(&self, content: &str, shift_millis: i64) -> Result<String> {
        let shifted = self.sync_pattern.replace_all(content, |caps: &Captures| {
            let prefix = &caps[1];
            match caps[2].parse::<u64>() {
                Ok(start) => format!("{}{}", prefix, apply_shift(start, shift_millis)),
                // Out-of-range numerals are left as they are
                Err(_) => caps[0].to_string(),
            }
        });
        Ok(shifted.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "<SAMI><BODY>\n<SYNC Start=1000><P Class=KRCC>Hello\n<sync start = 2500><P Class=KRCC>&nbsp;\n</BODY></SAMI>";

    #[test]
    fn test_shift_rewrites_only_sync_markers() {
        let shifted = SmiShifter::new().shift_content(SAMPLE, 500).unwrap();
        assert_eq!(
            shifted,
            "<SAMI><BODY>\n<SYNC Start=1500><P Class=KRCC>Hello\n<sync start = 3000><P Class=KRCC>&nbsp;\n</BODY></SAMI>"
        );
    }

    #[test]
    fn test_shift_clamps_at_zero() {
        let shifted = SmiShifter::new().shift_content("<SYNC Start=300>x", -1000).unwrap();
        assert_eq!(shifted, "<SYNC Start=0>x");
    }

    #[test]
    fn test_shift_is_invertible() {
        let shifter = SmiShifter::new();
        let forward = shifter.shift_content(SAMPLE, 750).unwrap();
        assert_eq!(shifter.shift_content(&forward, -750).unwrap(), SAMPLE);
    }
}
