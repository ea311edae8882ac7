//! Wildcard byte-pattern scanning.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A parsed byte signature; `None` entries match any byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    bytes: Vec<Option<u8>>,
    /// First concrete byte, used to jump between candidates
    anchor: Option<(usize, u8)>,
}

impl Pattern {
    /// Parse `"48 8B 05 ?? ?? ?? ??"`; `?` and `??` are wildcards.
    pub fn parse(pattern: &str) -> Result<Self> {
        Self::from_bytes(parse_pattern(pattern)?)
    }

    pub fn from_bytes(bytes: Vec<Option<u8>>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidSignature(
                "Signature pattern is empty".to_string(),
            ));
        }
        let anchor = bytes
            .iter()
            .enumerate()
            .find_map(|(i, b)| b.map(|value| (i, value)));
        Ok(Self { bytes, anchor })
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[Option<u8>] {
        &self.bytes
    }

    /// Whether the pattern matches `buffer` starting at `pos`
    pub fn matches_at(&self, buffer: &[u8], pos: usize) -> bool {
        let Some(window) = buffer.get(pos..pos + self.bytes.len()) else {
            return false;
        };
        self.bytes
            .iter()
            .zip(window)
            .all(|(expected, actual)| expected.is_none_or(|b| b == *actual))
    }

    /// Lowest offset at which the pattern matches.
    pub fn scan(&self, buffer: &[u8]) -> Option<usize> {
        self.candidates(buffer).find(|&pos| self.matches_at(buffer, pos))
    }

    /// Every matching offset, ascending.
    pub fn scan_all(&self, buffer: &[u8]) -> Vec<usize> {
        self.candidates(buffer)
            .filter(|&pos| self.matches_at(buffer, pos))
            .collect()
    }

    fn candidates<'b>(&self, buffer: &'b [u8]) -> Box<dyn Iterator<Item = usize> + 'b> {
        if buffer.len() < self.bytes.len() {
            return Box::new(std::iter::empty());
        }
        let last = buffer.len() - self.bytes.len();
        match self.anchor {
            Some((index, value)) => Box::new(
                memchr::memchr_iter(value, &buffer[index..])
                    .take_while(move |&pos| pos <= last),
            ),
            None => Box::new(0..=last),
        }
    }
}

impl FromStr for Pattern {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_pattern(&self.bytes))
    }
}

pub fn parse_pattern(pattern: &str) -> Result<Vec<Option<u8>>> {
    let mut bytes = Vec::new();
    for token in pattern.split_whitespace() {
        if token == "??" || token == "?" {
            bytes.push(None);
            continue;
        }

        if token.len() != 2 {
            return Err(Error::InvalidSignature(format!(
                "Invalid signature token '{}': expected two hex digits",
                token
            )));
        }
        let value = u8::from_str_radix(token, 16).map_err(|e| {
            Error::InvalidSignature(format!("Invalid signature token '{}': {}", token, e))
        })?;
        bytes.push(Some(value));
    }

    if bytes.is_empty() {
        return Err(Error::InvalidSignature(
            "Signature pattern is empty".to_string(),
        ));
    }

    Ok(bytes)
}

pub fn format_pattern(bytes: &[Option<u8>]) -> String {
    bytes
        .iter()
        .map(|b| match b {
            Some(value) => format!("{:02X}", value),
            None => "??".to_string(),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pattern_with_wildcards() {
        let bytes = parse_pattern("48 8D 0D ?? ? ?? ??").unwrap();
        assert_eq!(bytes.len(), 7);
        assert_eq!(bytes[0], Some(0x48));
        assert_eq!(bytes[1], Some(0x8D));
        assert_eq!(bytes[2], Some(0x0D));
        assert_eq!(bytes[3], None);
        assert_eq!(bytes[4], None);
    }

    #[test]
    fn test_parse_pattern_rejects_bad_tokens() {
        assert!(parse_pattern("").is_err());
        assert!(parse_pattern("48 ZZ").is_err());
        assert!(parse_pattern("488B").is_err());
    }

    #[test]
    fn test_format_pattern() {
        let pattern = Pattern::parse("48 8d 0d ? ff").unwrap();
        assert_eq!(pattern.to_string(), "48 8D 0D ?? FF");
    }

    #[test]
    fn test_scan_literal_at_offset() {
        let mut buffer = vec![0x90u8; 256];
        buffer[100..104].copy_from_slice(&[0x48, 0x8B, 0x05, 0x11]);
        let pattern = Pattern::parse("48 8B 05 11").unwrap();
        assert_eq!(pattern.scan(&buffer), Some(100));
    }

    #[test]
    fn test_scan_literal_absent() {
        let buffer = vec![0x90u8; 256];
        let pattern = Pattern::parse("48 8B 05 11").unwrap();
        assert_eq!(pattern.scan(&buffer), None);
    }

    #[test]
    fn test_scan_wildcards_match_any_byte() {
        let pattern = Pattern::parse("89 0D ?? ?? ?? ?? 48 8B DF").unwrap();
        for filler in [0x00u8, 0x7F, 0xFF] {
            let mut buffer = vec![0xCCu8; 64];
            buffer[10..19].copy_from_slice(&[
                0x89, 0x0D, filler, filler, filler, filler, 0x48, 0x8B, 0xDF,
            ]);
            assert_eq!(pattern.scan(&buffer), Some(10));
        }
    }

    #[test]
    fn test_scan_returns_lowest_match() {
        let mut buffer = vec![0u8; 64];
        buffer[40..42].copy_from_slice(&[0xAB, 0xCD]);
        buffer[8..10].copy_from_slice(&[0xAB, 0xCD]);
        let pattern = Pattern::parse("AB CD").unwrap();
        assert_eq!(pattern.scan(&buffer), Some(8));
        assert_eq!(pattern.scan_all(&buffer), vec![8, 40]);
    }

    #[test]
    fn test_scan_leading_wildcard() {
        let buffer = [0x01, 0x02, 0xAA, 0xBB, 0x03];
        let pattern = Pattern::parse("?? AA BB").unwrap();
        assert_eq!(pattern.scan(&buffer), Some(1));

        // The anchor byte at index 0 of the buffer cannot satisfy the leading wildcard
        let buffer = [0xAA, 0xBB, 0x00];
        assert_eq!(pattern.scan(&buffer), None);
    }

    #[test]
    fn test_scan_match_at_end_of_buffer() {
        let buffer = [0x00, 0x00, 0x12, 0x34];
        let pattern = Pattern::parse("12 34").unwrap();
        assert_eq!(pattern.scan(&buffer), Some(2));

        let truncated = [0x00, 0x00, 0x12];
        assert_eq!(pattern.scan(&truncated), None);
    }

    #[test]
    fn test_all_wildcard_pattern() {
        let pattern = Pattern::parse("?? ??").unwrap();
        assert_eq!(pattern.scan(&[1, 2, 3]), Some(0));
        assert_eq!(pattern.scan(&[1]), None);
    }
}
