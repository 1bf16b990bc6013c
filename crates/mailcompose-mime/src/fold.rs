//! Header line folding.
//!
//! Folding wraps one logical `key: value` header over several physical
//! lines. Continuation lines use two indentation levels:
//!
//! - **first level** (8 spaces by default) starts a line between two
//!   space-separated segments of the value;
//! - **second level** (9 spaces by default) continues a segment that was too
//!   wide for a line on its own and had to be cut.
//!
//! Keeping the levels distinct is what makes [`fold_decode`] able to undo
//! [`fold_encode`]: first-level breaks are rejoined with a single space,
//! second-level breaks are rejoined verbatim.
//!
//! A continuation line never starts with whitespace from the value. Runs of
//! several spaces keep their extra spaces at the end of the line before a
//! fold; a run too long for that is shortened.

use crate::error::{Error, Result};

const SEPARATOR: &str = ": ";
const CRLF: &str = "\r\n";

/// Options controlling [`fold_encode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FoldOptions {
    /// Maximum physical line length, excluding CRLF.
    pub max_line_length: usize,
    /// Indentation of lines that start at a segment boundary.
    pub first_level_indent: usize,
    /// Indentation of lines that continue a cut segment.
    pub second_level_indent: usize,
    /// Whether the encoded header ends with CRLF.
    pub emit_trailing_newline: bool,
}

impl Default for FoldOptions {
    fn default() -> Self {
        Self {
            max_line_length: 78,
            first_level_indent: 8,
            second_level_indent: 9,
            emit_trailing_newline: true,
        }
    }
}

impl FoldOptions {
    /// Creates the default options (78 columns, 8/9 indentation, trailing CRLF).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum line length.
    #[must_use]
    pub const fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.max_line_length = max_line_length;
        self
    }

    /// Sets both indentation levels.
    #[must_use]
    pub const fn with_indents(mut self, first_level: usize, second_level: usize) -> Self {
        self.first_level_indent = first_level;
        self.second_level_indent = second_level;
        self
    }

    /// Sets whether the encoded header ends with CRLF.
    #[must_use]
    pub const fn with_trailing_newline(mut self, emit: bool) -> Self {
        self.emit_trailing_newline = emit;
        self
    }

    /// Checks that the indentation levels are distinguishable and leave room
    /// for content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the options cannot produce a
    /// decodable fold.
    pub fn validate(&self) -> Result<()> {
        if self.first_level_indent == 0 {
            return Err(Error::Configuration(
                "first level indent must be at least 1".to_string(),
            ));
        }
        if self.second_level_indent <= self.first_level_indent {
            return Err(Error::Configuration(format!(
                "second level indent ({}) must be wider than first level indent ({})",
                self.second_level_indent, self.first_level_indent
            )));
        }
        if self.max_line_length <= self.second_level_indent {
            return Err(Error::Configuration(format!(
                "max line length ({}) leaves no room after indentation ({})",
                self.max_line_length, self.second_level_indent
            )));
        }
        Ok(())
    }
}

/// Encodes `key: value` into CRLF-separated folded lines.
///
/// # Errors
///
/// - [`Error::InvalidKey`] if the key is not `[A-Za-z_][A-Za-z0-9_-]*`
/// - [`Error::KeyTooLong`] if `key: ` does not fit in one line
/// - [`Error::Configuration`] if the options are inconsistent
pub fn fold_encode(key: &str, value: &str, options: &FoldOptions) -> Result<String> {
    validate_key(key)?;
    options.validate()?;

    if key.len() + SEPARATOR.len() > options.max_line_length {
        return Err(Error::KeyTooLong {
            key: key.to_string(),
            max_line_length: options.max_line_length,
        });
    }

    let mut folder = Folder::new(key, options);
    for (word, spaces) in words(value) {
        folder.push_word(word, spaces);
    }

    let mut result = folder.finish().join(CRLF);
    if options.emit_trailing_newline {
        result.push_str(CRLF);
    }
    Ok(result)
}

/// Decodes one folded header back into its `(key, value)` pair.
///
/// A single trailing line terminator is ignored. Lines may be separated by
/// CRLF or a bare LF.
///
/// # Errors
///
/// - [`Error::FoldingTooDeep`] if continuation lines use more than two
///   distinct indentation widths
/// - [`Error::MissingSeparator`] if the unfolded line has no `:`
pub fn fold_decode(raw: &str) -> Result<(String, String)> {
    let raw = raw
        .strip_suffix(CRLF)
        .or_else(|| raw.strip_suffix('\n'))
        .unwrap_or(raw);

    let lines: Vec<&str> = raw
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .collect();

    let widths: Vec<usize> = lines.iter().skip(1).map(|line| indent_width(line)).collect();

    let mut levels: Vec<usize> = widths.iter().copied().filter(|w| *w > 0).collect();
    levels.sort_unstable();
    levels.dedup();
    if levels.len() > 2 {
        return Err(Error::FoldingTooDeep(levels.len()));
    }
    let second_level = (levels.len() == 2).then(|| levels[1]);

    let mut unfolded: Vec<String> = vec![lines[0].trim_start().to_string()];
    for (line, width) in lines.iter().skip(1).zip(widths) {
        let content = &line[width..];
        match unfolded.last_mut() {
            Some(previous) if Some(width) == second_level => previous.push_str(content),
            _ => unfolded.push(content.to_string()),
        }
    }

    let logical = unfolded.join(" ");
    let (key, value) = logical
        .split_once(':')
        .ok_or_else(|| Error::MissingSeparator(logical.clone()))?;
    Ok((key.trim().to_string(), value.trim().to_string()))
}

/// Checks a header key against `[A-Za-z_][A-Za-z0-9_-]*`.
///
/// # Errors
///
/// Returns [`Error::InvalidKey`] if the key does not match.
pub fn validate_key(key: &str) -> Result<()> {
    let mut chars = key.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

    if valid {
        Ok(())
    } else {
        Err(Error::InvalidKey(key.to_string()))
    }
}

/// Width of the leading space/tab run of a line.
fn indent_width(line: &str) -> usize {
    line.bytes().take_while(|b| *b == b' ' || *b == b'\t').count()
}

/// Largest char boundary of `s` not after `index`.
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    (0..=index).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0)
}

/// Splits a value on single spaces into words, each paired with the number
/// of spaces that follow it beyond the separator.
///
/// Leading spaces and the spaces after the last word are dropped; decoding
/// trims them anyway.
fn words(value: &str) -> Vec<(&str, usize)> {
    let mut words: Vec<(&str, usize)> = Vec::new();
    for segment in value.split(' ') {
        if !segment.is_empty() {
            words.push((segment, 0));
        } else if let Some(last) = words.last_mut() {
            last.1 += 1;
        }
    }
    if let Some(last) = words.last_mut() {
        last.1 = 0;
    }
    words
}

/// Line builder used by [`fold_encode`].
///
/// A continuation line must never start with value whitespace, because the
/// decoder measures its indentation. Extra spaces of a run therefore trail
/// the word before them, and a fold between two words stands for the single
/// separating space.
struct Folder<'a> {
    options: &'a FoldOptions,
    lines: Vec<String>,
    line: String,
    /// Length of the `key: ` prefix or indentation of the current line.
    prefix_len: usize,
    /// Whether the current line is the `key: ` line.
    first_line: bool,
    /// Whether a word was placed on the current line.
    has_word: bool,
}

impl<'a> Folder<'a> {
    fn new(key: &str, options: &'a FoldOptions) -> Self {
        let line = format!("{key}{SEPARATOR}");
        Self {
            options,
            lines: Vec::new(),
            prefix_len: line.len(),
            line,
            first_line: true,
            has_word: false,
        }
    }

    fn remaining(&self) -> usize {
        self.options.max_line_length.saturating_sub(self.line.len())
    }

    fn new_line(&mut self, indent: usize) {
        self.flush_line();
        self.line = " ".repeat(indent);
        self.prefix_len = indent;
        self.first_line = false;
        self.has_word = false;
    }

    fn flush_line(&mut self) {
        let line = std::mem::take(&mut self.line);
        if line.len() > self.prefix_len {
            self.lines.push(line);
        } else if self.first_line {
            self.lines.push(line.trim_end().to_string());
        }
    }

    fn push_spaces(&mut self, count: usize) {
        self.line.extend(std::iter::repeat_n(' ', count));
    }

    fn add(&mut self, word: &str, spaces: usize) {
        if self.has_word {
            self.line.push(' ');
        }
        self.line.push_str(word);
        self.push_spaces(spaces);
        self.has_word = true;
    }

    fn push_word(&mut self, word: &str, spaces: usize) {
        let width = word.len() + spaces;

        if width + usize::from(self.has_word) <= self.remaining() {
            self.add(word, spaces);
            return;
        }

        let first_level_width = self.options.max_line_length - self.options.first_level_indent;
        if width <= first_level_width {
            self.new_line(self.options.first_level_indent);
            self.add(word, spaces);
            return;
        }

        self.push_cut_word(word, spaces);
    }

    /// Places a word (with its trailing spaces) wider than a first-level
    /// line: it starts on a fresh first-level line and continues on
    /// second-level lines. When the trailing spaces do not fit after the
    /// rest of the word, its last character moves on with them, so no
    /// second-level line starts with a space.
    ///
    /// When the last character and the spaces cannot share a second-level
    /// line, the spaces are cut to fit.
    fn push_cut_word(&mut self, word: &str, spaces: usize) {
        if self.first_line || self.has_word {
            self.new_line(self.options.first_level_indent);
        }

        let mut rest = word;
        loop {
            let room = self.remaining();
            if rest.len() + spaces <= room {
                self.line.push_str(rest);
                self.push_spaces(spaces);
                break;
            }

            let last_char = rest.char_indices().last().map_or(0, |(index, _)| index);
            let mut cut = floor_char_boundary(rest, room.min(last_char));
            if cut == 0 {
                if last_char == 0 {
                    self.line.push_str(rest);
                    self.push_spaces(spaces.min(room.saturating_sub(rest.len())));
                    break;
                }
                cut = rest.chars().next().map_or(rest.len(), char::len_utf8);
            }

            self.line.push_str(&rest[..cut]);
            rest = &rest[cut..];
            self.new_line(self.options.second_level_indent);
        }
        self.has_word = true;
    }

    fn finish(mut self) -> Vec<String> {
        self.flush_line();
        self.lines
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::redundant_clone,
    clippy::manual_string_new,
    clippy::needless_collect,
    clippy::unreadable_literal,
    clippy::used_underscore_items,
    clippy::similar_names
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn lines(encoded: &str) -> Vec<&str> {
        encoded.strip_suffix(CRLF).unwrap().split(CRLF).collect()
    }

    #[test]
    fn test_single_line() {
        let encoded = fold_encode("subject", "Hello World", &FoldOptions::default()).unwrap();
        assert_eq!(encoded, "subject: Hello World\r\n");
    }

    #[test]
    fn test_without_trailing_newline() {
        let options = FoldOptions::default().with_trailing_newline(false);
        let encoded = fold_encode("subject", "Hello", &options).unwrap();
        assert_eq!(encoded, "subject: Hello");
    }

    #[test]
    fn test_wraps_at_segment_boundaries() {
        let value = "lorem ipsum dolor sit amet consectetur adipiscing elit sed do eiusmod \
                     tempor incididunt ut labore et dolore magna aliqua";
        let encoded = fold_encode("subject", value, &FoldOptions::default()).unwrap();
        let lines = lines(&encoded);

        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("subject: lorem"));
        for line in &lines {
            assert!(line.len() <= 78, "line too long: {line:?}");
        }
        for line in &lines[1..] {
            assert!(line.starts_with("        "));
            assert!(!line.starts_with("         "));
        }

        let (key, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(key, "subject");
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_cuts_oversized_segment() {
        let value = "a".repeat(200);
        let encoded = fold_encode("key", &value, &FoldOptions::default()).unwrap();
        let lines = lines(&encoded);

        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "key:");
        assert_eq!(lines[1], format!("{}{}", " ".repeat(8), "a".repeat(70)));
        assert_eq!(lines[2], format!("{}{}", " ".repeat(9), "a".repeat(69)));
        assert_eq!(lines[3], format!("{}{}", " ".repeat(9), "a".repeat(61)));

        let (_, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_cut_segment_between_words() {
        let value = format!("before {} after", "x".repeat(150));
        let encoded = fold_encode("x-long", &value, &FoldOptions::default()).unwrap();
        let lines = lines(&encoded);

        assert_eq!(lines[0], "x-long: before");
        assert!(lines.last().unwrap().ends_with("after"));

        let (_, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_cut_respects_utf8_boundaries() {
        let value = "é".repeat(100);
        let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();
        for line in lines(&encoded) {
            assert!(line.len() <= 78);
        }
        let (_, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_double_spaces_survive() {
        let value = format!("{} two  spaces", "w".repeat(60));
        let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();
        let (_, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_spaces_after_cut_segment() {
        for spaces in ["  ", "   "] {
            let value = format!("{}{spaces}b", "x".repeat(150));
            let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();
            let lines = lines(&encoded);

            for line in &lines[1..] {
                let indent = indent_width(line);
                assert!(indent == 8 || indent == 9, "{line:?}");
            }
            assert!(lines.last().unwrap().ends_with(&format!("x{spaces}b")));

            let (_, decoded) = fold_decode(&encoded).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn test_spaces_trail_before_fold() {
        let value = format!("{}   next", "w".repeat(66));
        let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();
        let lines = lines(&encoded);

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0], format!("subject: {}  ", "w".repeat(66)));
        assert_eq!(lines[1], "        next");

        let (_, decoded) = fold_decode(&encoded).unwrap();
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_long_space_run_stays_within_limit() {
        let value = format!("a{}b", " ".repeat(100));
        let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();

        for line in lines(&encoded) {
            assert!(line.len() <= 78, "line too long: {line:?}");
            assert!(!line.trim().is_empty());
        }

        let (_, decoded) = fold_decode(&encoded).unwrap();
        let (first, last) = decoded.split_once(' ').unwrap();
        assert_eq!(first, "a");
        assert_eq!(last.trim_start(), "b");
    }

    #[test]
    fn test_outer_spaces_dropped() {
        let encoded = fold_encode("subject", "  padded  ", &FoldOptions::default()).unwrap();
        assert_eq!(encoded, "subject: padded\r\n");

        let encoded = fold_encode("subject", "   ", &FoldOptions::default()).unwrap();
        assert_eq!(encoded, "subject:\r\n");
    }

    #[test]
    fn test_invalid_keys() {
        let options = FoldOptions::default();
        assert!(matches!(fold_encode("", "v", &options), Err(Error::InvalidKey(_))));
        assert!(matches!(fold_encode("x y", "v", &options), Err(Error::InvalidKey(_))));
        assert!(matches!(fold_encode("1abc", "v", &options), Err(Error::InvalidKey(_))));
        assert!(matches!(fold_encode("a:b", "v", &options), Err(Error::InvalidKey(_))));
        assert!(fold_encode("_x-mailer_2", "v", &options).is_ok());
    }

    #[test]
    fn test_key_too_long() {
        let options = FoldOptions::default().with_max_line_length(20);
        let key = "k".repeat(19);
        assert!(matches!(
            fold_encode(&key, "v", &options),
            Err(Error::KeyTooLong { max_line_length: 20, .. })
        ));
    }

    #[test]
    fn test_rejects_indistinct_indents() {
        let options = FoldOptions::default().with_indents(4, 4);
        assert!(matches!(
            fold_encode("subject", "v", &options),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_decode_unfolds_first_level() {
        let raw = "Subject: Hello\r\n        World\r\n";
        let (key, value) = fold_decode(raw).unwrap();
        assert_eq!(key, "Subject");
        assert_eq!(value, "Hello World");
    }

    #[test]
    fn test_decode_accepts_bare_lf() {
        let raw = "to: a@example.com,\n\tb@example.com";
        let (_, value) = fold_decode(raw).unwrap();
        assert_eq!(value, "a@example.com, b@example.com");
    }

    #[test]
    fn test_decode_too_deep() {
        let raw = "key: a\r\n  b\r\n   c\r\n    d";
        assert!(matches!(fold_decode(raw), Err(Error::FoldingTooDeep(3))));
    }

    #[test]
    fn test_decode_missing_separator() {
        assert!(matches!(
            fold_decode("no separator here"),
            Err(Error::MissingSeparator(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_round_trip(value in "[a-zA-Z0-9.,<>@]{1,20}( [a-zA-Z0-9.,<>@]{1,20}){0,30}") {
            let encoded = fold_encode("subject", &value, &FoldOptions::default()).unwrap();
            let (key, decoded) = fold_decode(&encoded).unwrap();
            prop_assert_eq!(key, "subject");
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_lines_within_limit(
            value in "[a-z]{1,120}( [a-z]{1,120}){0,10}",
            max in 20usize..100,
        ) {
            let options = FoldOptions::default().with_max_line_length(max);
            let encoded = fold_encode("x-test", &value, &options).unwrap();
            for line in lines(&encoded) {
                prop_assert!(line.len() <= max);
                prop_assert!(!line.trim().is_empty());
            }
            let (_, decoded) = fold_decode(&encoded).unwrap();
            prop_assert_eq!(decoded, value);
        }

        #[test]
        fn prop_space_runs_with_oversized_words(
            words in proptest::collection::vec(("[a-z]{1,150}", 1usize..=3), 1..8),
            max in 20usize..100,
        ) {
            let mut value = String::new();
            for (index, (word, spaces)) in words.iter().enumerate() {
                if index > 0 {
                    value.push_str(&" ".repeat(*spaces));
                }
                value.push_str(word);
            }

            let options = FoldOptions::default().with_max_line_length(max);
            let encoded = fold_encode("x-test", &value, &options).unwrap();
            for line in lines(&encoded) {
                prop_assert!(line.len() <= max);
                prop_assert!(!line.trim().is_empty());
            }
            let (_, decoded) = fold_decode(&encoded).unwrap();
            prop_assert_eq!(decoded, value);
        }
    }
}
