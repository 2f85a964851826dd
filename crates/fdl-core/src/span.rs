// Dweve FDL - Flat Data Language
//
// Copyright (c) 2025 Dweve IP B.V. and individual contributors.
//
// SPDX-License-Identifier: Apache-2.0
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License in the LICENSE file at the
// root of this repository or at: http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Positional extraction shared by every schema node.
//!
//! A [`Span`] carries the settings common to all node kinds: an optional
//! name, the start/length window into a record, and the cleanup settings
//! (trimming, malformed-character substitution, escape removal). Spans are
//! built once at schema-compile time and shared read-only across concurrent
//! parses.
//!
//! Offsets are measured in characters, not bytes, so fixed-position schemas
//! behave the same for ASCII extracts and for re-encoded text.

use std::borrow::Cow;

/// Replacement for characters that are not legal in XML output.
pub const REPLACEMENT_CHAR: char = '?';

/// Compiled positional settings of one schema node.
#[derive(Debug, Clone)]
pub struct Span {
    name: String,
    start: usize,
    length: Option<usize>,
    trim: bool,
    replace_malformed: bool,
    escape: Option<char>,
}

impl Span {
    /// Build a span. `start` is 0-based; `length` of `None` extends to the
    /// end of the record.
    pub fn new(
        name: impl Into<String>,
        start: usize,
        length: Option<usize>,
        trim: bool,
        replace_malformed: bool,
        escape: Option<char>,
    ) -> Self {
        Self {
            name: name.into(),
            start,
            length,
            trim,
            replace_malformed,
            escape,
        }
    }

    /// A nameless span covering the whole record, with default cleanup.
    pub fn whole() -> Self {
        Self::new("", 0, None, true, false, None)
    }

    /// The node name; empty for anonymous wrapper nodes.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn length(&self) -> Option<usize> {
        self.length
    }

    #[inline]
    pub fn trim(&self) -> bool {
        self.trim
    }

    #[inline]
    pub fn replace_malformed(&self) -> bool {
        self.replace_malformed
    }

    #[inline]
    pub fn escape(&self) -> Option<char> {
        self.escape
    }

    /// Extract the configured window out of a record.
    ///
    /// With no start offset and no length the whole record is returned, which
    /// is what separator-indexed nodes rely on. A record shorter than the
    /// start offset yields an empty slice; a window reaching past the end is
    /// clipped to the record. The result is always a borrowed view.
    pub fn extract<'a>(&self, record: &'a str) -> &'a str {
        if self.start == 0 && self.length.is_none() {
            return record;
        }

        if record.is_ascii() {
            // Byte offsets and char offsets coincide.
            if record.len() < self.start {
                return "";
            }
            let end = match self.length {
                Some(len) => record.len().min(self.start + len),
                None => record.len(),
            };
            return &record[self.start..end];
        }

        let char_count = record.chars().count();
        if char_count < self.start {
            return "";
        }
        let end = match self.length {
            Some(len) => char_count.min(self.start + len),
            None => char_count,
        };
        let begin_byte = byte_offset(record, self.start);
        let end_byte = byte_offset(record, end);
        &record[begin_byte..end_byte]
    }
}

/// Byte offset of the `n`-th character; the string length when `n` is past
/// the last character.
fn byte_offset(s: &str, n: usize) -> usize {
    s.char_indices()
        .nth(n)
        .map(|(idx, _)| idx)
        .unwrap_or(s.len())
}

/// True for code points that XML 1.0 forbids in character data: C0 controls
/// other than TAB/LF/CR and the noncharacters U+FFFE/U+FFFF. Surrogates and
/// values past U+10FFFF cannot occur in a `char`.
#[inline]
fn is_malformed(c: char) -> bool {
    (c <= '\u{0008}')
        || c == '\u{000B}'
        || c == '\u{000C}'
        || ('\u{000E}'..='\u{001F}').contains(&c)
        || c == '\u{FFFE}'
        || c == '\u{FFFF}'
}

/// Replace XML-illegal characters with [`REPLACEMENT_CHAR`].
///
/// Borrows the input unchanged when nothing needs replacing.
pub(crate) fn replace_malformed_chars(input: &str) -> Cow<'_, str> {
    if !input.chars().any(is_malformed) {
        return Cow::Borrowed(input);
    }
    Cow::Owned(
        input
            .chars()
            .map(|c| if is_malformed(c) { REPLACEMENT_CHAR } else { c })
            .collect(),
    )
}

/// Remove escape markers, keeping the characters they escape.
///
/// Each occurrence of `escape` is dropped and the following character is
/// kept verbatim, so a doubled escape collapses to a single literal escape
/// character and an escaped separator survives as the bare separator. A
/// trailing unpaired escape is dropped.
pub(crate) fn strip_escapes(input: &str, escape: char) -> Cow<'_, str> {
    if !input.contains(escape) {
        return Cow::Borrowed(input);
    }
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c == escape {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    Cow::Owned(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, length: Option<usize>) -> Span {
        Span::new("f", start, length, true, false, None)
    }

    // ==================== extract tests ====================

    #[test]
    fn test_extract_whole_when_unpositioned() {
        let s = Span::new("f", 0, None, true, false, None);
        assert_eq!(s.extract("abcdef"), "abcdef");
    }

    #[test]
    fn test_extract_start_and_length() {
        // start=2,length=3 in 1-based configuration terms.
        assert_eq!(span(1, Some(3)).extract("abcdef"), "bcd");
    }

    #[test]
    fn test_extract_record_shorter_than_start() {
        assert_eq!(span(10, Some(3)).extract("abc"), "");
    }

    #[test]
    fn test_extract_window_clipped_to_record() {
        assert_eq!(span(4, Some(10)).extract("abcdef"), "ef");
    }

    #[test]
    fn test_extract_length_unset_runs_to_end() {
        assert_eq!(span(2, None).extract("abcdef"), "cdef");
    }

    #[test]
    fn test_extract_start_equals_length() {
        assert_eq!(span(3, Some(2)).extract("abc"), "");
    }

    #[test]
    fn test_extract_multibyte_offsets_are_chars() {
        assert_eq!(span(1, Some(2)).extract("äöüß"), "öü");
    }

    #[test]
    fn test_extract_multibyte_shorter_than_start() {
        assert_eq!(span(5, Some(1)).extract("äöü"), "");
    }

    // ==================== malformed replacement tests ====================

    #[test]
    fn test_replace_malformed_controls() {
        let cleaned = replace_malformed_chars("a\u{0001}b\u{000C}c");
        assert_eq!(cleaned, "a?b?c");
    }

    #[test]
    fn test_replace_malformed_keeps_tab_lf_cr() {
        let input = "a\tb\nc\rd";
        let cleaned = replace_malformed_chars(input);
        assert_eq!(cleaned, input);
        assert!(matches!(cleaned, Cow::Borrowed(_)));
    }

    #[test]
    fn test_replace_malformed_noncharacters() {
        assert_eq!(replace_malformed_chars("x\u{FFFF}y"), "x?y");
    }

    // ==================== escape removal tests ====================

    #[test]
    fn test_strip_escapes_separator() {
        assert_eq!(strip_escapes("a\\;b", '\\'), "a;b");
    }

    #[test]
    fn test_strip_escapes_doubled() {
        assert_eq!(strip_escapes("a\\\\b", '\\'), "a\\b");
    }

    #[test]
    fn test_strip_escapes_untouched_borrows() {
        let out = strip_escapes("plain", '\\');
        assert!(matches!(out, Cow::Borrowed(_)));
    }

    #[test]
    fn test_strip_escapes_trailing_marker_dropped() {
        assert_eq!(strip_escapes("ab\\", '\\'), "ab");
    }
}
