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

//! Record segmentation: turning a byte stream into discrete records.
//!
//! A [`RecordSegmenter`] pulls refills from a byte source, decodes them
//! incrementally and delivers records to a callback, either at every
//! unescaped occurrence of a separator character or in fixed-length slices.
//! Text after the last boundary of a refill carries over to the next one;
//! escape runs are counted across refill boundaries, so a separator is never
//! misclassified just because the buffer happened to end inside its escape
//! run.
//!
//! When a record begins and ends inside one refill and nothing is carried
//! over, the callback receives a zero-copy view of the decode buffer.
//!
//! After the source is exhausted, whatever text remains is delivered as one
//! final record — even when it is empty. Both readers treat an empty record
//! as a no-op, so the only observable effect is the line counter of the
//! tagged reader, which matches how line numbers are counted upstream.

use crate::decoder::{Encoding, StreamDecoder};
use crate::error::{StreamError, StreamResult};
use std::io::Read;

/// How records are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordBoundary {
    /// Records end at an unescaped occurrence of this character.
    Separator(char),
    /// Records are exactly this many characters long.
    FixedLength(usize),
}

/// Tuning options for a segmenter.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Source encoding.
    pub encoding: Encoding,
    /// Escape character for the record separator, when one applies.
    pub escape: Option<char>,
    /// Size of one read from the byte source.
    pub buffer_size: usize,
    /// Upper bound on a single record, in characters.
    pub max_record_size: usize,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            encoding: Encoding::Utf8,
            escape: None,
            buffer_size: 8 * 1024,
            max_record_size: 1024 * 1024,
        }
    }
}

/// Per-stream record segmentation state.
///
/// One segmenter serves one stream; all buffers are reset by construction,
/// and nothing here is shared with the compiled schema.
#[derive(Debug)]
pub struct RecordSegmenter<R: Read> {
    source: R,
    decoder: StreamDecoder,
    boundary: RecordBoundary,
    escape: Option<char>,
    max_record: usize,
    byte_buf: Vec<u8>,
    chunk: String,
    carry: String,
    records: usize,
}

impl<R: Read> RecordSegmenter<R> {
    /// A segmenter with default options.
    pub fn new(source: R, boundary: RecordBoundary) -> Self {
        Self::with_options(source, boundary, SegmentOptions::default())
    }

    pub fn with_options(source: R, boundary: RecordBoundary, options: SegmentOptions) -> Self {
        Self {
            source,
            decoder: StreamDecoder::new(options.encoding),
            boundary,
            escape: options.escape,
            max_record: options.max_record_size,
            byte_buf: vec![0; options.buffer_size.max(1)],
            chunk: String::new(),
            carry: String::new(),
            records: 0,
        }
    }

    /// Number of records delivered so far.
    #[inline]
    pub fn records(&self) -> usize {
        self.records
    }

    /// Drive the stream to completion, calling `on_record` for every record.
    ///
    /// The final carry-over is always delivered, trailing boundary or not.
    pub fn run<F>(&mut self, mut on_record: F) -> StreamResult<()>
    where
        F: FnMut(&str) -> StreamResult<()>,
    {
        loop {
            let n = self.source.read(&mut self.byte_buf)?;
            if n == 0 {
                break;
            }
            self.chunk.clear();
            self.decoder.decode(&self.byte_buf[..n], &mut self.chunk);
            match self.boundary {
                RecordBoundary::Separator(sep) => self.scan_separators(sep, &mut on_record)?,
                RecordBoundary::FixedLength(len) => self.drain_fixed(len, &mut on_record)?,
            }
        }

        self.chunk.clear();
        self.decoder.finish(&mut self.chunk);

        let last = std::mem::take(&mut self.carry);
        self.records += 1;
        on_record(&last)
    }

    fn scan_separators<F>(&mut self, sep: char, on_record: &mut F) -> StreamResult<()>
    where
        F: FnMut(&str) -> StreamResult<()>,
    {
        let chunk = std::mem::take(&mut self.chunk);
        let result = self.scan_chunk(&chunk, sep, on_record);
        self.chunk = chunk;
        result
    }

    fn scan_chunk<F>(&mut self, chunk: &str, sep: char, on_record: &mut F) -> StreamResult<()>
    where
        F: FnMut(&str) -> StreamResult<()>,
    {
        let mut start = 0usize;
        let mut search = 0usize;
        while let Some(found) = find_char(&chunk[search..], sep) {
            let pos = search + found;
            if let Some(esc) = self.escape {
                // The run may begin in the carried-over text of an earlier
                // refill; the carry is empty once a boundary was found here.
                if escape_run(&self.carry, &chunk[start..pos], esc) % 2 == 1 {
                    search = pos + sep.len_utf8();
                    continue;
                }
            }
            let piece = &chunk[start..pos];
            if self.carry.is_empty() {
                self.guard(piece)?;
                self.records += 1;
                on_record(piece)?;
            } else {
                self.carry.push_str(piece);
                self.guard_carry()?;
                self.records += 1;
                on_record(&self.carry)?;
                self.carry.clear();
            }
            start = pos + sep.len_utf8();
            search = start;
        }
        self.carry.push_str(&chunk[start..]);
        self.guard_carry()
    }

    fn drain_fixed<F>(&mut self, len: usize, on_record: &mut F) -> StreamResult<()>
    where
        F: FnMut(&str) -> StreamResult<()>,
    {
        let chunk = std::mem::take(&mut self.chunk);
        self.carry.push_str(&chunk);
        self.chunk = chunk;
        while let Some(boundary) = nth_char_boundary(&self.carry, len) {
            if boundary == self.carry.len() {
                // Exactly one record accumulated; it is completed by the
                // next refill or delivered as the final record.
                break;
            }
            self.records += 1;
            on_record(&self.carry[..boundary])?;
            self.carry.drain(..boundary);
        }
        Ok(())
    }

    fn guard(&self, text: &str) -> StreamResult<()> {
        // Byte length bounds character length from above.
        if text.len() > self.max_record && text.chars().count() > self.max_record {
            return Err(StreamError::RecordTooLarge {
                record: self.records + 1,
                limit: self.max_record,
            });
        }
        Ok(())
    }

    fn guard_carry(&self) -> StreamResult<()> {
        if self.carry.len() > self.max_record && self.carry.chars().count() > self.max_record {
            return Err(StreamError::RecordTooLarge {
                record: self.records + 1,
                limit: self.max_record,
            });
        }
        Ok(())
    }
}

/// Locate `needle` in `haystack`, with a SIMD fast path for the common
/// ASCII separator case.
fn find_char(haystack: &str, needle: char) -> Option<usize> {
    if needle.is_ascii() {
        memchr::memchr(needle as u8, haystack.as_bytes())
    } else {
        haystack.find(needle)
    }
}

/// Length of the run of consecutive escape characters immediately preceding
/// the scan position, continuing into the carried-over text when the run
/// reaches the start of the current chunk.
fn escape_run(carry: &str, head: &str, esc: char) -> usize {
    let mut run = 0;
    for c in head.chars().rev() {
        if c != esc {
            return run;
        }
        run += 1;
    }
    for c in carry.chars().rev() {
        if c != esc {
            break;
        }
        run += 1;
    }
    run
}

/// Byte offset just past the `n`-th character, or `None` when the string is
/// shorter than `n` characters.
fn nth_char_boundary(s: &str, n: usize) -> Option<usize> {
    if s.is_ascii() {
        return (s.len() >= n).then_some(n);
    }
    let mut seen = 0;
    for (idx, _) in s.char_indices() {
        if seen == n {
            return Some(idx);
        }
        seen += 1;
    }
    (seen == n).then_some(s.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Cursor;

    /// A reader that hands out its input in deliberately tiny refills.
    struct Dribble<'a> {
        data: &'a [u8],
        step: usize,
    }

    impl Read for Dribble<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.step.min(self.data.len()).min(buf.len());
            buf[..n].copy_from_slice(&self.data[..n]);
            self.data = &self.data[n..];
            Ok(n)
        }
    }

    fn collect_separated(input: &str, sep: char, escape: Option<char>, step: usize) -> Vec<String> {
        let options = SegmentOptions {
            escape,
            ..SegmentOptions::default()
        };
        let source = Dribble {
            data: input.as_bytes(),
            step,
        };
        let mut segmenter =
            RecordSegmenter::with_options(source, RecordBoundary::Separator(sep), options);
        let mut records = Vec::new();
        segmenter
            .run(|record| {
                records.push(record.to_string());
                Ok(())
            })
            .unwrap();
        records
    }

    fn collect_fixed(input: &str, len: usize) -> Vec<String> {
        let mut segmenter = RecordSegmenter::new(
            Cursor::new(input.as_bytes().to_vec()),
            RecordBoundary::FixedLength(len),
        );
        let mut records = Vec::new();
        segmenter
            .run(|record| {
                records.push(record.to_string());
                Ok(())
            })
            .unwrap();
        records
    }

    // ==================== separator mode tests ====================

    #[test]
    fn test_separator_basic() {
        assert_eq!(collect_separated("a\nb\nc", '\n', None, 64), ["a", "b", "c"]);
    }

    #[test]
    fn test_separator_trailing_boundary_gives_empty_final() {
        assert_eq!(collect_separated("a\nb\n", '\n', None, 64), ["a", "b", ""]);
    }

    #[test]
    fn test_separator_empty_input_single_empty_record() {
        assert_eq!(collect_separated("", '\n', None, 64), [""]);
    }

    #[test]
    fn test_separator_record_spanning_refills() {
        // step=1 forces every character into its own refill.
        assert_eq!(
            collect_separated("hello\nworld", '\n', None, 1),
            ["hello", "world"]
        );
    }

    #[test]
    fn test_separator_escaped_is_kept_in_record() {
        // The escape marker and the separator both remain in the record;
        // field-level escape handling removes markers later.
        assert_eq!(
            collect_separated("a\\;b;c", ';', Some('\\'), 64),
            ["a\\;b", "c"]
        );
    }

    #[test]
    fn test_separator_double_escape_is_boundary() {
        assert_eq!(
            collect_separated("a\\\\;b", ';', Some('\\'), 64),
            ["a\\\\", "b"]
        );
    }

    #[test]
    fn test_separator_escape_run_across_refill_boundary() {
        // With step=1, the escape lands in one refill and the separator in
        // the next; the run must still be recognized.
        assert_eq!(
            collect_separated("a\\;b;c", ';', Some('\\'), 1),
            ["a\\;b", "c"]
        );
    }

    #[test]
    fn test_separator_multibyte_content() {
        assert_eq!(
            collect_separated("grün;blau;rot", ';', None, 2),
            ["grün", "blau", "rot"]
        );
    }

    #[test]
    fn test_separator_non_ascii_separator() {
        assert_eq!(collect_separated("a§b", '§', None, 64), ["a", "b"]);
    }

    #[test]
    fn test_record_too_large() {
        let options = SegmentOptions {
            max_record_size: 4,
            ..SegmentOptions::default()
        };
        let mut segmenter = RecordSegmenter::with_options(
            Cursor::new(b"abcdefgh;x".to_vec()),
            RecordBoundary::Separator(';'),
            options,
        );
        let result = segmenter.run(|_| Ok(()));
        assert!(matches!(result, Err(StreamError::RecordTooLarge { .. })));
    }

    // ==================== fixed-length mode tests ====================

    #[test]
    fn test_fixed_exact_multiple() {
        assert_eq!(collect_fixed("aaabbbccc", 3), ["aaa", "bbb", "ccc"]);
    }

    #[test]
    fn test_fixed_short_tail() {
        assert_eq!(collect_fixed("aaabb", 3), ["aaa", "bb"]);
    }

    #[test]
    fn test_fixed_empty_input() {
        assert_eq!(collect_fixed("", 3), [""]);
    }

    #[test]
    fn test_fixed_counts_chars_not_bytes() {
        assert_eq!(collect_fixed("äöüß", 2), ["äö", "üß"]);
    }

    #[test]
    fn test_fixed_across_refills() {
        let source = Dribble {
            data: b"aabbccdd",
            step: 3,
        };
        let mut segmenter = RecordSegmenter::new(source, RecordBoundary::FixedLength(2));
        let mut records = Vec::new();
        segmenter
            .run(|r| {
                records.push(r.to_string());
                Ok(())
            })
            .unwrap();
        assert_eq!(records, ["aa", "bb", "cc", "dd"]);
    }

    // ==================== property tests ====================

    proptest! {
        #[test]
        fn prop_fixed_round_trip(body in "[a-z]{0,40}", len in 1usize..8) {
            // Truncate to an exact multiple of the record length.
            let keep = (body.len() / len) * len;
            let input = &body[..keep];
            let records = collect_fixed(input, len);
            prop_assert_eq!(records.concat(), input);
        }

        #[test]
        fn prop_separator_count(fields in proptest::collection::vec("[a-y]{0,5}", 1..8), step in 1usize..16) {
            let input = fields.join(";");
            let records = collect_separated(&input, ';', None, step);
            prop_assert_eq!(records.len(), fields.len());
            prop_assert_eq!(records, fields);
        }
    }
}
