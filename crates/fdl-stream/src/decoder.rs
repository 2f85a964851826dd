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

//! Incremental byte-to-text decoding.
//!
//! The segmenter feeds raw refills through a [`StreamDecoder`], which
//! carries incomplete multi-byte sequences across refill boundaries and
//! silently drops malformed input — a decode anomaly never aborts a stream.
//! After the byte source is exhausted, [`StreamDecoder::finish`] signals end
//! of input so a trailing partial sequence is resolved under the same
//! policy.

use fdl_core::{SchemaError, SchemaResult};

/// Supported source encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Utf8,
    Latin1,
}

impl Encoding {
    /// Resolve a configured encoding name.
    pub fn from_name(name: &str) -> SchemaResult<Self> {
        let normalized = name.to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" => Ok(Self::Latin1),
            _ => Err(SchemaError::UnknownEncoding(name.to_string())),
        }
    }
}

/// Stateful incremental decoder for one stream.
#[derive(Debug)]
pub struct StreamDecoder {
    encoding: Encoding,
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new(encoding: Encoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// Decode one refill, appending text to `out`.
    ///
    /// An incomplete trailing sequence is held back for the next call;
    /// malformed sequences are skipped.
    pub fn decode(&mut self, bytes: &[u8], out: &mut String) {
        match self.encoding {
            Encoding::Latin1 => out.extend(bytes.iter().map(|&b| b as char)),
            Encoding::Utf8 => {
                if self.pending.is_empty() {
                    self.decode_utf8(bytes, out);
                } else {
                    let mut joined = std::mem::take(&mut self.pending);
                    joined.extend_from_slice(bytes);
                    self.decode_utf8(&joined, out);
                }
            }
        }
    }

    /// Signal end of input. A held-back partial sequence is malformed by
    /// definition and is dropped.
    pub fn finish(&mut self, _out: &mut String) {
        self.pending.clear();
    }

    fn decode_utf8(&mut self, mut bytes: &[u8], out: &mut String) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(text) => {
                    out.push_str(text);
                    return;
                }
                Err(e) => {
                    let (valid, rest) = bytes.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(bad) => {
                            log::debug!("dropping {} malformed input byte(s)", bad);
                            bytes = &rest[bad..];
                        }
                        None => {
                            self.pending = rest.to_vec();
                            return;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> String {
        let mut out = String::new();
        for chunk in chunks {
            decoder.decode(chunk, &mut out);
        }
        decoder.finish(&mut out);
        out
    }

    // ==================== encoding name tests ====================

    #[test]
    fn test_encoding_names() {
        assert_eq!(Encoding::from_name("UTF-8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_name("utf8").unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::from_name("ISO-8859-1").unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::from_name("latin_1").unwrap(), Encoding::Latin1);
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        assert!(matches!(
            Encoding::from_name("ebcdic"),
            Err(SchemaError::UnknownEncoding(_))
        ));
    }

    // ==================== utf-8 tests ====================

    #[test]
    fn test_utf8_plain() {
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        assert_eq!(decode_all(&mut decoder, &[b"hello"]), "hello");
    }

    #[test]
    fn test_utf8_char_split_across_refills() {
        let bytes = "für".as_bytes();
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        // Split in the middle of the two-byte 'ü'.
        assert_eq!(decode_all(&mut decoder, &[&bytes[..2], &bytes[2..]]), "für");
    }

    #[test]
    fn test_utf8_four_byte_char_split_three_ways() {
        let bytes = "a𝄞b".as_bytes();
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        let out = decode_all(&mut decoder, &[&bytes[..2], &bytes[2..4], &bytes[4..]]);
        assert_eq!(out, "a𝄞b");
    }

    #[test]
    fn test_utf8_malformed_bytes_dropped() {
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        let out = decode_all(&mut decoder, &[b"a\xFFb"]);
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_utf8_truncated_tail_dropped_at_finish() {
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        // 0xC3 starts a two-byte sequence that never completes.
        let out = decode_all(&mut decoder, &[b"ok\xC3"]);
        assert_eq!(out, "ok");
    }

    #[test]
    fn test_utf8_interrupted_sequence_keeps_following_text() {
        let mut decoder = StreamDecoder::new(Encoding::Utf8);
        // A lead byte followed by ASCII: the lead is malformed, 'A' is kept.
        let out = decode_all(&mut decoder, &[b"\xC3", b"A"]);
        assert_eq!(out, "A");
    }

    // ==================== latin-1 tests ====================

    #[test]
    fn test_latin1_maps_high_bytes() {
        let mut decoder = StreamDecoder::new(Encoding::Latin1);
        let out = decode_all(&mut decoder, &[&[b'f', 0xFC, b'r']]);
        assert_eq!(out, "für");
    }

    #[test]
    fn test_latin1_never_pends() {
        let mut decoder = StreamDecoder::new(Encoding::Latin1);
        let out = decode_all(&mut decoder, &[&[0xE9], &[0xE8]]);
        assert_eq!(out, "éè");
    }
}
