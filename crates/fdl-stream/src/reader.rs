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

//! Reader-level segmentation settings shared by both stream readers.

use crate::decoder::Encoding;
use crate::segmenter::{RecordBoundary, RecordSegmenter, SegmentOptions};
use fdl_core::config::parse_char_literal;
use fdl_core::{SchemaError, SchemaResult};
use serde::Deserialize;
use std::io::Read;

const DEFAULT_BUFFER_SIZE: usize = 8 * 1024;
const DEFAULT_MAX_RECORD_SIZE: usize = 1024 * 1024;

/// Record segmentation settings of a reader configuration.
///
/// Exactly one of `separator-char` and `record-length` must be set.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RecordConfig {
    /// Source encoding name; defaults to `utf-8`.
    pub encoding: Option<String>,
    /// Read size against the byte source.
    pub buffer_size: Option<usize>,
    /// Upper bound on one record, in characters.
    pub max_record_size: Option<usize>,
    /// Record separator character.
    pub separator_char: Option<String>,
    /// Fixed record length, in characters.
    pub record_length: Option<usize>,
    /// Escape character for the record separator.
    pub escape_char: Option<String>,
}

/// Compiled segmentation settings, ready to build per-stream segmenters.
#[derive(Debug, Clone)]
pub(crate) struct SegmentSpec {
    boundary: RecordBoundary,
    options: SegmentOptions,
}

impl RecordConfig {
    pub(crate) fn compile(&self) -> SchemaResult<SegmentSpec> {
        let encoding = match &self.encoding {
            Some(name) => Encoding::from_name(name)?,
            None => Encoding::Utf8,
        };
        let escape = match &self.escape_char {
            Some(s) if !s.is_empty() => Some(parse_char_literal(s)?),
            _ => None,
        };
        let boundary = match (&self.separator_char, self.record_length) {
            (Some(sep), None) if !sep.is_empty() => {
                let sep = parse_char_literal(sep)?;
                if escape == Some(sep) {
                    return Err(SchemaError::invalid(
                        "reader separator-char and escape-char must differ",
                    ));
                }
                RecordBoundary::Separator(sep)
            }
            (None, Some(len)) if len > 0 => RecordBoundary::FixedLength(len),
            _ => return Err(SchemaError::RecordBoundary),
        };

        let max_record_size = self.max_record_size.unwrap_or(DEFAULT_MAX_RECORD_SIZE);
        if let RecordBoundary::FixedLength(len) = boundary {
            if len > max_record_size {
                return Err(SchemaError::invalid(
                    "record-length cannot exceed max-record-size",
                ));
            }
        }

        Ok(SegmentSpec {
            boundary,
            options: SegmentOptions {
                encoding,
                escape,
                buffer_size: self.buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE),
                max_record_size,
            },
        })
    }
}

impl SegmentSpec {
    /// Build a fresh per-stream segmenter over a byte source.
    pub(crate) fn segmenter<R: Read>(&self, source: R) -> RecordSegmenter<R> {
        RecordSegmenter::with_options(source, self.boundary, self.options.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(json: &str) -> RecordConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_separator_mode_compiles() {
        let spec = config(r#"{"separator-char": "\n"}"#).compile().unwrap();
        assert_eq!(spec.boundary, RecordBoundary::Separator('\n'));
    }

    #[test]
    fn test_fixed_mode_compiles() {
        let spec = config(r#"{"record-length": 80}"#).compile().unwrap();
        assert_eq!(spec.boundary, RecordBoundary::FixedLength(80));
    }

    #[test]
    fn test_both_boundaries_rejected() {
        let result = config(r#"{"separator-char": "\n", "record-length": 80}"#).compile();
        assert!(matches!(result, Err(SchemaError::RecordBoundary)));
    }

    #[test]
    fn test_neither_boundary_rejected() {
        let result = config("{}").compile();
        assert!(matches!(result, Err(SchemaError::RecordBoundary)));
    }

    #[test]
    fn test_zero_record_length_rejected() {
        let result = config(r#"{"record-length": 0}"#).compile();
        assert!(matches!(result, Err(SchemaError::RecordBoundary)));
    }

    #[test]
    fn test_separator_equal_escape_rejected() {
        let result = config(r#"{"separator-char": ";", "escape-char": ";"}"#).compile();
        assert!(matches!(result, Err(SchemaError::Invalid(_))));
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let result = config(r#"{"separator-char": "\n", "encoding": "ebcdic"}"#).compile();
        assert!(matches!(result, Err(SchemaError::UnknownEncoding(_))));
    }

    #[test]
    fn test_record_length_larger_than_max_rejected() {
        let result = config(r#"{"record-length": 100, "max-record-size": 10}"#).compile();
        assert!(matches!(result, Err(SchemaError::Invalid(_))));
    }
}
