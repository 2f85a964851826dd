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

//! Error types for schema compilation and event emission.
//!
//! Two error families exist: [`SchemaError`] for self-contradictory
//! configuration, raised only while a schema is compiled and never at
//! record-processing time, and [`EmitError`] for failures while delivering
//! events to a sink.

use thiserror::Error;

/// A configuration problem detected while compiling a schema.
///
/// All variants are fatal for schema construction. A schema that compiled
/// successfully never raises one of these during record processing.
#[derive(Error, Debug)]
pub enum SchemaError {
    /// Two sibling blocks declare the same start key.
    #[error("duplicate start-key '{key}' under block '{block}'")]
    DuplicateKey { key: String, block: String },

    /// A node configures the same character as separator and escape.
    #[error("element '{name}': separator and escape characters must differ")]
    SeparatorEscapeClash { name: String },

    /// A `choose` node declares branches without a selector.
    #[error("choose '{name}': a selector must be declared before any branch")]
    MissingSelector { name: String },

    /// A key definition with no attribute extractions.
    #[error("key definition '{name}': at least one attribute must be defined")]
    EmptyKeyDefinition { name: String },

    /// Two key definitions share a name (or both are anonymous).
    #[error("duplicate key definition '{0}'")]
    DuplicateKeyDefinition(String),

    /// A block references a key definition that was never declared.
    #[error("unknown key definition '{0}'")]
    UnknownKeyDefinition(String),

    /// No anonymous (default) key definition was declared.
    #[error("a default key definition is required")]
    MissingKeyDefinition,

    /// A character-valued setting could not be parsed.
    #[error("invalid character literal '{0}'")]
    InvalidCharLiteral(String),

    /// An attribute requests a formatter type with no registered factory.
    #[error("unknown formatter type '{0}'")]
    UnknownFormatter(String),

    /// A formatter rejected its configured options.
    #[error("formatter option '{option}' is invalid: {message}")]
    FormatterOptions { option: String, message: String },

    /// The configured source encoding is not supported.
    #[error("unsupported encoding '{0}'")]
    UnknownEncoding(String),

    /// Record segmentation needs exactly one boundary setting.
    #[error("exactly one of separator-char and record-length is required")]
    RecordBoundary,

    /// A content node needs exactly one source.
    #[error("content '{name}': exactly one of file and provider is required")]
    ContentSource { name: String },

    /// The configuration text could not be deserialized.
    #[error("configuration parse error: {0}")]
    Parse(String),

    /// Any other structural contradiction.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl SchemaError {
    /// Create a generic invalid-configuration error.
    #[inline]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// A failure while emitting structural events to a sink.
#[derive(Error, Debug)]
pub enum EmitError {
    /// IO error from the sink or an included source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The sink rejected an event.
    #[error("event sink error: {0}")]
    Sink(String),

    /// A content provider failed while emitting its sub-document.
    #[error("content inclusion failed: {0}")]
    Content(String),
}

impl EmitError {
    /// Create a sink error.
    #[inline]
    pub fn sink(message: impl Into<String>) -> Self {
        Self::Sink(message.into())
    }

    /// Create a content inclusion error.
    #[inline]
    pub fn content(message: impl Into<String>) -> Self {
        Self::Content(message.into())
    }
}

/// Result type for schema compilation.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for event emission.
pub type EmitResult<T> = Result<T, EmitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_key_display() {
        let err = SchemaError::DuplicateKey {
            key: "010".to_string(),
            block: "HEADER".to_string(),
        };
        let msg = format!("{}", err);
        assert!(msg.contains("010"));
        assert!(msg.contains("HEADER"));
    }

    #[test]
    fn test_separator_escape_clash_display() {
        let err = SchemaError::SeparatorEscapeClash {
            name: "line".to_string(),
        };
        assert!(format!("{}", err).contains("line"));
    }

    #[test]
    fn test_invalid_constructor() {
        let err = SchemaError::invalid("something is off");
        assert!(matches!(err, SchemaError::Invalid(_)));
        assert!(format!("{}", err).contains("something is off"));
    }

    #[test]
    fn test_emit_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: EmitError = io_err.into();
        assert!(matches!(err, EmitError::Io(_)));
        assert!(format!("{}", err).contains("pipe closed"));
    }

    #[test]
    fn test_emit_error_sink() {
        let err = EmitError::sink("writer is closed");
        assert!(format!("{}", err).contains("writer is closed"));
    }

    #[test]
    fn test_emit_error_content() {
        let err = EmitError::content("missing provider");
        assert!(format!("{}", err).contains("missing provider"));
    }
}
