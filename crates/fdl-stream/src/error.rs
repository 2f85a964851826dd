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

//! Error types for stream reading.

use fdl_core::{EmitError, SchemaError};
use thiserror::Error;

/// Errors raised while a record stream is read.
///
/// Record-time problems are isolated per record wherever possible; the
/// variants here are the ones that end the stream. Output already emitted
/// before the failure is not rolled back.
#[derive(Error, Debug)]
pub enum StreamError {
    /// IO error on the byte source.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The reader configuration is contradictory.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// The event sink or a content provider failed.
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// A record grew past the configured maximum size.
    #[error("record {record} exceeds the maximum record size of {limit} characters")]
    RecordTooLarge { record: usize, limit: usize },

    /// No block in the entire ancestor chain resolves the record's key.
    /// The hierarchical position is unrecoverable, so the stream halts.
    #[error("line {line}: key '{key}' cannot be resolved anywhere in the block hierarchy")]
    KeyResolution { line: usize, key: String },
}

impl StreamError {
    /// The input line the error is tagged with, when it has one.
    #[inline]
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::KeyResolution { line, .. } => Some(*line),
            _ => None,
        }
    }
}

/// Result type for stream operations.
pub type StreamResult<T> = Result<T, StreamError>;
