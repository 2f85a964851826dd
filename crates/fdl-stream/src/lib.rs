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

//! FDL stream readers: bytes in, structural events out.
//!
//! This crate drives the `fdl-core` schema model over real byte streams:
//!
//! - [`RecordSegmenter`] turns an undifferentiated byte stream into
//!   discrete character records, by separator or fixed length, with
//!   escape-aware scanning that stays correct across buffer refills and at
//!   end of stream;
//! - [`FlatReader`] hands every record to the same top-level schema nodes;
//! - [`TaggedReader`] routes records through a hierarchical block tree
//!   keyed by a per-record discriminator, tracking nesting with a cursor.
//!
//! Readers are compiled once from a JSON or YAML configuration and are
//! immutable afterwards: one reader may serve many concurrent streams, each
//! `parse` call owning its segmenter, cursor and line counter. The byte
//! source is only read, never closed; the event sink is owned by the
//! caller.
//!
//! ```rust
//! use fdl_core::{EventBuffer, FormatterRegistry};
//! use fdl_stream::TaggedReader;
//! use std::io::Cursor;
//!
//! let config = r#"{
//!     "name": "batch",
//!     "separator-char": "\n",
//!     "key-definitions": [
//!         {"attributes": [{"name": "tag", "start": 1, "size": 1}]}
//!     ],
//!     "blocks": [
//!         {"name": "header", "start-key": "H", "end-key": "T", "children": [
//!             {"kind": "attribute", "name": "id", "start": 2, "size": 4}
//!         ], "blocks": [
//!             {"name": "detail", "start-key": "D", "children": [
//!                 {"kind": "attribute", "name": "amount", "start": 2}
//!             ]}
//!         ]}
//!     ]
//! }"#;
//!
//! let reader = TaggedReader::from_json(config, &FormatterRegistry::new()).unwrap();
//! let mut events = EventBuffer::new();
//! reader
//!     .parse(Cursor::new("H0001\nD100\nD250\nT"), &mut events)
//!     .unwrap();
//!
//! assert_eq!(
//!     events.open_names(),
//!     vec!["batch", "header", "detail", "detail"]
//! );
//! ```

pub mod decoder;
pub mod error;
pub mod flat;
pub mod reader;
pub mod segmenter;
pub mod tagged;

pub use decoder::{Encoding, StreamDecoder};
pub use error::{StreamError, StreamResult};
pub use flat::{FlatConfig, FlatReader};
pub use reader::RecordConfig;
pub use segmenter::{RecordBoundary, RecordSegmenter, SegmentOptions};
pub use tagged::{BlockConfig, TaggedConfig, TaggedReader};
