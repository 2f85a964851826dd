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

//! The flat stream reader.
//!
//! Every record of the stream is handed to the same ordered list of
//! top-level schema nodes — the mode for uniform record layouts, or for
//! per-record dispatch through a `choose` node. The output is bracketed in
//! the configured document element.
//!
//! ```rust
//! use fdl_core::{EventBuffer, FormatterRegistry};
//! use fdl_stream::FlatReader;
//! use std::io::Cursor;
//!
//! let config = r#"{
//!     "name": "people",
//!     "separator-char": "\n",
//!     "elements": [
//!         {"kind": "element", "name": "person", "children": [
//!             {"kind": "attribute", "name": "last", "start": 1, "size": 8},
//!             {"kind": "attribute", "name": "first", "start": 9, "size": 10}
//!         ]}
//!     ]
//! }"#;
//!
//! let reader = FlatReader::from_json(config, &FormatterRegistry::new()).unwrap();
//! let mut events = EventBuffer::new();
//! reader
//!     .parse(Cursor::new("SMITH   JOHN      \nJONES   MARY      "), &mut events)
//!     .unwrap();
//!
//! assert_eq!(events.open_names(), vec!["people", "person", "person"]);
//! assert_eq!(events.attributes_of("person").unwrap().get("last"), Some("SMITH"));
//! ```

use crate::error::StreamResult;
use crate::reader::{RecordConfig, SegmentSpec};
use fdl_core::config::{Compiler, Inherited, NodeConfig};
use fdl_core::{
    Attributes, ChildSchema, EventSink, FormatterRegistry, ParseContext, ProviderRegistry,
    SchemaError, SchemaResult,
};
use serde::Deserialize;
use std::io::Read;

/// Configuration of a flat reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FlatConfig {
    /// Document element name; empty for no wrapper.
    pub name: String,
    #[serde(flatten)]
    pub record: RecordConfig,
    /// Default for malformed-character replacement, inherited by all nodes.
    pub replace_invalid_chars: Option<bool>,
    /// Top-level schema nodes, applied to every record in order.
    #[serde(default)]
    pub elements: Vec<NodeConfig>,
}

/// Compiled flat reader, shareable across concurrent streams.
#[derive(Debug)]
pub struct FlatReader {
    name: String,
    nodes: Vec<ChildSchema>,
    spec: SegmentSpec,
    content_slots: usize,
}

impl FlatReader {
    /// Compile a configuration into a reader.
    pub fn from_config(config: &FlatConfig, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let spec = config.record.compile()?;
        let inherit = Inherited {
            escape: None,
            replace_malformed: config.replace_invalid_chars.unwrap_or(false),
        };
        let mut compiler = Compiler::new(registry);
        let mut nodes = Vec::with_capacity(config.elements.len());
        for node in &config.elements {
            nodes.push(compiler.compile_node(node, inherit)?);
        }
        Ok(Self {
            name: config.name.clone(),
            nodes,
            spec,
            content_slots: compiler.content_slots(),
        })
    }

    /// Compile from JSON configuration text.
    pub fn from_json(text: &str, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let config: FlatConfig =
            serde_json::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_config(&config, registry)
    }

    /// Compile from YAML configuration text.
    pub fn from_yaml(text: &str, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let config: FlatConfig =
            serde_yaml::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_config(&config, registry)
    }

    /// Process one byte stream, emitting events into `sink`.
    pub fn parse<R: Read>(&self, input: R, sink: &mut dyn EventSink) -> StreamResult<()> {
        self.parse_with(input, sink, &ProviderRegistry::new())
    }

    /// Like [`parse`](Self::parse), with content providers available to
    /// `content` nodes.
    pub fn parse_with<R: Read>(
        &self,
        input: R,
        sink: &mut dyn EventSink,
        providers: &ProviderRegistry,
    ) -> StreamResult<()> {
        let mut ctx = ParseContext::new(self.content_slots, providers);
        let mut segmenter = self.spec.segmenter(input);

        sink.start_stream()?;
        if !self.name.is_empty() {
            sink.open(&self.name, &Attributes::new())?;
        }
        segmenter.run(|record| {
            if record.is_empty() {
                return Ok(());
            }
            for node in &self.nodes {
                node.parse(record, &mut ctx, sink)?;
            }
            Ok(())
        })?;
        if !self.name.is_empty() {
            sink.close(&self.name)?;
        }
        sink.end_stream()?;
        Ok(())
    }
}
