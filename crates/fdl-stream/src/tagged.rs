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

//! The tagged stream reader.
//!
//! Tagged streams interleave records of different layouts, discriminated by
//! a key derived from each record. The schema arranges named blocks in a
//! hierarchy; at run time a cursor walks that hierarchy, opening a nested
//! scope when a record's key matches a child block, closing the current
//! scope on its end key, and cascading implicit closes up the ancestor
//! chain when a key belongs further out.
//!
//! Per record, with `key` derived via the default key definition (or a
//! block-specific override):
//!
//! 1. a child of the current block matches `key` — descend: validate the
//!    declared sibling order (out-of-order keys warn, they do not abort),
//!    open the child with its extracted attributes, run its field schema.
//!    `skip` blocks are validated but never entered;
//! 2. otherwise, if the current block has an end key — matching records
//!    close the block and ascend; anything else warns and stays put;
//! 3. otherwise the block closes implicitly: close, ascend, and retry the
//!    whole transition against the parent with a freshly derived key. At
//!    the root the key is unresolvable, which is fatal for the stream.
//!
//! The block tree is an arena with index handles; parent links are plain
//! indices, so the shared schema holds no reference cycles and stays
//! `Send + Sync`. All cursor state lives on the stack of one `parse` call.

use crate::error::{StreamError, StreamResult};
use crate::reader::{RecordConfig, SegmentSpec};
use fdl_core::config::{parse_char_literal, Compiler, ElementConfig, Inherited, KeyDefConfig};
use fdl_core::{
    Attributes, ElementSchema, EventSink, FormatterRegistry, KeyDefinition, ParseContext,
    ProviderRegistry, SchemaError, SchemaResult,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::io::Read;

/// Configuration of one block in the tagged hierarchy.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BlockConfig {
    /// Discriminator value that selects this block from its parent.
    pub start_key: String,
    /// Discriminator value that closes this block; empty means the block
    /// closes implicitly when an outer key arrives.
    #[serde(default)]
    pub end_key: String,
    /// Validate but never enter this block.
    #[serde(default)]
    pub skip: bool,
    /// Extra label attribute emitted on the block's open event.
    #[serde(default)]
    pub label: String,
    /// Printable key name; required when `key-definition` is set, and used
    /// to register the override on the parent block.
    pub key: Option<String>,
    /// Name of the key definition used to re-derive keys that match this
    /// block's `key` name.
    pub key_definition: Option<String>,
    /// Field extraction schema of this block (name, separator, children).
    #[serde(flatten)]
    pub element: ElementConfig,
    /// Nested blocks.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

/// Configuration of a tagged reader.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaggedConfig {
    /// Document element name.
    pub name: String,
    #[serde(flatten)]
    pub record: RecordConfig,
    /// Annotate every block with the input line it started on.
    #[serde(default)]
    pub print_line_number: bool,
    /// Annotate every block with its resolved key name.
    #[serde(default)]
    pub print_key: bool,
    /// Suppress ordering and unmatched-key warnings.
    #[serde(default)]
    pub quiet_missing: bool,
    /// Default for malformed-character replacement, inherited by all blocks.
    pub replace_invalid_chars: Option<bool>,
    /// Key definitions; exactly one must be anonymous (the default).
    pub key_definitions: Vec<KeyDefConfig>,
    /// Top-level blocks.
    #[serde(default)]
    pub blocks: Vec<BlockConfig>,
}

const ROOT: usize = 0;

#[derive(Debug)]
struct Block {
    name: String,
    start_key: String,
    end_key: String,
    skip: bool,
    label: String,
    key_name: String,
    sibling_index: usize,
    parent: Option<usize>,
    children: HashMap<String, usize>,
    /// Raw default-derived key -> key definition name to re-derive with.
    key_overrides: HashMap<String, String>,
    element: Option<ElementSchema>,
}

/// Arena of blocks; index 0 is the synthetic root.
#[derive(Debug)]
struct BlockTree {
    blocks: Vec<Block>,
}

impl BlockTree {
    fn new() -> Self {
        Self {
            blocks: vec![Block {
                name: String::new(),
                start_key: String::new(),
                end_key: String::new(),
                skip: false,
                label: String::new(),
                key_name: "ROOT".to_string(),
                sibling_index: 0,
                parent: None,
                children: HashMap::new(),
                key_overrides: HashMap::new(),
                element: None,
            }],
        }
    }

    #[inline]
    fn block(&self, id: usize) -> &Block {
        &self.blocks[id]
    }

    fn add_children(
        &mut self,
        parent: usize,
        configs: &[BlockConfig],
        compiler: &mut Compiler<'_>,
        inherit: Inherited,
        named_keys: &HashMap<String, KeyDefinition>,
    ) -> SchemaResult<()> {
        for (sibling_index, config) in configs.iter().enumerate() {
            if config.element.common.name.is_empty() {
                return Err(SchemaError::invalid(format!(
                    "block with start-key '{}' requires a name",
                    config.start_key
                )));
            }
            if config.start_key.is_empty() {
                return Err(SchemaError::invalid(format!(
                    "block '{}' requires a start-key",
                    config.element.common.name
                )));
            }
            if self.blocks[parent].children.contains_key(&config.start_key) {
                return Err(SchemaError::DuplicateKey {
                    key: config.start_key.clone(),
                    block: self.blocks[parent].key_name.clone(),
                });
            }

            let key_name = match &config.key_definition {
                Some(definition) => {
                    if !named_keys.contains_key(definition) {
                        return Err(SchemaError::UnknownKeyDefinition(definition.clone()));
                    }
                    config
                        .key
                        .clone()
                        .filter(|k| !k.is_empty())
                        .ok_or_else(|| {
                            SchemaError::invalid(format!(
                                "block '{}': key-definition requires a key name",
                                config.element.common.name
                            ))
                        })?
                }
                None => config.start_key.clone(),
            };

            let element = compiler.compile_element(&config.element, inherit)?;
            let child_inherit = Inherited {
                escape: match &config.element.common.escape {
                    Some(s) if !s.is_empty() => Some(parse_char_literal(s)?),
                    _ => inherit.escape,
                },
                replace_malformed: config
                    .element
                    .common
                    .replace_invalid_chars
                    .unwrap_or(inherit.replace_malformed),
            };

            let id = self.blocks.len();
            self.blocks.push(Block {
                name: config.element.common.name.clone(),
                start_key: config.start_key.clone(),
                end_key: config.end_key.clone(),
                skip: config.skip,
                label: config.label.clone(),
                key_name: key_name.clone(),
                sibling_index,
                parent: Some(parent),
                children: HashMap::new(),
                key_overrides: HashMap::new(),
                element: Some(element),
            });
            self.blocks[parent]
                .children
                .insert(config.start_key.clone(), id);
            if let Some(definition) = &config.key_definition {
                self.blocks[parent]
                    .key_overrides
                    .insert(key_name, definition.clone());
            }

            self.add_children(id, &config.blocks, compiler, child_inherit, named_keys)?;
        }
        Ok(())
    }
}

/// Mutable cursor state of one parse invocation.
#[derive(Debug)]
struct Cursor {
    current: usize,
    /// Last seen sibling index per nesting depth.
    stack: Vec<usize>,
    line: usize,
}

/// Compiled tagged reader, shareable across concurrent streams.
#[derive(Debug)]
pub struct TaggedReader {
    document: String,
    tree: BlockTree,
    default_key: KeyDefinition,
    named_keys: HashMap<String, KeyDefinition>,
    print_line_number: bool,
    print_key: bool,
    quiet_missing: bool,
    spec: SegmentSpec,
    content_slots: usize,
}

impl TaggedReader {
    /// Compile a configuration into a reader.
    pub fn from_config(config: &TaggedConfig, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let spec = config.record.compile()?;
        let inherit = Inherited {
            escape: None,
            replace_malformed: config.replace_invalid_chars.unwrap_or(false),
        };
        let mut compiler = Compiler::new(registry);

        let mut default_key = None;
        let mut named_keys = HashMap::new();
        for definition_config in &config.key_definitions {
            let definition = compiler.compile_key_definition(definition_config, inherit)?;
            if definition.name().is_empty() {
                if default_key.is_some() {
                    return Err(SchemaError::DuplicateKeyDefinition("(default)".to_string()));
                }
                default_key = Some(definition);
            } else {
                let name = definition.name().to_string();
                if named_keys.contains_key(&name) {
                    return Err(SchemaError::DuplicateKeyDefinition(name));
                }
                named_keys.insert(name, definition);
            }
        }
        let default_key = default_key.ok_or(SchemaError::MissingKeyDefinition)?;

        let mut tree = BlockTree::new();
        tree.add_children(ROOT, &config.blocks, &mut compiler, inherit, &named_keys)?;

        Ok(Self {
            document: config.name.clone(),
            tree,
            default_key,
            named_keys,
            print_line_number: config.print_line_number,
            print_key: config.print_key,
            quiet_missing: config.quiet_missing,
            spec,
            content_slots: compiler.content_slots(),
        })
    }

    /// Compile from JSON configuration text.
    pub fn from_json(text: &str, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let config: TaggedConfig =
            serde_json::from_str(text).map_err(|e| SchemaError::Parse(e.to_string()))?;
        Self::from_config(&config, registry)
    }

    /// Compile from YAML configuration text.
    pub fn from_yaml(text: &str, registry: &FormatterRegistry) -> SchemaResult<Self> {
        let config: TaggedConfig =
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
        let mut cursor = Cursor {
            current: ROOT,
            stack: vec![0],
            line: 0,
        };
        let mut segmenter = self.spec.segmenter(input);

        sink.start_stream()?;
        sink.open(&self.document, &Attributes::new())?;
        segmenter.run(|record| {
            cursor.line += 1;
            match self.derive_key(cursor.current, record) {
                Some(key) => self.transition(&mut cursor, key, record, &mut ctx, sink),
                None => Ok(()),
            }
        })?;

        // A block that closes implicitly is still open here; synthesize its
        // close before the document close (the root has no name and is
        // excluded by the name check).
        let current = self.tree.block(cursor.current);
        if current.end_key.trim().is_empty() && !current.name.trim().is_empty() {
            sink.close(&current.name)?;
        }
        sink.close(&self.document)?;
        sink.end_stream()?;
        Ok(())
    }

    /// Derive the record's key: the default definition first, re-derived
    /// through the current block's override when one is registered for the
    /// raw key.
    fn derive_key(&self, block: usize, record: &str) -> Option<String> {
        let key = self.default_key.parse_key(record)?;
        if let Some(definition_name) = self.tree.block(block).key_overrides.get(&key) {
            if let Some(definition) = self.named_keys.get(definition_name) {
                return definition.parse_key(record);
            }
        }
        Some(key)
    }

    fn transition(
        &self,
        cursor: &mut Cursor,
        mut key: String,
        record: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> StreamResult<()> {
        loop {
            let current = self.tree.block(cursor.current);

            if let Some(&child) = current.children.get(&key) {
                return self.descend(cursor, child, record, ctx, sink);
            }

            if !current.end_key.is_empty() {
                if key == current.end_key {
                    sink.close(&current.name)?;
                    cursor.stack.pop();
                    if let Some(parent) = current.parent {
                        cursor.current = parent;
                    }
                } else if !self.quiet_missing {
                    log::warn!(
                        "line {}: key '{}' is not defined under block '{}'",
                        cursor.line,
                        key,
                        current.key_name
                    );
                }
                return Ok(());
            }

            // Implicit close: cascade toward the root, re-deriving the key
            // since the parent may register a different override.
            match current.parent {
                None => {
                    return Err(StreamError::KeyResolution {
                        line: cursor.line,
                        key,
                    })
                }
                Some(parent) => {
                    sink.close(&current.name)?;
                    cursor.stack.pop();
                    cursor.current = parent;
                    key = match self.derive_key(parent, record) {
                        Some(key) => key,
                        None => return Ok(()),
                    };
                }
            }
        }
    }

    fn descend(
        &self,
        cursor: &mut Cursor,
        child_id: usize,
        record: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> StreamResult<()> {
        let child = self.tree.block(child_id);

        let last_seen = cursor.stack.pop().unwrap_or(0);
        if child.sibling_index < last_seen && !self.quiet_missing {
            log::warn!(
                "line {}: key '{}' arrives after a later sibling under block '{}'",
                cursor.line,
                child.start_key,
                self.tree.block(cursor.current).key_name
            );
        }
        cursor.stack.push(child.sibling_index);

        if child.skip {
            return Ok(());
        }
        cursor.current = child_id;
        cursor.stack.push(0);

        let mut atts = match &child.element {
            Some(element) => element.attributes(record),
            None => Attributes::new(),
        };
        if self.print_key {
            atts.push("key", child.key_name.clone());
        }
        if !child.label.is_empty() {
            atts.push("label", child.label.clone());
        }
        if self.print_line_number {
            atts.push("line", cursor.line.to_string());
        }
        sink.open(&child.name, &atts)?;
        if let Some(element) = &child.element {
            element.emit_children(record, ctx, sink)?;
        }
        Ok(())
    }
}
