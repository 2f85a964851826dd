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

//! Declarative schema configuration and its compiler.
//!
//! Schemas are described as a serde tree (JSON or YAML work equally well)
//! and compiled once into the immutable node types of this crate. All
//! structural validation happens here, at load time; a schema that compiled
//! cleanly never raises configuration errors while records are processed.
//!
//! Node kinds are selected by a `kind` tag:
//!
//! ```yaml
//! kind: element
//! name: line
//! separator: ";"
//! children:
//!   - kind: attribute
//!     name: code
//!     index: 1
//! ```
//!
//! Positional settings are 1-based in configuration (`start: 2, size: 3`
//! covers the second through fourth characters), matching how fixed-width
//! layouts are documented in practice. Character-valued settings accept
//! backslash escapes such as `"\t"` or `""`.

use crate::attribute::AttributeSchema;
use crate::choose::{Branch, ChooseSchema, Selector};
use crate::content::{ContentMode, ContentSchema, ContentSource};
use crate::element::{ChildSchema, ElementSchema};
use crate::error::{SchemaError, SchemaResult};
use crate::format::{FormatterRegistry, FORMAT_OPTION, PARSE_OPTION, TYPE_OPTION};
use crate::key::KeyDefinition;
use crate::span::Span;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Settings shared by every schema node kind.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct NodeCommon {
    /// Node name; empty names make anonymous wrappers.
    #[serde(default)]
    pub name: String,
    /// 1-based start offset.
    pub start: Option<usize>,
    /// Explicit field size; wins over `end`.
    pub size: Option<usize>,
    /// 1-based inclusive end position.
    pub end: Option<usize>,
    /// Trim extracted values; defaults to true.
    pub trim: Option<bool>,
    /// Escape character, inherited from the parent when unset.
    pub escape: Option<String>,
    /// Replace XML-illegal characters, inherited when unset.
    pub replace_invalid_chars: Option<bool>,
    /// Field index under a separator-splitting parent; 0 = whole record.
    #[serde(default)]
    pub index: usize,
}

/// Configuration of an `attribute` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AttributeConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Formatter type; absence disables formatting.
    #[serde(rename = "type")]
    pub value_type: Option<String>,
    /// Formatter output pattern.
    pub format: Option<String>,
    /// Formatter input pattern.
    pub parse: Option<String>,
}

/// Configuration of an `element` node.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ElementConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Field separator; absence makes the element unsplit.
    pub separator: Option<String>,
    /// Emit leftover text as character content after the children.
    #[serde(default)]
    pub show_text: bool,
    #[serde(default)]
    pub children: Vec<NodeConfig>,
}

/// Configuration of the selector of a `choose` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SelectorConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
}

/// Configuration of a `when`/`otherwise` branch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct BranchConfig {
    /// Selector value matched by this branch; required for `when`,
    /// ignored for `otherwise`.
    pub value: Option<String>,
    #[serde(flatten)]
    pub element: ElementConfig,
}

/// Configuration of a `choose` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ChooseConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    pub separator: Option<String>,
    /// How to derive the branch-selection value.
    pub selector: Option<SelectorConfig>,
    #[serde(default)]
    pub when: Vec<BranchConfig>,
    pub otherwise: Option<Box<BranchConfig>>,
}

/// Configuration of a `content` node.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ContentConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Wrap the spliced content in this node's name; defaults to true.
    pub use_name: Option<bool>,
    /// `once` or `many`; unknown values fall back to `many` with a warning.
    pub mode: Option<String>,
    /// Include a file's raw text as character content.
    pub file: Option<PathBuf>,
    /// Emit a registered provider's events.
    pub provider: Option<String>,
}

/// Configuration of a `key-definition`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct KeyDefConfig {
    #[serde(flatten)]
    pub common: NodeCommon,
    /// Separator for index-addressed key attributes.
    pub separator: Option<String>,
    /// Joiner between multiple attribute values.
    pub join_char: Option<String>,
    #[serde(default)]
    pub attributes: Vec<AttributeConfig>,
}

/// One schema node of any kind, selected by the `kind` tag.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NodeConfig {
    Attribute(AttributeConfig),
    Element(ElementConfig),
    Choose(ChooseConfig),
    Content(ContentConfig),
}

impl NodeConfig {
    fn common(&self) -> &NodeCommon {
        match self {
            NodeConfig::Attribute(a) => &a.common,
            NodeConfig::Element(e) => &e.common,
            NodeConfig::Choose(c) => &c.common,
            NodeConfig::Content(c) => &c.common,
        }
    }
}

/// Settings a node inherits from its parent when it does not configure them.
#[derive(Debug, Clone, Copy, Default)]
pub struct Inherited {
    pub escape: Option<char>,
    pub replace_malformed: bool,
}

/// Parse a single-character setting, honoring backslash escapes
/// (`\n`, `\t`, `\r`, `\0`, `\\`, `\uXXXX`).
pub fn parse_char_literal(input: &str) -> SchemaResult<char> {
    let err = || SchemaError::InvalidCharLiteral(input.to_string());
    let mut chars = input.chars();
    let first = chars.next().ok_or_else(err)?;
    if first != '\\' {
        return match chars.next() {
            None => Ok(first),
            Some(_) => Err(err()),
        };
    }
    let escaped = chars.next().ok_or_else(err)?;
    if escaped == 'u' {
        let hex: String = chars.collect();
        let hex = hex.trim_start_matches('{').trim_end_matches('}');
        let code = u32::from_str_radix(hex, 16).map_err(|_| err())?;
        return char::from_u32(code).ok_or_else(err);
    }
    let value = match escaped {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        '0' => '\0',
        '\\' => '\\',
        '\'' => '\'',
        '"' => '"',
        _ => return Err(err()),
    };
    match chars.next() {
        None => Ok(value),
        Some(_) => Err(err()),
    }
}

fn parse_opt_char(input: &Option<String>) -> SchemaResult<Option<char>> {
    match input {
        None => Ok(None),
        Some(s) if s.is_empty() => Ok(None),
        Some(s) => parse_char_literal(s).map(Some),
    }
}

/// Compiles configuration trees into immutable schema nodes.
///
/// One compiler instance builds one reader's whole schema so that `content`
/// nodes receive unique per-stream state slots.
#[derive(Debug)]
pub struct Compiler<'a> {
    registry: &'a FormatterRegistry,
    content_slots: usize,
}

impl<'a> Compiler<'a> {
    pub fn new(registry: &'a FormatterRegistry) -> Self {
        Self {
            registry,
            content_slots: 0,
        }
    }

    /// Number of `content` nodes compiled so far; sizes the per-stream
    /// `ParseContext`.
    pub fn content_slots(&self) -> usize {
        self.content_slots
    }

    fn compile_span(
        &self,
        common: &NodeCommon,
        inherit: Inherited,
    ) -> SchemaResult<(Span, Inherited)> {
        let start = common.start.unwrap_or(0).saturating_sub(1);
        let length = match (common.size, common.end) {
            (Some(size), _) => Some(size),
            (None, Some(end)) => {
                if end <= start {
                    return Err(SchemaError::invalid(format!(
                        "node '{}': end {} does not lie past start",
                        common.name, end
                    )));
                }
                Some(end - start)
            }
            (None, None) => None,
        };
        let escape = parse_opt_char(&common.escape)?.or(inherit.escape);
        let replace = common
            .replace_invalid_chars
            .unwrap_or(inherit.replace_malformed);
        let span = Span::new(
            common.name.clone(),
            start,
            length,
            common.trim.unwrap_or(true),
            replace,
            escape,
        );
        let child_inherit = Inherited {
            escape,
            replace_malformed: replace,
        };
        Ok((span, child_inherit))
    }

    /// Compile an attribute node.
    pub fn compile_attribute(
        &self,
        config: &AttributeConfig,
        inherit: Inherited,
    ) -> SchemaResult<AttributeSchema> {
        if config.common.name.is_empty() {
            return Err(SchemaError::invalid("attribute nodes require a name"));
        }
        let (span, _) = self.compile_span(&config.common, inherit)?;
        match &config.value_type {
            Some(value_type) if !value_type.is_empty() => {
                let mut options = HashMap::new();
                options.insert(TYPE_OPTION.to_string(), value_type.clone());
                if let Some(format) = &config.format {
                    options.insert(FORMAT_OPTION.to_string(), format.clone());
                }
                if let Some(parse) = &config.parse {
                    options.insert(PARSE_OPTION.to_string(), parse.clone());
                }
                let formatter = self.registry.create(&options)?;
                Ok(AttributeSchema::with_formatter(span, formatter))
            }
            _ => Ok(AttributeSchema::new(span)),
        }
    }

    /// Compile an element node and its subtree.
    pub fn compile_element(
        &mut self,
        config: &ElementConfig,
        inherit: Inherited,
    ) -> SchemaResult<ElementSchema> {
        let (span, child_inherit) = self.compile_span(&config.common, inherit)?;
        let separator = parse_opt_char(&config.separator)?;
        if let (Some(sep), Some(esc)) = (separator, span.escape()) {
            if sep == esc {
                return Err(SchemaError::SeparatorEscapeClash {
                    name: config.common.name.clone(),
                });
            }
        }

        let mut element = ElementSchema::new(span, separator, config.show_text);
        for child in &config.children {
            // Field indices only mean something under a splitting parent.
            let index = if separator.is_some() {
                child.common().index
            } else {
                0
            };
            match child {
                NodeConfig::Attribute(attribute) => {
                    element.add_attribute(index, self.compile_attribute(attribute, child_inherit)?);
                }
                _ => element.add_child(index, self.compile_node(child, child_inherit)?),
            }
        }
        Ok(element)
    }

    /// Compile a choose node.
    pub fn compile_choose(
        &mut self,
        config: &ChooseConfig,
        inherit: Inherited,
    ) -> SchemaResult<ChooseSchema> {
        let (span, child_inherit) = self.compile_span(&config.common, inherit)?;
        let separator = parse_opt_char(&config.separator)?;
        if let (Some(sep), Some(esc)) = (separator, span.escape()) {
            if sep == esc {
                return Err(SchemaError::SeparatorEscapeClash {
                    name: config.common.name.clone(),
                });
            }
        }

        let selector_config = config
            .selector
            .as_ref()
            .ok_or_else(|| SchemaError::MissingSelector {
                name: config.common.name.clone(),
            })?;
        let (selector_span, _) = self.compile_span(&selector_config.common, child_inherit)?;
        let selector = Selector::new(selector_span, selector_config.common.index);

        let mut choose = ChooseSchema::new(span, separator, selector);
        for when in &config.when {
            let value = when.value.as_ref().ok_or_else(|| {
                SchemaError::invalid(format!(
                    "choose '{}': a when branch requires a value",
                    config.common.name
                ))
            })?;
            let branch_element = self.compile_element(&when.element, child_inherit)?;
            choose.add_branch(
                value.clone(),
                Branch::new(when.element.common.index, branch_element),
            );
        }
        if let Some(otherwise) = &config.otherwise {
            let branch_element = self.compile_element(&otherwise.element, child_inherit)?;
            choose.set_otherwise(Branch::new(otherwise.element.common.index, branch_element));
        }
        Ok(choose)
    }

    /// Compile a content node.
    pub fn compile_content(
        &mut self,
        config: &ContentConfig,
        _inherit: Inherited,
    ) -> SchemaResult<ContentSchema> {
        if config.common.name.is_empty() {
            return Err(SchemaError::invalid("content nodes require a name"));
        }
        let mode = match config.mode.as_deref() {
            None | Some("many") => ContentMode::Many,
            Some("once") => ContentMode::Once,
            Some(other) => {
                log::warn!(
                    "content '{}': unknown mode '{}', using 'many'",
                    config.common.name,
                    other
                );
                ContentMode::Many
            }
        };
        let source = match (&config.file, &config.provider) {
            (Some(file), None) => ContentSource::File(file.clone()),
            (None, Some(provider)) => ContentSource::Provider(provider.clone()),
            _ => {
                return Err(SchemaError::ContentSource {
                    name: config.common.name.clone(),
                })
            }
        };
        let slot = self.content_slots;
        self.content_slots += 1;
        Ok(ContentSchema::new(
            config.common.name.clone(),
            config.use_name.unwrap_or(true),
            mode,
            source,
            slot,
        ))
    }

    /// Compile any non-attribute node into a child schema.
    pub fn compile_node(
        &mut self,
        config: &NodeConfig,
        inherit: Inherited,
    ) -> SchemaResult<ChildSchema> {
        match config {
            NodeConfig::Element(element) => Ok(ChildSchema::Element(
                self.compile_element(element, inherit)?,
            )),
            NodeConfig::Choose(choose) => {
                Ok(ChildSchema::Choose(self.compile_choose(choose, inherit)?))
            }
            NodeConfig::Content(content) => Ok(ChildSchema::Content(
                self.compile_content(content, inherit)?,
            )),
            NodeConfig::Attribute(_) => Err(SchemaError::invalid(
                "attribute nodes cannot stand alone; place them inside an element",
            )),
        }
    }

    /// Compile a key definition.
    pub fn compile_key_definition(
        &mut self,
        config: &KeyDefConfig,
        inherit: Inherited,
    ) -> SchemaResult<KeyDefinition> {
        if config.attributes.is_empty() {
            return Err(SchemaError::EmptyKeyDefinition {
                name: config.common.name.clone(),
            });
        }
        let (span, child_inherit) = self.compile_span(&config.common, inherit)?;
        let separator = parse_opt_char(&config.separator)?;
        let mut element = ElementSchema::new(span, separator, false);
        for attribute in &config.attributes {
            let index = if separator.is_some() {
                attribute.common.index
            } else {
                0
            };
            element.add_attribute(index, self.compile_attribute(attribute, child_inherit)?);
        }
        Ok(KeyDefinition::new(element, config.join_char.clone()))
    }
}
