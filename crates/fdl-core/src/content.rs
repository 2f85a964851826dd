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

//! Embedding of externally produced sub-content.
//!
//! A `content` node splices a sub-document into the event stream: either the
//! raw text of a file (emitted as character content) or the events of a
//! named [`ContentProvider`] looked up in an explicit [`ProviderRegistry`].
//! In `once` mode the node fires at most once per stream; the fired flag
//! lives in the per-invocation [`ParseContext`], never on the shared schema,
//! so concurrent streams stay independent.

use crate::error::EmitResult;
use crate::event::{Attributes, EventSink};
use std::collections::HashMap;
use std::path::PathBuf;

/// Emits an externally produced sub-document into a sink.
pub trait ContentProvider: Send + Sync {
    /// Emit the sub-document as a balanced sequence of structural events.
    fn emit(&self, sink: &mut dyn EventSink) -> EmitResult<()>;
}

/// Explicit name-to-provider registry, resolved at parse time.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Box<dyn ContentProvider>>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under a name referenced by `content` nodes.
    pub fn register(&mut self, name: impl Into<String>, provider: Box<dyn ContentProvider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Look up a provider.
    pub fn get(&self, name: &str) -> Option<&dyn ContentProvider> {
        self.providers.get(name).map(|p| p.as_ref())
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Mutable per-invocation state threaded through one stream's parse.
///
/// Shared schemas carry no run-time state; everything that changes while a
/// stream is processed lives here or on the reader's own per-call locals.
#[derive(Debug)]
pub struct ParseContext<'a> {
    providers: &'a ProviderRegistry,
    fired: Vec<bool>,
}

impl<'a> ParseContext<'a> {
    /// A fresh context for one stream. `content_slots` is the number of
    /// `content` nodes in the compiled schema.
    pub fn new(content_slots: usize, providers: &'a ProviderRegistry) -> Self {
        Self {
            providers,
            fired: vec![false; content_slots],
        }
    }
}

/// When a content node fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentMode {
    /// At most once per stream.
    Once,
    /// On every invocation.
    Many,
}

/// Where a content node's sub-document comes from.
#[derive(Debug, Clone)]
pub enum ContentSource {
    /// Raw file text, emitted as character content.
    File(PathBuf),
    /// A registered [`ContentProvider`], emitted as events.
    Provider(String),
}

/// Compiled schema for a `content` node.
#[derive(Debug)]
pub struct ContentSchema {
    name: String,
    use_name: bool,
    mode: ContentMode,
    source: ContentSource,
    slot: usize,
}

impl ContentSchema {
    /// Build a content node. `slot` is the index of this node's fired flag
    /// in the [`ParseContext`], assigned by the schema compiler.
    pub fn new(
        name: impl Into<String>,
        use_name: bool,
        mode: ContentMode,
        source: ContentSource,
        slot: usize,
    ) -> Self {
        Self {
            name: name.into(),
            use_name,
            mode,
            source,
            slot,
        }
    }

    /// Splice the configured sub-content into the stream.
    ///
    /// A missing file or unregistered provider is logged and skipped; sink
    /// failures propagate.
    pub fn parse(
        &self,
        _record: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> EmitResult<()> {
        if self.mode == ContentMode::Once && ctx.fired[self.slot] {
            return Ok(());
        }
        ctx.fired[self.slot] = true;

        if self.use_name {
            sink.open(&self.name, &Attributes::new())?;
        }
        match &self.source {
            ContentSource::File(path) => match std::fs::read_to_string(path) {
                Ok(text) => sink.characters(&text)?,
                Err(e) => {
                    log::warn!("content '{}': cannot read {}: {}", self.name, path.display(), e);
                }
            },
            ContentSource::Provider(provider_name) => match ctx.providers.get(provider_name) {
                Some(provider) => provider.emit(sink)?,
                None => {
                    log::warn!(
                        "content '{}': no provider registered under '{}'",
                        self.name,
                        provider_name
                    );
                }
            },
        }
        if self.use_name {
            sink.close(&self.name)?;
        }
        Ok(())
    }
}
