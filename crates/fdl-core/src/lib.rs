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

//! FDL core: schema model and structural event stream.
//!
//! FDL transcodes flat-text record streams (fixed-width, separator-delimited
//! and tagged mainframe-style extracts) into a hierarchical event stream,
//! driven by a declarative schema compiled once at startup. This crate holds
//! everything shared by the record readers in `fdl-stream`:
//!
//! - the schema node types ([`ElementSchema`], [`AttributeSchema`],
//!   [`ChooseSchema`], [`ContentSchema`], [`KeyDefinition`]) and the
//!   positional extraction they share ([`Span`]);
//! - the serde configuration model and its compiler ([`config`]);
//! - the structural event stream ([`EventSink`], [`Attributes`],
//!   [`EventBuffer`]);
//! - attribute value formatting ([`Formatter`], [`FormatterRegistry`]);
//! - content inclusion ([`ContentProvider`], [`ProviderRegistry`]).
//!
//! Compiled schemas are immutable and `Send + Sync`: many streams may be
//! parsed concurrently against one schema with no locking. All mutable parse
//! state lives in per-invocation objects such as [`ParseContext`].

pub mod attribute;
pub mod choose;
pub mod config;
pub mod content;
pub mod element;
pub mod error;
pub mod event;
pub mod format;
pub mod key;
pub mod span;

pub use attribute::AttributeSchema;
pub use choose::{Branch, ChooseSchema, Selector};
pub use config::{Compiler, Inherited, NodeConfig};
pub use content::{
    ContentMode, ContentProvider, ContentSchema, ContentSource, ParseContext, ProviderRegistry,
};
pub use element::{ChildSchema, ElementSchema};
pub use error::{EmitError, EmitResult, SchemaError, SchemaResult};
pub use event::{Attributes, Event, EventBuffer, EventSink};
pub use format::{FormatError, Formatter, FormatterRegistry};
pub use key::KeyDefinition;
pub use span::Span;
