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

//! The structural event stream produced by record parsing.
//!
//! Parsing a record stream yields a flat sequence of open/characters/close
//! events bracketed by stream start/end, pushed into an [`EventSink`]. The
//! event model is deliberately minimal: a sink that serializes it as XML
//! reproduces the document a DOM builder would see, but sinks are free to
//! build any other representation.
//!
//! Attribute order within one `open` event follows extraction order, not any
//! sorted order, so [`Attributes`] is an ordered list rather than a map.

use crate::error::EmitResult;

/// An ordered list of `(name, value)` attribute pairs.
///
/// Order is extraction/declaration order and is preserved verbatim.
/// Duplicate names are not rejected; consumers see them in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    items: Vec<(String, String)>,
}

impl Attributes {
    /// Create an empty attribute list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an attribute, keeping insertion order.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.items.push((name.into(), value.into()));
    }

    /// Number of attributes.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// True when no attribute has been collected.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate over `(name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.items.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Value of the first attribute with the given name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Consumer of the structural event stream.
///
/// Implementations must tolerate `characters` being called multiple times in
/// a row and `open`/`close` pairs nesting arbitrarily deep. `start_stream`
/// and `end_stream` bracket one full parse invocation.
pub trait EventSink {
    /// Called once before any other event of a stream.
    fn start_stream(&mut self) -> EmitResult<()> {
        Ok(())
    }

    /// A structure opens, carrying its attributes in extraction order.
    fn open(&mut self, name: &str, attributes: &Attributes) -> EmitResult<()>;

    /// Character content inside the currently open structure.
    fn characters(&mut self, text: &str) -> EmitResult<()>;

    /// The named structure closes.
    fn close(&mut self, name: &str) -> EmitResult<()>;

    /// Called once after the last event of a stream.
    fn end_stream(&mut self) -> EmitResult<()> {
        Ok(())
    }
}

/// One recorded structural event, as captured by [`EventBuffer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    StreamStart,
    Open {
        name: String,
        attributes: Attributes,
    },
    Characters(String),
    Close {
        name: String,
    },
    StreamEnd,
}

/// An [`EventSink`] that records every event in memory.
///
/// Used by tests and by callers that want to post-process a whole stream.
///
/// ```rust
/// use fdl_core::event::{Attributes, Event, EventBuffer, EventSink};
///
/// let mut buffer = EventBuffer::new();
/// buffer.start_stream().unwrap();
/// let mut atts = Attributes::new();
/// atts.push("id", "42");
/// buffer.open("item", &atts).unwrap();
/// buffer.close("item").unwrap();
/// buffer.end_stream().unwrap();
///
/// assert_eq!(buffer.events.len(), 4);
/// assert!(matches!(&buffer.events[1], Event::Open { name, .. } if name == "item"));
/// ```
#[derive(Debug, Default)]
pub struct EventBuffer {
    /// The recorded events, in emission order.
    pub events: Vec<Event>,
}

impl EventBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all `Open` events, in order. Convenient in assertions.
    pub fn open_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Open { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// The attributes of the first `Open` event with the given name.
    pub fn attributes_of(&self, name: &str) -> Option<&Attributes> {
        self.events.iter().find_map(|e| match e {
            Event::Open {
                name: n,
                attributes,
            } if n == name => Some(attributes),
            _ => None,
        })
    }
}

impl EventSink for EventBuffer {
    fn start_stream(&mut self) -> EmitResult<()> {
        self.events.push(Event::StreamStart);
        Ok(())
    }

    fn open(&mut self, name: &str, attributes: &Attributes) -> EmitResult<()> {
        self.events.push(Event::Open {
            name: name.to_string(),
            attributes: attributes.clone(),
        });
        Ok(())
    }

    fn characters(&mut self, text: &str) -> EmitResult<()> {
        self.events.push(Event::Characters(text.to_string()));
        Ok(())
    }

    fn close(&mut self, name: &str) -> EmitResult<()> {
        self.events.push(Event::Close {
            name: name.to_string(),
        });
        Ok(())
    }

    fn end_stream(&mut self) -> EmitResult<()> {
        self.events.push(Event::StreamEnd);
        Ok(())
    }
}
