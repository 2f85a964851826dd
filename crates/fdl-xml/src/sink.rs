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

//! Serializing the event stream as XML.

use fdl_core::{Attributes, EmitError, EmitResult, EventSink};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Write;

/// An [`EventSink`] that writes the structural event stream as an XML
/// document.
///
/// No XML declaration is written; the output is the bare element tree,
/// ready for embedding. Attribute order follows the event stream.
///
/// ```rust
/// use fdl_core::{Attributes, EventSink};
/// use fdl_xml::XmlSink;
///
/// let mut sink = XmlSink::new(Vec::new());
/// sink.start_stream().unwrap();
/// let mut atts = Attributes::new();
/// atts.push("id", "1");
/// sink.open("item", &atts).unwrap();
/// sink.characters("a < b").unwrap();
/// sink.close("item").unwrap();
/// sink.end_stream().unwrap();
///
/// let xml = String::from_utf8(sink.into_inner()).unwrap();
/// assert_eq!(xml, r#"<item id="1">a &lt; b</item>"#);
/// ```
pub struct XmlSink<W: Write> {
    writer: Writer<W>,
}

impl<W: Write> XmlSink<W> {
    /// A compact sink writing to `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            writer: Writer::new(inner),
        }
    }

    /// A pretty-printing sink indenting with `indent` spaces.
    pub fn indented(inner: W, indent: usize) -> Self {
        Self {
            writer: Writer::new_with_indent(inner, b' ', indent),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write> EventSink for XmlSink<W> {
    fn open(&mut self, name: &str, attributes: &Attributes) -> EmitResult<()> {
        let mut start = BytesStart::new(name);
        for (attr_name, value) in attributes.iter() {
            start.push_attribute((attr_name, value));
        }
        self.writer
            .write_event(Event::Start(start))
            .map_err(|e| EmitError::sink(e.to_string()))
    }

    fn characters(&mut self, text: &str) -> EmitResult<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(text)))
            .map_err(|e| EmitError::sink(e.to_string()))
    }

    fn close(&mut self, name: &str) -> EmitResult<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(|e| EmitError::sink(e.to_string()))
    }
}
