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

//! Replaying an XML document as structural events.

use fdl_core::{Attributes, ContentProvider, EmitError, EmitResult, EventSink};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::PathBuf;

/// A [`ContentProvider`] that parses an XML file and forwards its element
/// tree into the event stream.
///
/// Register it under the name a `content` node's `provider` setting refers
/// to; the file is read and parsed on every emission. Comments, processing
/// instructions and the XML declaration are dropped; whitespace-only text
/// between elements is not forwarded.
pub struct XmlFileProvider {
    path: PathBuf,
}

impl XmlFileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

fn element_attributes(start: &BytesStart<'_>) -> EmitResult<Attributes> {
    let mut atts = Attributes::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| EmitError::content(e.to_string()))?;
        let name = String::from_utf8_lossy(attribute.key.as_ref()).to_string();
        let value = attribute
            .unescape_value()
            .map_err(|e| EmitError::content(e.to_string()))?;
        atts.push(name, value.to_string());
    }
    Ok(atts)
}

impl ContentProvider for XmlFileProvider {
    fn emit(&self, sink: &mut dyn EventSink) -> EmitResult<()> {
        let text = std::fs::read_to_string(&self.path)?;
        let mut reader = Reader::from_str(&text);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    sink.open(&name, &element_attributes(&e)?)?;
                }
                Ok(Event::Empty(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    sink.open(&name, &element_attributes(&e)?)?;
                    sink.close(&name)?;
                }
                Ok(Event::Text(e)) => {
                    let text = e.unescape().map_err(|e| EmitError::content(e.to_string()))?;
                    if !text.is_empty() {
                        sink.characters(&text)?;
                    }
                }
                Ok(Event::CData(e)) => {
                    let text = String::from_utf8_lossy(&e);
                    sink.characters(&text)?;
                }
                Ok(Event::End(e)) => {
                    let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    sink.close(&name)?;
                }
                Ok(Event::Eof) => return Ok(()),
                Ok(_) => {}
                Err(e) => return Err(EmitError::content(e.to_string())),
            }
        }
    }
}
