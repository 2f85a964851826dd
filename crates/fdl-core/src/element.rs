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

//! Element schema nodes and the field-splitting algorithm.
//!
//! An element owns attributes and child nodes keyed by field index. Field
//! index 0 always sees the whole (unsplit) record slice; when a separator is
//! configured, indices 1..=n+1 address the separator-delimited fields in
//! left-to-right order. Indices with no configured handler are skipped
//! silently, which keeps schemas forward compatible.
//!
//! Separator scanning is escape aware: a separator preceded by an odd-length
//! run of escape characters is literal (one escape marker is stripped, the
//! separator is kept); an even-length run, including zero, makes the
//! separator real.

use crate::attribute::AttributeSchema;
use crate::choose::ChooseSchema;
use crate::content::{ContentSchema, ParseContext};
use crate::error::EmitResult;
use crate::event::{Attributes, EventSink};
use crate::span::Span;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// The closed set of child node kinds an element may own.
#[derive(Debug)]
pub enum ChildSchema {
    Element(ElementSchema),
    Choose(ChooseSchema),
    Content(ContentSchema),
}

impl ChildSchema {
    /// Dispatch the record slice to the concrete node kind.
    pub fn parse(
        &self,
        record: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> EmitResult<()> {
        match self {
            ChildSchema::Element(element) => element.parse(record, ctx, sink),
            ChildSchema::Choose(choose) => choose.parse(record, ctx, sink),
            ChildSchema::Content(content) => content.parse(record, ctx, sink),
        }
    }
}

/// Compiled schema for one element node.
#[derive(Debug)]
pub struct ElementSchema {
    span: Span,
    separator: Option<char>,
    show_text: bool,
    attributes: BTreeMap<usize, Vec<AttributeSchema>>,
    children: BTreeMap<usize, Vec<ChildSchema>>,
}

impl ElementSchema {
    /// A bare element with no attributes or children yet.
    pub fn new(span: Span, separator: Option<char>, show_text: bool) -> Self {
        Self {
            span,
            separator,
            show_text,
            attributes: BTreeMap::new(),
            children: BTreeMap::new(),
        }
    }

    /// Register an attribute at a field index (0 = whole record).
    pub fn add_attribute(&mut self, index: usize, attribute: AttributeSchema) {
        self.attributes.entry(index).or_default().push(attribute);
    }

    /// Register a child node at a field index, in declaration order.
    pub fn add_child(&mut self, index: usize, child: ChildSchema) {
        self.children.entry(index).or_default().push(child);
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.span.name()
    }

    #[inline]
    pub(crate) fn span(&self) -> &Span {
        &self.span
    }

    #[inline]
    pub fn separator(&self) -> Option<char> {
        self.separator
    }

    /// Process one record slice, emitting this element's events.
    ///
    /// Zero-length records are a complete no-op: no events at all, not even
    /// an empty open/close pair. A named element emits
    /// `open` / attributes / children / `close`; a nameless one only
    /// processes its children (anonymous grouping).
    pub fn parse(
        &self,
        record: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> EmitResult<()> {
        if record.is_empty() {
            return Ok(());
        }
        let slice = self.span.extract(record);

        if self.span.name().is_empty() {
            return self.emit_children(slice, ctx, sink);
        }

        let atts = self.attributes(slice);
        sink.open(self.span.name(), &atts)?;
        self.emit_children(slice, ctx, sink)?;
        sink.close(self.span.name())
    }

    /// Collect this element's attributes from a record slice.
    ///
    /// Index-0 attributes see the whole slice; indexed attributes see their
    /// field. Also used standalone by key definitions and by the tagged
    /// block reader, which manages the enclosing open/close itself.
    pub fn attributes(&self, input: &str) -> Attributes {
        let mut atts = Attributes::new();
        if let Some(set) = self.attributes.get(&0) {
            for attribute in set {
                attribute.parse(input, &mut atts);
            }
        }
        if self.attributes.keys().any(|&i| i > 0) {
            if let Some(fields) = self.indexed_fields(input) {
                for (n, field) in fields.iter().enumerate() {
                    if let Some(set) = self.attributes.get(&(n + 1)) {
                        for attribute in set {
                            attribute.parse(field, &mut atts);
                        }
                    }
                }
            }
        }
        atts
    }

    /// Emit this element's children (and trailing text) for a record slice.
    pub fn emit_children(
        &self,
        input: &str,
        ctx: &mut ParseContext<'_>,
        sink: &mut dyn EventSink,
    ) -> EmitResult<()> {
        if let Some(kids) = self.children.get(&0) {
            for child in kids {
                child.parse(input, ctx, sink)?;
            }
        }
        if self.children.keys().any(|&i| i > 0) {
            if let Some(fields) = self.indexed_fields(input) {
                for (n, field) in fields.iter().enumerate() {
                    if let Some(kids) = self.children.get(&(n + 1)) {
                        for child in kids {
                            child.parse(field, ctx, sink)?;
                        }
                    }
                }
            }
        }
        if self.show_text {
            sink.characters(capped(input, self.span.length()))?;
        }
        Ok(())
    }

    /// The separator-delimited fields of `input`, or `None` when this
    /// element is unsplit.
    pub(crate) fn indexed_fields<'a>(&self, input: &'a str) -> Option<Vec<Cow<'a, str>>> {
        self.separator
            .map(|sep| split_fields(input, sep, self.span.escape()))
    }
}

/// Split `input` at unescaped occurrences of `sep`.
///
/// With no escape character (or none present in the input) the fields are
/// zero-copy views. Otherwise each escaped separator loses exactly one
/// escape marker and stays literal; remaining escape pairs are left for the
/// attribute-level escape removal.
pub(crate) fn split_fields<'a>(input: &'a str, sep: char, escape: Option<char>) -> Vec<Cow<'a, str>> {
    let escape = match escape {
        Some(e) if input.contains(e) => e,
        _ => return input.split(sep).map(Cow::Borrowed).collect(),
    };

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut run = 0usize;
    for c in input.chars() {
        if c == escape {
            run += 1;
            current.push(c);
        } else if c == sep {
            if run % 2 == 1 {
                current.pop();
                current.push(c);
            } else {
                fields.push(Cow::Owned(std::mem::take(&mut current)));
            }
            run = 0;
        } else {
            current.push(c);
            run = 0;
        }
    }
    fields.push(Cow::Owned(current));
    fields
}

/// First `length` characters of `input`; the whole slice when unset.
fn capped(input: &str, length: Option<usize>) -> &str {
    match length {
        None => input,
        Some(len) => {
            if input.is_ascii() {
                &input[..input.len().min(len)]
            } else {
                match input.char_indices().nth(len) {
                    Some((idx, _)) => &input[..idx],
                    None => input,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ProviderRegistry;
    use crate::event::{Event, EventBuffer};

    fn attribute(name: &str, start: usize, length: Option<usize>) -> AttributeSchema {
        AttributeSchema::new(Span::new(name, start, length, true, false, None))
    }

    fn whole_attribute(name: &str) -> AttributeSchema {
        AttributeSchema::new(Span::new(name, 0, None, true, false, None))
    }

    fn parse(element: &ElementSchema, record: &str) -> EventBuffer {
        let providers = ProviderRegistry::new();
        let mut ctx = ParseContext::new(0, &providers);
        let mut buf = EventBuffer::new();
        element.parse(record, &mut ctx, &mut buf).unwrap();
        buf
    }

    // ==================== split_fields tests ====================

    #[test]
    fn test_split_counts_fields() {
        let fields = split_fields("a;b;c", ';', None);
        assert_eq!(fields, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_no_separator_single_field() {
        assert_eq!(split_fields("abc", ';', None), vec!["abc"]);
    }

    #[test]
    fn test_split_empty_fields_kept() {
        assert_eq!(split_fields(";;", ';', None), vec!["", "", ""]);
    }

    #[test]
    fn test_split_escaped_separator_is_literal() {
        let fields = split_fields("a\\;b;c", ';', Some('\\'));
        assert_eq!(fields, vec!["a;b", "c"]);
    }

    #[test]
    fn test_split_even_escape_run_is_real() {
        // Two escapes escape each other; the separator is a boundary.
        let fields = split_fields("a\\\\;b", ';', Some('\\'));
        assert_eq!(fields, vec!["a\\\\", "b"]);
    }

    #[test]
    fn test_split_triple_escape_run_is_literal() {
        let fields = split_fields("a\\\\\\;b", ';', Some('\\'));
        assert_eq!(fields, vec!["a\\\\;b"]);
    }

    #[test]
    fn test_split_escape_without_separator_untouched() {
        let fields = split_fields("a\\b;c", ';', Some('\\'));
        assert_eq!(fields, vec!["a\\b", "c"]);
    }

    #[test]
    fn test_split_n_separators_give_n_plus_one_fields() {
        for n in 0..6 {
            let input = vec!["x"; n + 1].join(";");
            assert_eq!(split_fields(&input, ';', None).len(), n + 1);
        }
    }

    // ==================== unsplit element tests ====================

    #[test]
    fn test_unsplit_named_element_single_pair() {
        let mut element = ElementSchema::new(
            Span::new("rec", 0, None, true, false, None),
            None,
            false,
        );
        element.add_attribute(0, attribute("head", 0, Some(2)));
        let buf = parse(&element, "AB-rest");

        assert_eq!(buf.open_names(), vec!["rec"]);
        assert_eq!(buf.attributes_of("rec").unwrap().get("head"), Some("AB"));
        assert!(matches!(buf.events.last(), Some(Event::Close { name }) if name == "rec"));
    }

    #[test]
    fn test_empty_record_emits_nothing() {
        let element = ElementSchema::new(
            Span::new("rec", 0, None, true, false, None),
            None,
            false,
        );
        let buf = parse(&element, "");
        assert!(buf.events.is_empty());
    }

    #[test]
    fn test_nameless_element_emits_children_only() {
        let mut outer = ElementSchema::new(Span::whole(), None, false);
        let mut inner = ElementSchema::new(
            Span::new("inner", 0, None, true, false, None),
            None,
            false,
        );
        inner.add_attribute(0, whole_attribute("v"));
        outer.add_child(0, ChildSchema::Element(inner));

        let buf = parse(&outer, "data");
        assert_eq!(buf.open_names(), vec!["inner"]);
    }

    // ==================== indexed dispatch tests ====================

    fn split_element() -> ElementSchema {
        let mut element = ElementSchema::new(
            Span::new("row", 0, None, true, false, None),
            Some(';'),
            false,
        );
        element.add_attribute(1, whole_attribute("first"));
        element.add_attribute(3, whole_attribute("third"));
        element
    }

    #[test]
    fn test_indexed_attributes_in_field_order() {
        let buf = parse(&split_element(), "aa;bb;cc");
        let atts = buf.attributes_of("row").unwrap();
        assert_eq!(atts.get("first"), Some("aa"));
        assert_eq!(atts.get("third"), Some("cc"));
        assert_eq!(atts.len(), 2);
    }

    #[test]
    fn test_unconfigured_indices_skipped() {
        // Field 2 has no handler; fields past the configured range are fine.
        let buf = parse(&split_element(), "aa;bb;cc;dd;ee");
        assert_eq!(buf.attributes_of("row").unwrap().len(), 2);
    }

    #[test]
    fn test_index_zero_sees_whole_record() {
        let mut element = split_element();
        element.add_attribute(0, attribute("all", 0, Some(5)));
        let buf = parse(&element, "aa;bb;cc");
        let atts = buf.attributes_of("row").unwrap();
        // Index 0 is dispatched first and sees the unsplit record.
        assert_eq!(atts.iter().next(), Some(("all", "aa;bb")));
    }

    #[test]
    fn test_indexed_children() {
        let mut element = ElementSchema::new(
            Span::new("row", 0, None, true, false, None),
            Some('|'),
            false,
        );
        let mut child = ElementSchema::new(
            Span::new("cell", 0, None, true, false, None),
            None,
            false,
        );
        child.add_attribute(0, whole_attribute("v"));
        element.add_child(2, ChildSchema::Element(child));

        let buf = parse(&element, "a|b|c");
        assert_eq!(buf.open_names(), vec!["row", "cell"]);
        assert_eq!(buf.attributes_of("cell").unwrap().get("v"), Some("b"));
    }

    #[test]
    fn test_escaped_separator_field_content() {
        let mut element = ElementSchema::new(
            Span::new("row", 0, Some(100), true, false, Some('\\')),
            Some(';'),
            false,
        );
        element.add_attribute(1, whole_attribute("v"));
        let buf = parse(&element, "a\\;b;tail");
        assert_eq!(buf.attributes_of("row").unwrap().get("v"), Some("a;b"));
    }

    // ==================== show-text tests ====================

    #[test]
    fn test_show_text_emits_characters() {
        let element = ElementSchema::new(
            Span::new("txt", 0, None, true, false, None),
            None,
            true,
        );
        let buf = parse(&element, "payload");
        assert!(buf
            .events
            .iter()
            .any(|e| matches!(e, Event::Characters(t) if t == "payload")));
    }

    #[test]
    fn test_show_text_capped_by_length() {
        let element = ElementSchema::new(
            Span::new("txt", 0, Some(3), true, false, None),
            None,
            true,
        );
        let buf = parse(&element, "payload");
        assert!(buf
            .events
            .iter()
            .any(|e| matches!(e, Event::Characters(t) if t == "pay")));
    }

    #[test]
    fn test_show_text_after_children() {
        let mut element = ElementSchema::new(
            Span::new("txt", 0, None, true, false, None),
            None,
            true,
        );
        let child = ElementSchema::new(
            Span::new("c", 0, Some(1), true, false, None),
            None,
            false,
        );
        element.add_child(0, ChildSchema::Element(child));

        let buf = parse(&element, "xy");
        let close_c = buf
            .events
            .iter()
            .position(|e| matches!(e, Event::Close { name } if name == "c"));
        let chars = buf
            .events
            .iter()
            .position(|e| matches!(e, Event::Characters(_)));
        assert!(close_c.unwrap() < chars.unwrap());
    }
}
