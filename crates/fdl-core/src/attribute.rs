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

//! Attribute schema nodes.
//!
//! An attribute extracts one field value from a record and emits it as a
//! named `(name, value)` pair on the enclosing open event. The extraction
//! pipeline is fixed: positional extract, malformed-character substitution,
//! escape removal, trimming, optional formatting. An empty result emits
//! nothing, which is not an error.

use crate::event::Attributes;
use crate::format::Formatter;
use crate::span::{replace_malformed_chars, strip_escapes, Span};
use std::borrow::Cow;

/// Compiled schema for one emitted attribute.
#[derive(Debug)]
pub struct AttributeSchema {
    span: Span,
    formatter: Option<Box<dyn Formatter>>,
}

impl AttributeSchema {
    /// An attribute with no value formatter.
    pub fn new(span: Span) -> Self {
        Self {
            span,
            formatter: None,
        }
    }

    /// An attribute whose values run through `formatter` before emission.
    pub fn with_formatter(span: Span, formatter: Box<dyn Formatter>) -> Self {
        Self {
            span,
            formatter: Some(formatter),
        }
    }

    /// The attribute name.
    #[inline]
    pub fn name(&self) -> &str {
        self.span.name()
    }

    /// Extract this attribute's value from `record` and append it to `atts`.
    ///
    /// The malformed-character pass runs before escape removal, matching the
    /// cleanup order the schema format guarantees. Formatter failures are
    /// logged and the unformatted value is emitted instead.
    pub fn parse(&self, record: &str, atts: &mut Attributes) {
        if record.is_empty() {
            return;
        }

        let raw = self.span.extract(record);
        let cleaned: Cow<'_, str> = if self.span.replace_malformed() {
            replace_malformed_chars(raw)
        } else {
            Cow::Borrowed(raw)
        };
        let unescaped: Cow<'_, str> = match self.span.escape() {
            Some(escape) if cleaned.contains(escape) => {
                Cow::Owned(strip_escapes(&cleaned, escape).into_owned())
            }
            _ => cleaned,
        };
        let value = if self.span.trim() {
            unescaped.trim()
        } else {
            unescaped.as_ref()
        };
        if value.is_empty() {
            return;
        }

        match &self.formatter {
            Some(formatter) => match formatter.format(value) {
                Ok(formatted) => atts.push(self.span.name(), formatted),
                Err(e) => {
                    log::warn!("attribute '{}': {}", self.span.name(), e);
                    atts.push(self.span.name(), value);
                }
            },
            None => atts.push(self.span.name(), value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SchemaResult;
    use crate::format::FormatError;
    use std::collections::HashMap;

    fn attr(name: &str, start: usize, length: Option<usize>) -> AttributeSchema {
        AttributeSchema::new(Span::new(name, start, length, true, false, None))
    }

    // ==================== extraction tests ====================

    #[test]
    fn test_parse_emits_named_value() {
        let mut atts = Attributes::new();
        attr("code", 0, Some(3)).parse("ABC123", &mut atts);
        assert_eq!(atts.get("code"), Some("ABC"));
    }

    #[test]
    fn test_parse_empty_record_is_noop() {
        let mut atts = Attributes::new();
        attr("code", 0, Some(3)).parse("", &mut atts);
        assert!(atts.is_empty());
    }

    #[test]
    fn test_parse_blank_value_emits_nothing() {
        let mut atts = Attributes::new();
        attr("code", 0, Some(4)).parse("    rest", &mut atts);
        assert!(atts.is_empty());
    }

    #[test]
    fn test_parse_trims_by_default() {
        let mut atts = Attributes::new();
        attr("name", 0, Some(8)).parse("SMITH   JOHN", &mut atts);
        assert_eq!(atts.get("name"), Some("SMITH"));
    }

    #[test]
    fn test_parse_trim_disabled() {
        let schema = AttributeSchema::new(Span::new("name", 0, Some(8), false, false, None));
        let mut atts = Attributes::new();
        schema.parse("SMITH   JOHN", &mut atts);
        assert_eq!(atts.get("name"), Some("SMITH   "));
    }

    // ==================== cleanup tests ====================

    #[test]
    fn test_parse_replaces_malformed() {
        let schema = AttributeSchema::new(Span::new("v", 0, None, true, true, None));
        let mut atts = Attributes::new();
        schema.parse("a\u{0002}b", &mut atts);
        assert_eq!(atts.get("v"), Some("a?b"));
    }

    #[test]
    fn test_parse_strips_escape_markers() {
        let schema = AttributeSchema::new(Span::new("v", 0, None, true, false, Some('\\')));
        let mut atts = Attributes::new();
        schema.parse("a\\;b", &mut atts);
        assert_eq!(atts.get("v"), Some("a;b"));
    }

    #[test]
    fn test_parse_escape_of_escape() {
        let schema = AttributeSchema::new(Span::new("v", 0, None, true, false, Some('\\')));
        let mut atts = Attributes::new();
        schema.parse("a\\\\b", &mut atts);
        assert_eq!(atts.get("v"), Some("a\\b"));
    }

    // ==================== formatter tests ====================

    #[derive(Debug)]
    struct Doubler;
    impl Formatter for Doubler {
        fn configure(&mut self, _: &HashMap<String, String>) -> SchemaResult<()> {
            Ok(())
        }
        fn format(&self, value: &str) -> Result<String, FormatError> {
            Ok(format!("{}{}", value, value))
        }
    }

    #[derive(Debug)]
    struct AlwaysFails;
    impl Formatter for AlwaysFails {
        fn configure(&mut self, _: &HashMap<String, String>) -> SchemaResult<()> {
            Ok(())
        }
        fn format(&self, value: &str) -> Result<String, FormatError> {
            Err(FormatError {
                value: value.to_string(),
                message: "nope".to_string(),
            })
        }
    }

    #[test]
    fn test_parse_applies_formatter() {
        let schema = AttributeSchema::with_formatter(
            Span::new("v", 0, Some(2), true, false, None),
            Box::new(Doubler),
        );
        let mut atts = Attributes::new();
        schema.parse("ab", &mut atts);
        assert_eq!(atts.get("v"), Some("abab"));
    }

    #[test]
    fn test_parse_formatter_failure_passes_original() {
        let schema = AttributeSchema::with_formatter(
            Span::new("v", 0, Some(2), true, false, None),
            Box::new(AlwaysFails),
        );
        let mut atts = Attributes::new();
        schema.parse("ab", &mut atts);
        assert_eq!(atts.get("v"), Some("ab"));
    }
}
