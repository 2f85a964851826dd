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

//! Discriminator key derivation for tagged record streams.
//!
//! A key definition is a degenerate element consisting solely of attribute
//! extractions. Its only job is to compute a join-key string from a record:
//! the stringified value of each attribute, in declaration order, joined by
//! an optional join string. The tagged block reader navigates its block
//! hierarchy with these keys.

use crate::element::ElementSchema;

/// Compiled key definition.
#[derive(Debug)]
pub struct KeyDefinition {
    element: ElementSchema,
    join: Option<String>,
}

impl KeyDefinition {
    /// Wrap an attribute-only element. The element's name is the key
    /// definition's name (empty for the default definition).
    pub fn new(element: ElementSchema, join: Option<String>) -> Self {
        Self { element, join }
    }

    /// The definition name; empty for the anonymous default.
    #[inline]
    pub fn name(&self) -> &str {
        self.element.name()
    }

    /// Derive the key for one record.
    ///
    /// Returns `None` for an empty record or when no attribute produced a
    /// value; such records carry no key and are skipped by the caller.
    pub fn parse_key(&self, record: &str) -> Option<String> {
        if record.is_empty() {
            return None;
        }
        let slice = self.element.span().extract(record);
        let atts = self.element.attributes(slice);
        if atts.is_empty() {
            return None;
        }
        let mut key = String::new();
        for (i, (_, value)) in atts.iter().enumerate() {
            if i > 0 {
                if let Some(join) = &self.join {
                    key.push_str(join);
                }
            }
            key.push_str(value);
        }
        Some(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeSchema;
    use crate::span::Span;

    fn key_element(fields: &[(usize, usize)]) -> ElementSchema {
        let mut element = ElementSchema::new(Span::whole(), None, false);
        for (i, (start, len)) in fields.iter().enumerate() {
            element.add_attribute(
                0,
                AttributeSchema::new(Span::new(
                    format!("k{}", i),
                    *start,
                    Some(*len),
                    true,
                    false,
                    None,
                )),
            );
        }
        element
    }

    #[test]
    fn test_single_field_key() {
        let def = KeyDefinition::new(key_element(&[(0, 3)]), None);
        assert_eq!(def.parse_key("010REST"), Some("010".to_string()));
    }

    #[test]
    fn test_multi_field_key_joined() {
        let def = KeyDefinition::new(key_element(&[(0, 2), (4, 2)]), Some("-".to_string()));
        assert_eq!(def.parse_key("AB..CD.."), Some("AB-CD".to_string()));
    }

    #[test]
    fn test_multi_field_key_without_join() {
        let def = KeyDefinition::new(key_element(&[(0, 2), (4, 2)]), None);
        assert_eq!(def.parse_key("AB..CD.."), Some("ABCD".to_string()));
    }

    #[test]
    fn test_empty_record_has_no_key() {
        let def = KeyDefinition::new(key_element(&[(0, 3)]), None);
        assert_eq!(def.parse_key(""), None);
    }

    #[test]
    fn test_blank_fields_yield_no_key() {
        let def = KeyDefinition::new(key_element(&[(0, 3)]), None);
        assert_eq!(def.parse_key("    rest"), None);
    }

    #[test]
    fn test_key_values_trimmed() {
        let def = KeyDefinition::new(key_element(&[(0, 4)]), None);
        assert_eq!(def.parse_key("AB  rest"), Some("AB".to_string()));
    }
}
