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

//! Conditional branch dispatch.
//!
//! A `choose` node evaluates a selector sub-field and hands the record to
//! exactly one of several named branches. Branches are keyed by the
//! selector's trimmed string value; the `None` key is the sentinel for the
//! default (`otherwise`) branch. A record whose selector matches nothing and
//! has no default branch emits nothing — that is not an error.

use crate::content::ParseContext;
use crate::element::{split_fields, ElementSchema};
use crate::error::EmitResult;
use crate::event::EventSink;
use crate::span::Span;
use std::borrow::Cow;
use std::collections::HashMap;

/// How to derive the branch-selection value from a record.
#[derive(Debug)]
pub struct Selector {
    span: Span,
    index: usize,
}

impl Selector {
    /// A selector reading field `index` (0 = the whole record slice).
    pub fn new(span: Span, index: usize) -> Self {
        Self { span, index }
    }

    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The selector value of one field slice; `None` for an empty slice.
    fn value_of(&self, input: &str) -> Option<String> {
        if input.is_empty() {
            return None;
        }
        Some(self.span.extract(input).trim().to_string())
    }
}

/// One branch of a `choose` node.
#[derive(Debug)]
pub struct Branch {
    index: usize,
    element: ElementSchema,
}

impl Branch {
    /// A branch applied to field `index` (0 = the whole record slice).
    pub fn new(index: usize, element: ElementSchema) -> Self {
        Self { index, element }
    }
}

/// Compiled schema for a `choose` node.
#[derive(Debug)]
pub struct ChooseSchema {
    span: Span,
    separator: Option<char>,
    selector: Selector,
    branches: HashMap<Option<String>, Branch>,
}

impl ChooseSchema {
    pub fn new(span: Span, separator: Option<char>, selector: Selector) -> Self {
        Self {
            span,
            separator,
            selector,
            branches: HashMap::new(),
        }
    }

    /// Register a `when` branch for a selector value.
    pub fn add_branch(&mut self, value: impl Into<String>, branch: Branch) {
        self.branches.insert(Some(value.into()), branch);
    }

    /// Register the default (`otherwise`) branch.
    pub fn set_otherwise(&mut self, branch: Branch) {
        self.branches.insert(None, branch);
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.span.name()
    }

    /// Evaluate the selector and dispatch to the matched branch.
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

        let value = self.selector_value(slice);
        let branch = match self
            .branches
            .get(&value)
            .or_else(|| self.branches.get(&None))
        {
            Some(branch) => branch,
            None => return Ok(()),
        };

        // The branch addresses the record through its own field index,
        // independent of the selector's index.
        if branch.index == 0 {
            return branch.element.parse(slice, ctx, sink);
        }
        if let Some(fields) = self.fields(slice) {
            if let Some(field) = fields.get(branch.index - 1) {
                return branch.element.parse(field, ctx, sink);
            }
        }
        Ok(())
    }

    fn selector_value(&self, input: &str) -> Option<String> {
        if self.selector.index == 0 {
            return self.selector.value_of(input);
        }
        let fields = self.fields(input)?;
        fields
            .get(self.selector.index - 1)
            .and_then(|field| self.selector.value_of(field))
    }

    fn fields<'a>(&self, input: &'a str) -> Option<Vec<Cow<'a, str>>> {
        self.separator
            .map(|sep| split_fields(input, sep, self.span.escape()))
    }
}
