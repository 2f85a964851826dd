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

//! Pluggable attribute value formatters.
//!
//! An attribute that configures a `type` option runs its extracted value
//! through a [`Formatter`] before emission. Formatters are resolved at
//! schema-compile time through a [`FormatterRegistry`] mapping type names to
//! constructors; there is no dynamic loading. A formatting failure at record
//! time is logged and the unformatted value passes through, never aborting
//! the stream.
//!
//! The default registry provides `date` (chrono pattern re-formatting) and
//! `number` (decimal re-rendering with a configurable precision).

use crate::error::{SchemaError, SchemaResult};
use chrono::{NaiveDate, NaiveDateTime};
use std::collections::HashMap;
use std::fmt;
use std::fmt::Write as _;

/// Option key selecting the formatter type.
pub const TYPE_OPTION: &str = "type";
/// Option key holding the output pattern.
pub const FORMAT_OPTION: &str = "format";
/// Option key holding the input pattern.
pub const PARSE_OPTION: &str = "parse";

/// A value could not be reformatted.
#[derive(Debug, thiserror::Error)]
#[error("cannot format '{value}': {message}")]
pub struct FormatError {
    pub value: String,
    pub message: String,
}

impl FormatError {
    fn new(value: &str, message: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            message: message.into(),
        }
    }
}

/// Reformats extracted attribute values.
///
/// `configure` is called exactly once, at schema-compile time, before any
/// `format` call. The options map always carries [`TYPE_OPTION`] and may
/// carry [`FORMAT_OPTION`] / [`PARSE_OPTION`] pattern strings.
pub trait Formatter: fmt::Debug + Send + Sync {
    /// Validate and absorb the configured options.
    fn configure(&mut self, options: &HashMap<String, String>) -> SchemaResult<()>;

    /// Reformat one value.
    fn format(&self, value: &str) -> Result<String, FormatError>;
}

/// Constructor stored in the registry.
pub type FormatterFactory = fn() -> Box<dyn Formatter>;

/// Explicit name-to-constructor registry for formatter types.
#[derive(Debug, Clone)]
pub struct FormatterRegistry {
    factories: HashMap<String, FormatterFactory>,
}

impl FormatterRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry with the built-in `date` and `number` formatters.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register("date", || Box::<DateFormatter>::default());
        registry.register("number", || Box::<NumberFormatter>::default());
        registry
    }

    /// Register a formatter type.
    pub fn register(&mut self, type_name: impl Into<String>, factory: FormatterFactory) {
        self.factories.insert(type_name.into(), factory);
    }

    /// Instantiate and configure a formatter for the given options.
    ///
    /// The options must contain [`TYPE_OPTION`]; an unregistered type is a
    /// [`SchemaError::UnknownFormatter`].
    pub fn create(&self, options: &HashMap<String, String>) -> SchemaResult<Box<dyn Formatter>> {
        let type_name = options
            .get(TYPE_OPTION)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| SchemaError::FormatterOptions {
                option: TYPE_OPTION.to_string(),
                message: "missing".to_string(),
            })?;
        let factory = self
            .factories
            .get(type_name)
            .ok_or_else(|| SchemaError::UnknownFormatter(type_name.clone()))?;
        let mut formatter = factory();
        formatter.configure(options)?;
        Ok(formatter)
    }
}

impl Default for FormatterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Re-formats date values between two chrono patterns.
///
/// `parse` is the input pattern, `format` the output pattern; both default
/// to `%Y-%m-%d`. Date-only inputs are accepted alongside full timestamps.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    parse: String,
    format: String,
}

impl Default for DateFormatter {
    fn default() -> Self {
        Self {
            parse: "%Y-%m-%d".to_string(),
            format: "%Y-%m-%d".to_string(),
        }
    }
}

impl Formatter for DateFormatter {
    fn configure(&mut self, options: &HashMap<String, String>) -> SchemaResult<()> {
        if let Some(parse) = options.get(PARSE_OPTION).filter(|p| !p.is_empty()) {
            self.parse = parse.clone();
        }
        if let Some(format) = options.get(FORMAT_OPTION).filter(|f| !f.is_empty()) {
            self.format = format.clone();
        }
        Ok(())
    }

    fn format(&self, value: &str) -> Result<String, FormatError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let timestamp = NaiveDateTime::parse_from_str(value, &self.parse)
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(value, &self.parse)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
            .ok_or_else(|| {
                FormatError::new(value, format!("does not match pattern '{}'", self.parse))
            })?;
        let mut out = String::new();
        write!(out, "{}", timestamp.format(&self.format))
            .map_err(|_| FormatError::new(value, "invalid output pattern"))?;
        Ok(out)
    }
}

/// Re-renders numeric values with a fixed precision.
///
/// The precision is taken from a `0.00`-style `format` pattern (digits after
/// the decimal point); without one the value is rendered with its natural
/// precision. Grouping separators are stripped before parsing.
#[derive(Debug, Clone, Default)]
pub struct NumberFormatter {
    precision: Option<usize>,
}

impl Formatter for NumberFormatter {
    fn configure(&mut self, options: &HashMap<String, String>) -> SchemaResult<()> {
        if let Some(pattern) = options.get(FORMAT_OPTION).filter(|f| !f.is_empty()) {
            self.precision = match pattern.rsplit_once('.') {
                Some((_, decimals)) => {
                    if decimals.chars().any(|c| c != '0' && c != '#') {
                        return Err(SchemaError::FormatterOptions {
                            option: FORMAT_OPTION.to_string(),
                            message: format!("unsupported number pattern '{}'", pattern),
                        });
                    }
                    Some(decimals.len())
                }
                None => Some(0),
            };
        }
        Ok(())
    }

    fn format(&self, value: &str) -> Result<String, FormatError> {
        if value.is_empty() {
            return Ok(String::new());
        }
        let digits: String = value
            .trim()
            .chars()
            .filter(|c| *c != ',' && *c != '_')
            .collect();
        let number: f64 = digits
            .parse()
            .map_err(|e| FormatError::new(value, format!("number parse failed: {}", e)))?;
        Ok(match self.precision {
            Some(p) => format!("{:.*}", p, number),
            None => number.to_string(),
        })
    }
}
