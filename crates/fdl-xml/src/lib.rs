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

//! XML adapters for the FDL event stream.
//!
//! - [`XmlSink`] serializes the structural event stream as an XML
//!   document — the classic use of FDL: flat file in, XML out.
//! - [`XmlFileProvider`] does the reverse for content inclusion: it replays
//!   an existing XML document into a sink, for `content` nodes that splice
//!   an external sub-document into the output.

mod provider;
mod sink;

pub use provider::XmlFileProvider;
pub use sink::XmlSink;
