// Copyright (C) 2025 Category Labs, Inc.
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Minimal reader for the Chrome Trace Event Format.
//!
//! Only the fields the legacy perfetto events carry are read. Both the JSON
//! array form and the JSON object form (`{"traceEvents": [...]}`) are
//! accepted, and so is an array missing its closing bracket, which the format
//! explicitly allows for traces cut off by a crashing process.

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Deserialize)]
pub struct JsonTraceEvent {
    pub ph: String,
    #[serde(default)]
    pub cat: String,
    #[serde(default)]
    pub name: String,
    /// Microseconds; fractional parts are dropped on conversion.
    #[serde(default)]
    pub ts: f64,
    #[serde(default)]
    pub pid: u32,
    #[serde(default)]
    pub tid: u64,
    #[serde(default)]
    pub args: Map<String, Value>,
}

impl JsonTraceEvent {
    pub fn timestamp_us(&self) -> i64 {
        self.ts as i64
    }

    pub fn is_metadata(&self) -> bool {
        self.ph == "M"
    }
}

#[derive(Debug)]
pub enum JsonTrace {
    Object { trace_events: Vec<JsonTraceEvent> },
    Array(Vec<JsonTraceEvent>),
}

impl JsonTrace {
    pub fn parse(input: &str) -> eyre::Result<Self> {
        let value: Value = match serde_json::from_str(input) {
            Ok(value) => value,
            Err(err) => {
                let trimmed = input.trim_end();
                if !trimmed.trim_start().starts_with('[') || trimmed.ends_with(']') {
                    return Err(err.into());
                }
                let closed = format!("{}]", trimmed.trim_end_matches(',').trim_end());
                serde_json::from_str(&closed).map_err(|_| err)?
            }
        };
        Self::from_value(value)
    }

    fn from_value(value: Value) -> eyre::Result<Self> {
        match value {
            events @ Value::Array(_) => Ok(JsonTrace::Array(serde_json::from_value(events)?)),
            Value::Object(mut object) => {
                let events = object
                    .remove("traceEvents")
                    .ok_or_else(|| eyre::eyre!("trace object has no traceEvents field"))?;
                Ok(JsonTrace::Object {
                    trace_events: serde_json::from_value(events)?,
                })
            }
            other => Err(eyre::eyre!("expected a JSON array or object, got {other}")),
        }
    }

    pub fn into_events(self) -> Vec<JsonTraceEvent> {
        match self {
            JsonTrace::Object { trace_events } => trace_events,
            JsonTrace::Array(events) => events,
        }
    }
}
