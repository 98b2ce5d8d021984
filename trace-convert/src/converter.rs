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

use crate::config::Config;
use crate::json::JsonTraceEvent;
use eyre::Context;
use perfetto_format::{parse_phase, ArgValue, EncodeError, PerfettoTraceWriter};
use std::io::Write;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertStats {
    pub events: usize,
    pub threads: usize,
    pub skipped: usize,
}

pub struct TraceConverter<W: Write> {
    writer: PerfettoTraceWriter<W>,
    strict: bool,
    stats: ConvertStats,
}

impl<W: Write> TraceConverter<W> {
    pub fn new(writer: W, strict: bool) -> Self {
        Self {
            writer: PerfettoTraceWriter::new(writer),
            strict,
            stats: ConvertStats::default(),
        }
    }

    pub fn stats(&self) -> ConvertStats {
        self.stats
    }

    /// Writes the configured metadata packets, then every event in order.
    pub fn convert_trace(
        &mut self,
        config: &Config,
        events: &[JsonTraceEvent],
    ) -> eyre::Result<ConvertStats> {
        if let Some(clock_domain) = &config.global.clock_domain {
            self.writer.write_chrome_metadata(clock_domain)?;
        }

        if let Some(benchmark) = &config.benchmark {
            let trace_start_us = events
                .iter()
                .filter(|event| !event.is_metadata())
                .map(JsonTraceEvent::timestamp_us)
                .min()
                .unwrap_or(0);
            self.writer
                .write_metadata(&benchmark.to_metadata(trace_start_us))?;
        }

        for (index, event) in events.iter().enumerate() {
            self.convert_event(event)
                .with_context(|| format!("failed to convert event index={}", index))?;
        }
        Ok(self.stats)
    }

    /// Converts one event, opening the thread's packet sequence first if this
    /// is the first event seen on its tid.
    ///
    /// Events that cannot be encoded are rejected before the sequence is
    /// opened, so a skipped event never leaves a descriptor behind.
    pub fn convert_event(&mut self, event: &JsonTraceEvent) -> eyre::Result<()> {
        if let Err(e) = parse_phase(&event.ph) {
            return self.skip_or_fail(event, e);
        }
        let args = match Self::convert_args(event) {
            Ok(args) => args,
            Err(e) => return self.skip_or_fail(event, e),
        };

        let ts = event.timestamp_us();
        if self.writer.sequence_id(event.tid).is_none() {
            self.writer
                .write_thread_descriptor_event(event.pid, event.tid, ts)?;
            self.stats.threads += 1;
            debug!(pid = event.pid, tid = event.tid, "new thread in trace");
        }

        self.writer
            .write_event(&event.ph, &event.cat, &event.name, ts, &args, event.tid)?;
        self.stats.events += 1;
        Ok(())
    }

    fn convert_args(event: &JsonTraceEvent) -> Result<Vec<(&str, ArgValue)>, EncodeError> {
        event
            .args
            .iter()
            .map(|(key, value)| -> Result<_, EncodeError> {
                Ok((key.as_str(), ArgValue::from_json(key, value)?))
            })
            .collect()
    }

    fn skip_or_fail(&mut self, event: &JsonTraceEvent, error: EncodeError) -> eyre::Result<()> {
        if self.strict {
            return Err(error.into());
        }
        warn!(name = %event.name, ph = %event.ph, error = %error, "skipping event");
        self.stats.skipped += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> eyre::Result<()> {
        self.writer.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}
