use bon::Builder;
use bytes::BytesMut;
use prost::Message;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

pub mod error;
pub mod framing;
pub mod perfetto;


pub use error::EncodeError;
pub use framing::{decode_packets, PacketIter};
pub use perfetto::*;

/// Sequence id handed to the first thread after construction or reset.
pub const FIRST_SEQUENCE_ID: u32 = 1 << 20;

const CLOCK_DOMAIN_KEY: &str = "clock-domain";
const THREAD_ID_MASK: u64 = 0x7fff_ffff;

/// Incremental state of one thread's packet sequence.
#[derive(Debug)]
struct SequenceState {
    sequence_id: u32,
    last_timestamp_us: i64,
    categories: HashMap<String, u64>,
    event_names: HashMap<String, u64>,
}

impl SequenceState {
    fn new(sequence_id: u32, reference_timestamp_us: i64) -> Self {
        Self {
            sequence_id,
            last_timestamp_us: reference_timestamp_us,
            categories: HashMap::new(),
            event_names: HashMap::new(),
        }
    }
}

/// Looks up `value` in an intern table. Returns the iid and whether it still
/// has to be emitted (and inserted) with the packet.
fn intern_lookup(table: &HashMap<String, u64>, value: &str) -> (u64, bool) {
    match table.get(value) {
        Some(&iid) => (iid, false),
        None => (table.len() as u64 + 1, true),
    }
}

/// Numeric legacy phase of a single-character chrome phase such as `"B"`.
pub fn parse_phase(ph: &str) -> Result<i32, EncodeError> {
    let mut chars = ph.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c as i32),
        _ => Err(EncodeError::InvalidPhase(ph.to_string())),
    }
}

/// Writes chrome json-style trace events as length-delimited perfetto
/// `TracePacket`s.
///
/// Each thread gets its own trusted packet sequence, opened by
/// [`write_thread_descriptor_event`](Self::write_thread_descriptor_event).
/// Event timestamps are delta-encoded against the previous packet on the
/// sequence, and category and event names are interned per sequence.
///
/// A packet is encoded completely before it reaches the writer, and the
/// sequence state is only updated after the write went through. The writer is
/// not synchronized; share it across threads behind a lock.
pub struct PerfettoTraceWriter<W: Write> {
    writer: W,
    next_sequence_id: u32,
    sequences: HashMap<u64, SequenceState>,
}

impl<W: Write> PerfettoTraceWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            next_sequence_id: FIRST_SEQUENCE_ID,
            sequences: HashMap::new(),
        }
    }

    /// Forgets all sequences, interned names and timestamps. The next thread
    /// descriptor starts again at [`FIRST_SEQUENCE_ID`].
    pub fn reset(&mut self) {
        debug!(sequences = self.sequences.len(), "resetting trace writer state");
        self.next_sequence_id = FIRST_SEQUENCE_ID;
        self.sequences.clear();
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Sequence id assigned to `tid`, if a descriptor was written for it.
    pub fn sequence_id(&self, tid: u64) -> Option<u32> {
        self.sequences.get(&tid).map(|state| state.sequence_id)
    }

    /// Opens (or restarts) the packet sequence of `tid` with `ts` as the
    /// reference timestamp. Restarting clears the sequence's interned names.
    pub fn write_thread_descriptor_event(
        &mut self,
        pid: u32,
        tid: u64,
        ts: i64,
    ) -> Result<(), EncodeError> {
        let (sequence_id, is_new) = match self.sequences.get(&tid) {
            Some(state) => (state.sequence_id, false),
            None => (self.next_sequence_id, true),
        };

        let thread_desc = ThreadDescriptor {
            pid: Some(pid as i32),
            tid: Some((tid & THREAD_ID_MASK) as i32),
            reference_timestamp_us: Some(ts),
        };

        let packet = TracePacket {
            trusted_packet_sequence_id: Some(sequence_id),
            incremental_state_cleared: Some(true),
            thread_descriptor: Some(thread_desc),
            ..Default::default()
        };
        self.write_packet(packet)?;

        if is_new {
            debug!(pid, tid, sequence_id, "opened packet sequence");
            self.next_sequence_id += 1;
        }
        self.sequences.insert(tid, SequenceState::new(sequence_id, ts));
        Ok(())
    }

    /// Writes one legacy event on the sequence of `tid`.
    ///
    /// `ph` is the single-character chrome phase. Arguments are emitted as
    /// debug annotations in the order given.
    pub fn write_event(
        &mut self,
        ph: &str,
        category: &str,
        name: &str,
        ts: i64,
        args: &[(&str, ArgValue)],
        tid: u64,
    ) -> Result<(), EncodeError> {
        let phase = parse_phase(ph)?;
        let state = self
            .sequences
            .get(&tid)
            .ok_or(EncodeError::MissingThreadDescriptor(tid))?;

        let sequence_id = state.sequence_id;
        let timestamp_delta_us = ts.wrapping_sub(state.last_timestamp_us);
        let (category_iid, new_category) = intern_lookup(&state.categories, category);
        let (name_iid, new_name) = intern_lookup(&state.event_names, name);

        let interned_data = (new_category || new_name).then(|| {
            let mut data = InternedData::default();
            if new_category {
                data.event_categories.push(EventCategory {
                    iid: Some(category_iid),
                    name: Some(category.to_string()),
                });
            }
            if new_name {
                data.legacy_event_names.push(LegacyEventName {
                    iid: Some(name_iid),
                    name: Some(name.to_string()),
                });
            }
            data
        });

        let event = TrackEvent {
            timestamp_delta_us: Some(timestamp_delta_us),
            category_iids: vec![category_iid],
            debug_annotations: args
                .iter()
                .map(|(key, value)| create_debug_annotation(key, value))
                .collect(),
            legacy_event: Some(LegacyEvent {
                name_iid: Some(name_iid),
                phase: Some(phase),
            }),
        };

        let packet = TracePacket {
            trusted_packet_sequence_id: Some(sequence_id),
            track_event: Some(event),
            interned_data,
            ..Default::default()
        };
        self.write_packet(packet)?;

        if let Some(state) = self.sequences.get_mut(&tid) {
            if new_category {
                state.categories.insert(category.to_string(), category_iid);
            }
            if new_name {
                state.event_names.insert(name.to_string(), name_iid);
            }
            state.last_timestamp_us = ts;
        }
        Ok(())
    }

    pub fn write_metadata(&mut self, metadata: &BenchmarkMetadata) -> Result<(), EncodeError> {
        let benchmark = ChromeBenchmarkMetadata {
            benchmark_start_time_us: Some(metadata.benchmark_start_time_us),
            story_run_time_us: Some(metadata.story_run_time_us),
            benchmark_name: Some(metadata.benchmark_name.clone()),
            benchmark_description: Some(metadata.benchmark_description.clone()),
            label: Some(metadata.label.clone()),
            story_name: Some(metadata.story_name.clone()),
            story_tags: metadata.story_tags.clone(),
            story_run_index: Some(metadata.story_run_index),
        };

        let packet = TracePacket {
            chrome_benchmark_metadata: Some(benchmark),
            ..Default::default()
        };
        self.write_packet(packet)
    }

    pub fn write_chrome_metadata(&mut self, clock_domain: &str) -> Result<(), EncodeError> {
        let bundle = ChromeEventBundle {
            metadata: vec![ChromeMetadata {
                name: Some(CLOCK_DOMAIN_KEY.to_string()),
                string_value: Some(clock_domain.to_string()),
            }],
        };

        let packet = TracePacket {
            chrome_events: Some(bundle),
            ..Default::default()
        };
        self.write_packet(packet)
    }

    /// Appends `packet` as a single `Trace.packet` record.
    pub fn write_packet(&mut self, packet: TracePacket) -> Result<(), EncodeError> {
        let trace = Trace {
            packet: vec![packet],
        };
        let mut buf = BytesMut::with_capacity(trace.encoded_len());
        trace.encode(&mut buf)?;
        self.writer.write_all(&buf)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), EncodeError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Run-level metadata of a telemetry benchmark story.
#[derive(Debug, Clone, PartialEq, Builder)]
pub struct BenchmarkMetadata {
    pub benchmark_start_time_us: i64,
    pub story_run_time_us: i64,
    #[builder(into)]
    pub benchmark_name: String,
    #[builder(into)]
    pub benchmark_description: String,
    #[builder(into)]
    pub story_name: String,
    #[builder(default)]
    pub story_tags: Vec<String>,
    #[builder(default)]
    pub story_run_index: i32,
    #[builder(into)]
    pub label: String,
}

/// Value of an event argument. Anything else is rejected before it reaches
/// the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    Int(i64),
    Double(f64),
    String(String),
}

impl ArgValue {
    /// Converts a json argument. Booleans become `0`/`1`; null, arrays and
    /// objects are rejected.
    pub fn from_json(key: &str, value: &serde_json::Value) -> Result<Self, EncodeError> {
        use serde_json::Value;

        let unsupported = |kind| EncodeError::UnsupportedArgumentType {
            key: key.to_string(),
            kind,
        };
        match value {
            Value::Bool(b) => Ok(ArgValue::Int(i64::from(*b))),
            Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                (Some(i), _) => Ok(ArgValue::Int(i)),
                (None, Some(f)) => Ok(ArgValue::Double(f)),
                (None, None) => Err(unsupported("number")),
            },
            Value::String(s) => Ok(ArgValue::String(s.clone())),
            Value::Null => Err(unsupported("null")),
            Value::Array(_) => Err(unsupported("array")),
            Value::Object(_) => Err(unsupported("object")),
        }
    }
}

impl From<i64> for ArgValue {
    fn from(value: i64) -> Self {
        ArgValue::Int(value)
    }
}

impl From<i32> for ArgValue {
    fn from(value: i32) -> Self {
        ArgValue::Int(value.into())
    }
}

impl From<u32> for ArgValue {
    fn from(value: u32) -> Self {
        ArgValue::Int(value.into())
    }
}

impl From<f64> for ArgValue {
    fn from(value: f64) -> Self {
        ArgValue::Double(value)
    }
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        ArgValue::String(value.to_string())
    }
}

impl From<String> for ArgValue {
    fn from(value: String) -> Self {
        ArgValue::String(value)
    }
}

pub fn create_debug_annotation(name: &str, value: &ArgValue) -> DebugAnnotation {
    DebugAnnotation {
        name: Some(name.to_string()),
        value: Some(match value {
            ArgValue::Int(i) => debug_annotation::Value::IntValue(*i),
            ArgValue::Double(d) => debug_annotation::Value::DoubleValue(*d),
            ArgValue::String(s) => debug_annotation::Value::StringValue(s.clone()),
        }),
    }
}
