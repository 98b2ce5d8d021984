//! Hand-written prost bindings for the subset of `perfetto.protos` used by
//! legacy chrome json-style events: thread descriptors, track events with
//! legacy payloads, interned names and benchmark metadata.
//!
//! Tag numbers match `perfetto/trace/trace_packet.proto` and friends. All
//! scalar fields are proto2 `optional`, so a field set to zero or to an empty
//! string is still written.

use bytes::{Buf, BufMut};
use prost::encoding::{self, DecodeContext, WireType};
use prost::DecodeError;

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Trace {
    #[prost(message, repeated, tag = "1")]
    pub packet: Vec<TracePacket>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TracePacket {
    #[prost(message, optional, tag = "5")]
    pub chrome_events: Option<ChromeEventBundle>,
    #[prost(uint32, optional, tag = "10")]
    pub trusted_packet_sequence_id: Option<u32>,
    #[prost(message, optional, tag = "11")]
    pub track_event: Option<TrackEvent>,
    #[prost(message, optional, tag = "12")]
    pub interned_data: Option<InternedData>,
    #[prost(bool, optional, tag = "41")]
    pub incremental_state_cleared: Option<bool>,
    #[prost(message, optional, tag = "44")]
    pub thread_descriptor: Option<ThreadDescriptor>,
    #[prost(message, optional, tag = "48")]
    pub chrome_benchmark_metadata: Option<ChromeBenchmarkMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ThreadDescriptor {
    #[prost(int32, optional, tag = "1")]
    pub pid: Option<i32>,
    #[prost(int32, optional, tag = "2")]
    pub tid: Option<i32>,
    #[prost(int64, optional, tag = "6")]
    pub reference_timestamp_us: Option<i64>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TrackEvent {
    /// Microseconds since the previous event (or descriptor) on the same sequence.
    #[prost(int64, optional, tag = "1")]
    pub timestamp_delta_us: Option<i64>,
    #[prost(uint64, repeated, packed = "false", tag = "3")]
    pub category_iids: Vec<u64>,
    #[prost(message, repeated, tag = "4")]
    pub debug_annotations: Vec<DebugAnnotation>,
    #[prost(message, optional, tag = "6")]
    pub legacy_event: Option<LegacyEvent>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LegacyEvent {
    #[prost(uint64, optional, tag = "1")]
    pub name_iid: Option<u64>,
    #[prost(int32, optional, tag = "2")]
    pub phase: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct InternedData {
    #[prost(message, repeated, tag = "1")]
    pub event_categories: Vec<EventCategory>,
    #[prost(message, repeated, tag = "2")]
    pub legacy_event_names: Vec<LegacyEventName>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct EventCategory {
    #[prost(uint64, optional, tag = "1")]
    pub iid: Option<u64>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct LegacyEventName {
    #[prost(uint64, optional, tag = "1")]
    pub iid: Option<u64>,
    #[prost(string, optional, tag = "2")]
    pub name: Option<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChromeBenchmarkMetadata {
    #[prost(int64, optional, tag = "1")]
    pub benchmark_start_time_us: Option<i64>,
    #[prost(int64, optional, tag = "2")]
    pub story_run_time_us: Option<i64>,
    #[prost(string, optional, tag = "3")]
    pub benchmark_name: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub benchmark_description: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub label: Option<String>,
    #[prost(string, optional, tag = "6")]
    pub story_name: Option<String>,
    #[prost(string, repeated, tag = "7")]
    pub story_tags: Vec<String>,
    #[prost(int32, optional, tag = "8")]
    pub story_run_index: Option<i32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChromeEventBundle {
    #[prost(message, repeated, tag = "2")]
    pub metadata: Vec<ChromeMetadata>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ChromeMetadata {
    #[prost(string, optional, tag = "1")]
    pub name: Option<String>,
    #[prost(string, optional, tag = "2")]
    pub string_value: Option<String>,
}

const DEBUG_ANNOTATION_NAME_TAG: u32 = 10;
const DEBUG_ANNOTATION_INT_TAG: u32 = 4;
const DEBUG_ANNOTATION_DOUBLE_TAG: u32 = 5;
const DEBUG_ANNOTATION_STRING_TAG: u32 = 6;

/// A named argument attached to a [`TrackEvent`].
///
/// Consumers expect the name ahead of the value, which is not tag order, so
/// [`prost::Message`] is implemented by hand instead of derived.
#[derive(Clone, PartialEq, Default, Debug)]
pub struct DebugAnnotation {
    pub name: Option<String>,
    pub value: Option<debug_annotation::Value>,
}

pub mod debug_annotation {
    #[derive(Clone, PartialEq, Debug)]
    pub enum Value {
        IntValue(i64),
        DoubleValue(f64),
        StringValue(String),
    }
}

impl prost::Message for DebugAnnotation {
    fn encode_raw(&self, buf: &mut impl BufMut) {
        if let Some(name) = &self.name {
            encoding::string::encode(DEBUG_ANNOTATION_NAME_TAG, name, buf);
        }
        match &self.value {
            Some(debug_annotation::Value::IntValue(v)) => {
                encoding::int64::encode(DEBUG_ANNOTATION_INT_TAG, v, buf)
            }
            Some(debug_annotation::Value::DoubleValue(v)) => {
                encoding::double::encode(DEBUG_ANNOTATION_DOUBLE_TAG, v, buf)
            }
            Some(debug_annotation::Value::StringValue(v)) => {
                encoding::string::encode(DEBUG_ANNOTATION_STRING_TAG, v, buf)
            }
            None => {}
        }
    }

    fn merge_field(
        &mut self,
        tag: u32,
        wire_type: WireType,
        buf: &mut impl Buf,
        ctx: DecodeContext,
    ) -> Result<(), DecodeError> {
        match tag {
            DEBUG_ANNOTATION_NAME_TAG => {
                let name = self.name.get_or_insert_with(String::new);
                encoding::string::merge(wire_type, name, buf, ctx)
            }
            DEBUG_ANNOTATION_INT_TAG => {
                let mut value = 0i64;
                encoding::int64::merge(wire_type, &mut value, buf, ctx)?;
                self.value = Some(debug_annotation::Value::IntValue(value));
                Ok(())
            }
            DEBUG_ANNOTATION_DOUBLE_TAG => {
                let mut value = 0f64;
                encoding::double::merge(wire_type, &mut value, buf, ctx)?;
                self.value = Some(debug_annotation::Value::DoubleValue(value));
                Ok(())
            }
            DEBUG_ANNOTATION_STRING_TAG => {
                let mut value = String::new();
                encoding::string::merge(wire_type, &mut value, buf, ctx)?;
                self.value = Some(debug_annotation::Value::StringValue(value));
                Ok(())
            }
            _ => encoding::skip_field(wire_type, tag, buf, ctx),
        }
    }

    fn encoded_len(&self) -> usize {
        let name_len = self
            .name
            .as_ref()
            .map_or(0, |name| encoding::string::encoded_len(DEBUG_ANNOTATION_NAME_TAG, name));
        let value_len = match &self.value {
            Some(debug_annotation::Value::IntValue(v)) => {
                encoding::int64::encoded_len(DEBUG_ANNOTATION_INT_TAG, v)
            }
            Some(debug_annotation::Value::DoubleValue(v)) => {
                encoding::double::encoded_len(DEBUG_ANNOTATION_DOUBLE_TAG, v)
            }
            Some(debug_annotation::Value::StringValue(v)) => {
                encoding::string::encoded_len(DEBUG_ANNOTATION_STRING_TAG, v)
            }
            None => 0,
        };
        name_len + value_len
    }

    fn clear(&mut self) {
        self.name = None;
        self.value = None;
    }
}
