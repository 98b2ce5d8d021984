//! Splitting a written trace back into its packets.
//!
//! Every packet is emitted as one `Trace.packet` field, so a stream is a run
//! of `0x0a <varint len> <packet>` records and can be consumed one packet at a
//! time without any outer framing.

use crate::error::EncodeError;
use crate::perfetto::TracePacket;
use bytes::{Buf, Bytes};
use prost::encoding::{decode_key, decode_varint, WireType};
use prost::Message;

const TRACE_PACKET_TAG: u32 = 1;

/// Iterates over the raw packet payloads of a trace stream.
///
/// Yields an error for a record that is not a `Trace.packet` field or whose
/// length prefix runs past the end of the data, then stops.
pub struct PacketIter {
    data: Bytes,
    offset: usize,
}

impl PacketIter {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            offset: 0,
        }
    }

    /// Byte offset of the next record in the original stream.
    pub fn offset(&self) -> usize {
        self.offset
    }

    fn split_packet(&mut self) -> Result<Bytes, &'static str> {
        let mut header = &self.data[..];
        let (tag, wire_type) = decode_key(&mut header).map_err(|_| "invalid field key")?;
        if tag != TRACE_PACKET_TAG || wire_type != WireType::LengthDelimited {
            return Err("expected a Trace.packet field");
        }
        let len = decode_varint(&mut header).map_err(|_| "invalid length prefix")? as usize;
        if header.len() < len {
            return Err("truncated packet");
        }
        let header_len = self.data.len() - header.len();
        self.data.advance(header_len);
        self.offset += header_len + len;
        Ok(self.data.split_to(len))
    }
}

impl Iterator for PacketIter {
    type Item = Result<Bytes, EncodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.data.is_empty() {
            return None;
        }
        let offset = self.offset;
        let packet = self.split_packet();
        if packet.is_err() {
            self.data.clear();
        }
        Some(packet.map_err(|reason| EncodeError::Framing { offset, reason }))
    }
}

pub fn decode_packets(data: impl Into<Bytes>) -> Result<Vec<TracePacket>, EncodeError> {
    PacketIter::new(data)
        .map(|packet| -> Result<_, EncodeError> { Ok(TracePacket::decode(packet?)?) })
        .collect()
}
