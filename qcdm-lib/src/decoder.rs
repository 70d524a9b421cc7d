//! Header parsing and payload dispatch.
//!
//! The per-type payload layouts are not part of the engine: they are supplied
//! through a [`DecoderRegistry`]. A type id without a registered decoder still
//! yields a [`DecodedPacket`], with the payload kept as raw bytes, so that new
//! firmware log types never stop a capture.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Serialize, Serializer};
use tracing::{debug, trace, warn};

use crate::catalog::TypeId;
use crate::constants::{LOG_PACKET_PREFIX_SIZE, MODEM_DEBUG_MESSAGE};
use crate::debug_message::DebugMessageDecoder;
use crate::error::DiagError;
use crate::packet::{PacketKind, QcdmTimestamp, split_log_body, synthesize_debug_log_body};

pub type FieldMap = serde_json::Map<String, serde_json::Value>;

/// Interprets the payload of one log type.
pub trait PayloadDecoder: Send + Sync {
    fn decode(&self, type_id: TypeId, payload: &[u8]) -> Result<FieldMap, DiagError>;
}

impl<F> PayloadDecoder for F
where
    F: Fn(&[u8]) -> Result<FieldMap, DiagError> + Send + Sync,
{
    fn decode(&self, _type_id: TypeId, payload: &[u8]) -> Result<FieldMap, DiagError> {
        self(payload)
    }
}

fn serialize_hex<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Fields {
    /// Output of the registered payload decoder.
    Decoded(FieldMap),
    /// Undecoded payload: no decoder, decoding skipped, or decoder failure.
    Raw(#[serde(serialize_with = "serialize_hex")] Bytes),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedPacket {
    pub type_id: TypeId,
    pub length: u16,
    pub timestamp: QcdmTimestamp,
    pub fields: Fields,
}

impl DecodedPacket {
    pub fn is_decoded(&self) -> bool {
        matches!(self.fields, Fields::Decoded(_))
    }
}

/// Payload decoders keyed by type id.
#[derive(Clone, Default)]
pub struct DecoderRegistry {
    decoders: HashMap<TypeId, Arc<dyn PayloadDecoder>>,
}

impl std::fmt::Debug for DecoderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.decoders.keys().collect();
        ids.sort();
        f.debug_struct("DecoderRegistry").field("type_ids", &ids).finish()
    }
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the decoders shipped in this crate.
    pub fn with_builtin() -> Self {
        Self::new().register(TypeId(MODEM_DEBUG_MESSAGE), DebugMessageDecoder)
    }

    pub fn register(mut self, type_id: TypeId, decoder: impl PayloadDecoder + 'static) -> Self {
        self.insert(type_id, decoder);
        self
    }

    /// Add or replace the decoder of `type_id`.
    pub fn insert(&mut self, type_id: TypeId, decoder: impl PayloadDecoder + 'static) {
        self.decoders.insert(type_id, Arc::new(decoder));
    }

    pub fn get(&self, type_id: TypeId) -> Option<&dyn PayloadDecoder> {
        self.decoders.get(&type_id).map(|d| d.as_ref())
    }

    pub fn contains(&self, type_id: TypeId) -> bool {
        self.decoders.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }
}

/// Classifies frames and turns the decodable ones into [`DecodedPacket`]s.
#[derive(Debug, Clone, Default)]
pub struct PacketDispatcher {
    registry: Arc<DecoderRegistry>,
}

impl PacketDispatcher {
    pub fn new(registry: Arc<DecoderRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &DecoderRegistry {
        &self.registry
    }

    /// Decode one deframed, checksum-verified message.
    ///
    /// Returns `None` for unrecognized frames and for log packets too short
    /// to hold a header; neither is an error.
    pub fn decode(&self, frame: &Bytes, skip_decoding: bool) -> Option<DecodedPacket> {
        self.decode_classified(frame, skip_decoding).1
    }

    /// Like [`PacketDispatcher::decode`], also reporting the shape the frame
    /// was classified as.
    pub fn decode_classified(&self, frame: &Bytes, skip_decoding: bool) -> (PacketKind, Option<DecodedPacket>) {
        let kind = PacketKind::classify(frame);
        let packet = match kind {
            PacketKind::LogPacket => self.decode_log_body(&frame.slice(LOG_PACKET_PREFIX_SIZE..), skip_decoding),
            PacketKind::DebugPacket => match synthesize_debug_log_body(frame) {
                Some(body) => self.decode_log_body(&body, skip_decoding),
                None => {
                    warn!(len = frame.len(), "Debug message too long for a log header, dropped");
                    None
                }
            },
            PacketKind::Unrecognized => {
                debug!(
                    len = frame.len(),
                    first_byte = frame.first().copied(),
                    "Unrecognized frame"
                );
                None
            }
        };
        (kind, packet)
    }

    /// Parse the fixed header of a log body and dispatch its payload.
    pub fn decode_log_body(&self, body: &Bytes, skip_decoding: bool) -> Option<DecodedPacket> {
        let (header, payload) = match split_log_body(body) {
            Ok(parts) => parts,
            Err(e) => {
                debug!("Log packet dropped: {}", e);
                return None;
            }
        };
        let raw = body.slice_ref(payload);

        let fields = if skip_decoding {
            Fields::Raw(raw)
        } else {
            match self.registry.get(header.type_id) {
                Some(decoder) => match decoder.decode(header.type_id, &raw) {
                    Ok(map) => Fields::Decoded(map),
                    Err(e) => {
                        warn!(type_id = %header.type_id, "Payload decoder failed, keeping raw bytes: {}", e);
                        Fields::Raw(raw)
                    }
                },
                None => {
                    trace!(type_id = %header.type_id, "No decoder registered");
                    Fields::Raw(raw)
                }
            }
        };

        Some(DecodedPacket {
            type_id: header.type_id,
            length: header.length,
            timestamp: header.timestamp,
            fields,
        })
    }
}
