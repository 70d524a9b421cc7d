use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Serialize, Serializer};
use strum_macros::Display;
use zerocopy::byteorder::little_endian::{U16, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::catalog::TypeId;
use crate::constants::*;
use crate::error::DiagError;

/// Shape of a deframed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum PacketKind {
    /// `DIAG_LOG` packet with the standard log header.
    LogPacket,
    /// Raw debug message dump with no log header at all.
    DebugPacket,
    /// Anything else (command responses, events, garbage).
    Unrecognized,
}

impl PacketKind {
    pub fn classify(frame: &[u8]) -> Self {
        match frame {
            [CMD_LOG, _, ..] => PacketKind::LogPacket,
            [CMD_EXT_MSG | CMD_QSR_EXT_MSG_TERSE, _, ..] => PacketKind::DebugPacket,
            _ => PacketKind::Unrecognized,
        }
    }
}

/// Fixed log header (14 bytes), following the two-byte log packet prefix
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct LogHeaderRaw {
    pub outer_len: U16,
    pub log_msg_len: U16,
    pub type_id: U16,
    pub timestamp: U64,
}

/// Device timestamp: 1.25 ms ticks since the GPS epoch in the upper 48 bits,
/// sub-tick units in the lower 16.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct QcdmTimestamp(pub u64);

impl QcdmTimestamp {
    pub fn seconds_since_gps_epoch(&self) -> f64 {
        self.0 as f64 / TIMESTAMP_UNITS_PER_SECOND as f64
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        let micros = u128::from(self.0) * 1_000_000 / u128::from(TIMESTAMP_UNITS_PER_SECOND);
        // u64::MAX units is roughly 11,000 years, well inside i64 microseconds
        DateTime::UNIX_EPOCH
            + TimeDelta::seconds(GPS_EPOCH_UNIX_SECONDS)
            + TimeDelta::microseconds(micros as i64)
    }
}

impl Serialize for QcdmTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_datetime().to_rfc3339())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogHeader {
    pub type_id: TypeId,
    pub length: u16,
    pub timestamp: QcdmTimestamp,
}

impl From<&LogHeaderRaw> for LogHeader {
    fn from(raw: &LogHeaderRaw) -> Self {
        Self {
            type_id: TypeId(raw.type_id.get()),
            length: raw.log_msg_len.get(),
            timestamp: QcdmTimestamp(raw.timestamp.get()),
        }
    }
}

/// Split a log body (a log packet without its two-byte prefix) into the
/// parsed header and the remaining payload.
pub fn split_log_body(body: &[u8]) -> Result<(LogHeader, &[u8]), DiagError> {
    let (raw, payload) = LogHeaderRaw::ref_from_prefix(body).map_err(|_| DiagError::InsufficientData {
        expected: LOG_HEADER_SIZE,
        actual: body.len(),
    })?;
    Ok((LogHeader::from(raw), payload))
}

/// Prepend the header a debug message dump lacks, turning it into a log body
/// of type [`MODEM_DEBUG_MESSAGE`].
///
/// The header is constant apart from `log_msg_len`, which covers the header
/// itself plus the dump. Returns `None` when that length does not fit 16 bits.
pub fn synthesize_debug_log_body(dump: &[u8]) -> Option<Bytes> {
    let length = u16::try_from(dump.len() + LOG_HEADER_SIZE).ok()?;
    let header = LogHeaderRaw {
        outer_len: U16::new(0),
        log_msg_len: U16::new(length),
        type_id: U16::new(MODEM_DEBUG_MESSAGE),
        timestamp: U64::new(0),
    };

    let mut body = BytesMut::with_capacity(usize::from(length));
    body.put_slice(header.as_bytes());
    body.put_slice(dump);
    Some(body.freeze())
}
