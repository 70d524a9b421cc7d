//! # HDLC-like framing used by the DIAG interface
//!
//! Every message on the wire is the payload followed by a little-endian
//! CRC-16/X.25 checksum, byte-stuffed so that [`FLAG_BYTE`] only ever appears
//! as a delimiter, and closed by [`FLAG_BYTE`].
//!
//! - [`encode_frame`] produces a complete, delimited wire message.
//! - [`Deframer`] accumulates arbitrary chunks read from a transport and
//!   hands back complete [`Frame`]s in arrival order.

use bytes::{BufMut, Bytes, BytesMut};
use crc::{CRC_16_IBM_SDLC, Crc};
use tracing::{trace, warn};

use crate::constants::{CRC_SIZE, ESCAPE_BYTE, ESCAPE_MASK, FLAG_BYTE, MAX_WIRE_FRAME_SIZE};

/// CRC-16/IBM-SDLC, better known as the X.25 frame check sequence.
pub const DIAG_CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_SDLC);

/// Checksum of an unescaped payload.
pub fn crc16(data: &[u8]) -> u16 {
    DIAG_CRC.checksum(data)
}

fn put_escaped(out: &mut BytesMut, bytes: &[u8]) {
    for &byte in bytes {
        if byte == FLAG_BYTE || byte == ESCAPE_BYTE {
            out.put_u8(ESCAPE_BYTE);
            out.put_u8(byte ^ ESCAPE_MASK);
        } else {
            out.put_u8(byte);
        }
    }
}

/// Wrap a raw payload into a wire frame: `7E | escaped(payload ++ crc) | 7E`.
pub fn encode_frame(payload: &[u8]) -> Bytes {
    let crc = crc16(payload).to_le_bytes();
    // worst case every byte is escaped
    let mut out = BytesMut::with_capacity(2 * (payload.len() + CRC_SIZE) + 2);
    out.put_u8(FLAG_BYTE);
    put_escaped(&mut out, payload);
    put_escaped(&mut out, &crc);
    out.put_u8(FLAG_BYTE);
    out.freeze()
}

/// One delimited unit taken off the wire, already unescaped and with the
/// checksum stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub payload: Bytes,
    pub crc_valid: bool,
}

impl Frame {
    /// Unescape the bytes between two delimiters and verify the checksum.
    fn from_escaped(raw: &[u8]) -> Self {
        let mut content = BytesMut::with_capacity(raw.len());
        let mut escaped = false;
        for &byte in raw {
            if escaped {
                content.put_u8(byte ^ ESCAPE_MASK);
                escaped = false;
            } else if byte == ESCAPE_BYTE {
                escaped = true;
            } else {
                content.put_u8(byte);
            }
        }

        // A dangling escape means the frame was cut short
        if escaped || content.len() < CRC_SIZE {
            return Frame {
                payload: content.freeze(),
                crc_valid: false,
            };
        }

        let body_len = content.len() - CRC_SIZE;
        let expected = u16::from_le_bytes([content[body_len], content[body_len + 1]]);
        let crc_valid = crc16(&content[..body_len]) == expected;
        content.truncate(body_len);

        Frame {
            payload: content.freeze(),
            crc_valid,
        }
    }
}

/// Incremental frame extractor over a chunked byte stream.
///
/// The buffer persists across calls, so a frame split over several
/// [`Deframer::ingest`] calls is produced whole once its closing flag
/// arrives. Bytes after the last flag stay buffered, and the flag search
/// resumes where the previous one stopped.
#[derive(Debug, Default)]
pub struct Deframer {
    buffer: BytesMut,
    /// Leading bytes of `buffer` already known to hold no flag.
    scanned: usize,
    discarded: u64,
}

impl Deframer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk read from the transport. Empty chunks are fine.
    pub fn ingest(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Number of bytes still waiting for a closing flag.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    /// Bytes thrown away because no flag arrived within [`MAX_WIRE_FRAME_SIZE`].
    pub fn discarded_bytes(&self) -> u64 {
        self.discarded
    }

    /// Pop the earliest complete frame, or `None` if more bytes are needed.
    ///
    /// Adjacent flags (including the opening flag of a frame that follows a
    /// closing one) delimit nothing and are skipped. An unterminated run longer
    /// than any valid frame is dropped.
    pub fn try_take_frame(&mut self) -> Option<Frame> {
        loop {
            let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == FLAG_BYTE) else {
                self.scanned = self.buffer.len();
                if self.buffer.len() > MAX_WIRE_FRAME_SIZE {
                    warn!(len = self.buffer.len(), "No frame delimiter in stream, buffer discarded");
                    self.discarded += self.buffer.len() as u64;
                    self.buffer.clear();
                    self.scanned = 0;
                }
                return None;
            };
            let end = self.scanned + offset;
            self.scanned = 0;

            let chunk = self.buffer.split_to(end + 1);
            let raw = &chunk[..end];
            if raw.is_empty() {
                continue;
            }

            let frame = Frame::from_escaped(raw);
            trace!(
                wire_len = raw.len(),
                payload_len = frame.payload.len(),
                crc_valid = frame.crc_valid,
                "Frame complete"
            );
            return Some(frame);
        }
    }
}
