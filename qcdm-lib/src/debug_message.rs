//! Decoder for raw modem debug messages (`Modem_debug_message`).
//!
//! Two layouts reach this decoder once a log header has been synthesized for
//! them:
//!
//! - `0x79` extended message: header, `num_args` u32 arguments, then the
//!   NUL-terminated format string and source file name.
//! - `0x92` terse message: header, a u32 hash of the format string (resolved
//!   off-device), then the arguments.

use bytes::Buf;
use serde_json::json;
use zerocopy::byteorder::little_endian::{U16, U32, U64};
use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout, Unaligned};

use crate::catalog::TypeId;
use crate::constants::{CMD_EXT_MSG, CMD_QSR_EXT_MSG_TERSE};
use crate::decoder::{FieldMap, PayloadDecoder};
use crate::error::DiagError;

/// Common debug message header (20 bytes)
#[derive(Debug, Clone, Copy, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct ExtMessageHeaderRaw {
    pub cmd_code: u8,
    pub ts_type: u8,
    pub num_args: u8,
    pub drop_count: u8,
    pub timestamp: U64,
    pub line: U16,
    pub ssid: U16,
    pub ss_mask: U32,
}

pub const EXT_MESSAGE_HEADER_SIZE: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct DebugMessageDecoder;

fn take_u32(rest: &mut &[u8]) -> Result<u32, DiagError> {
    if rest.remaining() < 4 {
        return Err(DiagError::InsufficientData {
            expected: 4,
            actual: rest.remaining(),
        });
    }
    Ok(rest.get_u32_le())
}

fn take_c_string(rest: &mut &[u8]) -> String {
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    let s = String::from_utf8_lossy(&rest[..end]).into_owned();
    rest.advance((end + 1).min(rest.len()));
    s
}

impl PayloadDecoder for DebugMessageDecoder {
    fn decode(&self, type_id: TypeId, payload: &[u8]) -> Result<FieldMap, DiagError> {
        let (header, mut rest) =
            ExtMessageHeaderRaw::ref_from_prefix(payload).map_err(|_| DiagError::InsufficientData {
                expected: EXT_MESSAGE_HEADER_SIZE,
                actual: payload.len(),
            })?;

        let mut fields = FieldMap::new();
        fields.insert("cmd_code".into(), json!(header.cmd_code));
        fields.insert("ts_type".into(), json!(header.ts_type));
        fields.insert("num_args".into(), json!(header.num_args));
        fields.insert("drop_count".into(), json!(header.drop_count));
        fields.insert("timestamp".into(), json!(header.timestamp.get()));
        fields.insert("line".into(), json!(header.line.get()));
        fields.insert("ssid".into(), json!(header.ssid.get()));
        fields.insert("ss_mask".into(), json!(header.ss_mask.get()));

        let read_args = |rest: &mut &[u8]| -> Result<Vec<u32>, DiagError> {
            (0..header.num_args).map(|_| take_u32(rest)).collect()
        };

        match header.cmd_code {
            CMD_EXT_MSG => {
                let args = read_args(&mut rest)?;
                fields.insert("args".into(), json!(args));
                fields.insert("format".into(), json!(take_c_string(&mut rest)));
                fields.insert("file".into(), json!(take_c_string(&mut rest)));
            }
            CMD_QSR_EXT_MSG_TERSE => {
                fields.insert("msg_hash".into(), json!(take_u32(&mut rest)?));
                let args = read_args(&mut rest)?;
                fields.insert("args".into(), json!(args));
            }
            other => {
                return Err(DiagError::Decode {
                    type_id: type_id.0,
                    message: format!("unexpected debug message command {other:#04x}"),
                });
            }
        }

        Ok(fields)
    }
}
