//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use bytes::Bytes;
#[allow(unused_imports)]
pub use qcdm_lib::catalog::{TypeCatalog, TypeId, catalog};
#[allow(unused_imports)]
pub use qcdm_lib::command::{Command, CommandBuilder, DebugSubsystem, encode_command};
#[allow(unused_imports)]
pub use qcdm_lib::decoder::{DecodedPacket, DecoderRegistry, FieldMap, Fields, PacketDispatcher};
#[allow(unused_imports)]
pub use qcdm_lib::error::DiagError;
#[allow(unused_imports)]
pub use qcdm_lib::hdlc::{Deframer, Frame, encode_frame};

/// Route library log output through the test harness; `RUST_LOG` selects the level
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Decode hex string to bytes for testing
#[allow(dead_code)]
pub fn hex_to_bytes(hex_data: &str) -> Bytes {
    Bytes::from(hex::decode(hex_data).expect("Failed to decode hex"))
}

/// Build an unframed DIAG_LOG packet the way the modem emits it
#[allow(dead_code)]
pub fn log_packet(type_id: u16, timestamp: u64, payload: &[u8]) -> Bytes {
    let len = (12 + payload.len()) as u16;
    let mut packet = vec![0x10, 0x00];
    packet.extend_from_slice(&len.to_le_bytes());
    packet.extend_from_slice(&len.to_le_bytes());
    packet.extend_from_slice(&type_id.to_le_bytes());
    packet.extend_from_slice(&timestamp.to_le_bytes());
    packet.extend_from_slice(payload);
    Bytes::from(packet)
}

/// Extended debug message (0x79): two args, format string and file name
#[allow(dead_code)]
pub fn ext_debug_message() -> Bytes {
    let mut msg = vec![0x79, 0x00, 0x02, 0x00];
    msg.extend_from_slice(&0x0000_0001_0000_0000u64.to_le_bytes());
    msg.extend_from_slice(&42u16.to_le_bytes()); // line
    msg.extend_from_slice(&9010u16.to_le_bytes()); // ssid
    msg.extend_from_slice(&4u32.to_le_bytes()); // ss_mask
    msg.extend_from_slice(&7u32.to_le_bytes());
    msg.extend_from_slice(&0xDEAD_BEEFu32.to_le_bytes());
    msg.extend_from_slice(b"rsrp=%d cell=%x\0");
    msg.extend_from_slice(b"lte_ml1_sm.c\0");
    Bytes::from(msg)
}

/// LTE RRC OTA log packet (0xB0C0) carrying a 3-byte BCCH-BCH PDU
#[allow(dead_code)]
pub const LTE_RRC_OTA_MIB: &str = concat!(
    "1000", "2300", "2300", "c0b0", "8b1e4c6a9bd70000",
    "0f0c0e0000", "a1000000", "5f12", "00000000", "01", "0000", "0300", "a8540c"
);

/// Payload whose bytes need no escaping, even after any single bit flip
#[allow(dead_code)]
pub const UNESCAPED_PAYLOAD: &[u8] = &[0x10, 0x00, 0x12, 0x00, 0x12, 0x00, 0x33, 0x21, 0x01, 0x02, 0x30, 0x00];
