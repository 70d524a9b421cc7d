// Protocol constants for the Qualcomm DIAG interface

/// Frame delimiter
pub const FLAG_BYTE: u8 = 0x7E;

/// Escape marker; the following byte is XORed with [`ESCAPE_MASK`]
pub const ESCAPE_BYTE: u8 = 0x7D;

/// Mask applied to an escaped byte
pub const ESCAPE_MASK: u8 = 0x20;

/// Size of the trailing frame checksum (2 bytes)
pub const CRC_SIZE: usize = 2;

/// DIAG_LOG_F: log packet pushed by the device
pub const CMD_LOG: u8 = 0x10;

/// DIAG_LOG_CONFIG_F: log mask configuration
pub const CMD_LOG_CONFIG: u8 = 0x73;

/// DIAG_EXT_MSG_F: extended debug message
pub const CMD_EXT_MSG: u8 = 0x79;

/// DIAG_EXT_MSG_CONFIG_F: debug message mask configuration
pub const CMD_EXT_MSG_CONFIG: u8 = 0x7D;

/// DIAG_QSR_EXT_MSG_TERSE_F: hashed debug message
pub const CMD_QSR_EXT_MSG_TERSE: u8 = 0x92;

/// Sub-command of [`CMD_EXT_MSG_CONFIG`] that sets a runtime mask
pub const EXT_MSG_SET_RT_MASK: u8 = 0x04;

/// Runtime mask enabling every debug message level
pub const EXT_MSG_ALL_LEVELS: u32 = 0x1F;

/// Bytes before the log header in a log packet (command code + pending count)
pub const LOG_PACKET_PREFIX_SIZE: usize = 2;

/// Size of the fixed log header (14 bytes)
pub const LOG_HEADER_SIZE: usize = 14;

/// Longest escaped frame the device can emit: a log packet whose 16-bit
/// length fields are at their maximum, every byte escaped
pub const MAX_WIRE_FRAME_SIZE: usize = 2 * (LOG_PACKET_PREFIX_SIZE + 2 + u16::MAX as usize + CRC_SIZE);

/// Type id under which raw debug messages are reported
pub const MODEM_DEBUG_MESSAGE: u16 = 0x1FEB;

/// QCDM timestamp units per second (1.25 ms ticks with a 16-bit sub-tick)
pub const TIMESTAMP_UNITS_PER_SECOND: u64 = 52_428_800;

/// 1980-01-06T00:00:00Z, origin of QCDM timestamps
pub const GPS_EPOCH_UNIX_SECONDS: i64 = 315_964_800;
