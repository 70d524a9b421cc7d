pub mod catalog;
pub mod collector;
pub mod command;
pub mod constants;
pub mod debug_message;
pub mod decoder;
pub mod error;
pub mod hdlc;
pub mod packet;
pub mod port;


pub use catalog::{TypeCatalog, TypeId, VERSION, catalog, log_packet_types};
pub use collector::{DmCollector, ReceiveOptions, ReceivedPacket, disable_logs, enable_logs, generate_diag_cfg};
pub use decoder::{DecodedPacket, DecoderRegistry, Fields, PacketDispatcher};
pub use error::DiagError;
