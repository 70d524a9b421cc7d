//! Capture session and log enable/disable entry points.
//!
//! A [`DmCollector`] owns the receive buffer of one byte stream. The caller
//! runs the transport loop: read a chunk, [`DmCollector::feed_binary`] it,
//! then call [`DmCollector::receive_log_packet`] until it returns `None`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, warn};

use crate::command::CommandBuilder;
use crate::decoder::{DecodedPacket, DecoderRegistry, PacketDispatcher};
use crate::error::DiagError;
use crate::hdlc::Deframer;
use crate::packet::PacketKind;
use crate::port::{DiagPort, Sink, send_commands};

/// Wall-clock source for capture timestamps.
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Only decode the header; keep the payload raw.
    pub skip_decoding: bool,
    /// Attach the host time at which the packet was retrieved.
    pub include_timestamp: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReceivedPacket {
    #[serde(flatten)]
    pub packet: DecodedPacket,
    /// Host time of retrieval, unrelated to the timestamp in the header.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CaptureStats {
    pub frames: u64,
    pub crc_failures: u64,
    pub unrecognized: u64,
    /// Recognized frames that could still not be decoded (e.g. truncated header)
    pub dropped: u64,
    pub log_packets: u64,
    pub debug_packets: u64,
}

/// One capture session over a single diagnostic byte stream.
#[derive(Debug)]
pub struct DmCollector<C: Clock = SystemClock> {
    deframer: Deframer,
    dispatcher: PacketDispatcher,
    clock: C,
    stats: CaptureStats,
}

impl Default for DmCollector<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl DmCollector<SystemClock> {
    /// Session decoding with the built-in decoders only.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(DecoderRegistry::with_builtin()))
    }

    pub fn with_registry(registry: Arc<DecoderRegistry>) -> Self {
        Self::with_clock(registry, SystemClock)
    }
}

impl<C: Clock> DmCollector<C> {
    pub fn with_clock(registry: Arc<DecoderRegistry>, clock: C) -> Self {
        Self {
            deframer: Deframer::new(),
            dispatcher: PacketDispatcher::new(registry),
            clock,
            stats: CaptureStats::default(),
        }
    }

    /// Append raw bytes read from the transport.
    pub fn feed_binary(&mut self, bytes: &[u8]) {
        self.deframer.ingest(bytes);
    }

    /// Decode the next decodable frame.
    ///
    /// Frames failing the checksum or not carrying a log or debug packet are
    /// dropped and counted. `None` means no complete frame is left.
    pub fn receive_log_packet(&mut self, options: ReceiveOptions) -> Option<ReceivedPacket> {
        let received_at = options.include_timestamp.then(|| self.clock.now());

        while let Some(frame) = self.deframer.try_take_frame() {
            self.stats.frames += 1;
            if !frame.crc_valid {
                self.stats.crc_failures += 1;
                warn!(len = frame.payload.len(), "Checksum mismatch, frame dropped");
                continue;
            }

            match self.dispatcher.decode_classified(&frame.payload, options.skip_decoding) {
                (kind, Some(packet)) => {
                    if kind == PacketKind::DebugPacket {
                        self.stats.debug_packets += 1;
                    } else {
                        self.stats.log_packets += 1;
                    }
                    return Some(ReceivedPacket { packet, received_at });
                }
                (PacketKind::Unrecognized, None) => self.stats.unrecognized += 1,
                (_, None) => self.stats.dropped += 1,
            }
        }
        None
    }

    pub fn stats(&self) -> CaptureStats {
        self.stats
    }

    /// Bytes buffered after the last complete frame.
    pub fn pending_bytes(&self) -> usize {
        self.deframer.buffered_len()
    }
}

/// Stop all logging on a live port.
pub fn disable_logs(port: &mut DiagPort) -> Result<(), DiagError> {
    port.ensure_serial_port()?;
    send_commands(port.sink()?, &[CommandBuilder::build_disable()])
}

/// Enable the given log types on a live port, using the process-wide catalog.
pub fn enable_logs<S: AsRef<str>>(port: &mut DiagPort, type_names: &[S]) -> Result<(), DiagError> {
    enable_logs_with(&CommandBuilder::default(), port, type_names)
}

pub fn enable_logs_with<S: AsRef<str>>(
    builder: &CommandBuilder<'_>,
    port: &mut DiagPort,
    type_names: &[S],
) -> Result<(), DiagError> {
    port.ensure_serial_port()?;
    let commands = builder.build_enable(type_names)?;
    debug!(count = commands.len(), "Enabling logs");
    send_commands(port.sink()?, &commands)
}

/// Write a `Diag.cfg` image: the framed commands an on-device logging agent
/// replays at start-up, always led by a Disable.
pub fn generate_diag_cfg<W, S>(sink: &mut W, type_names: &[S]) -> Result<(), DiagError>
where
    W: Sink + ?Sized,
    S: AsRef<str>,
{
    generate_diag_cfg_with(&CommandBuilder::default(), sink, type_names)
}

pub fn generate_diag_cfg_with<W, S>(
    builder: &CommandBuilder<'_>,
    sink: &mut W,
    type_names: &[S],
) -> Result<(), DiagError>
where
    W: Sink + ?Sized,
    S: AsRef<str>,
{
    let mut commands = vec![CommandBuilder::build_disable()];
    commands.extend(builder.build_enable(type_names)?);
    send_commands(sink, &commands)
}
