use std::io::{self, Read, Write};

use tracing::{debug, info};

use crate::command::{Command, encode_command};
use crate::error::DiagError;
use crate::hdlc::encode_frame;

/// Anything framed commands can be written to: a live port or a file.
pub trait Sink {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()>;
}

impl<W: Write> Sink for W {
    fn write_bytes(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.write_all(bytes)?;
        self.flush()
    }
}

/// Anything raw diagnostic bytes can be read from.
pub trait Source {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl<R: Read> Source for R {
    fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read(buf)
    }
}

/// A transport handed in by the caller, possibly with only one direction.
///
/// Serial ports are usually split into a reader and a cloned writer handle;
/// either half may be missing, and operations needing it fail with
/// [`DiagError::InvalidArgument`] before doing anything.
#[derive(Default)]
pub struct DiagPort {
    source: Option<Box<dyn Source + Send>>,
    sink: Option<Box<dyn Sink + Send>>,
}

impl DiagPort {
    pub fn new(source: impl Source + Send + 'static, sink: impl Sink + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            sink: Some(Box::new(sink)),
        }
    }

    pub fn read_only(source: impl Source + Send + 'static) -> Self {
        Self {
            source: Some(Box::new(source)),
            sink: None,
        }
    }

    pub fn write_only(sink: impl Sink + Send + 'static) -> Self {
        Self {
            source: None,
            sink: Some(Box::new(sink)),
        }
    }

    pub fn is_readable(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_writable(&self) -> bool {
        self.sink.is_some()
    }

    /// Fail unless both halves are present.
    pub fn ensure_serial_port(&self) -> Result<(), DiagError> {
        if !self.is_readable() {
            return Err(DiagError::InvalidArgument("'port' is not readable".to_string()));
        }
        if !self.is_writable() {
            return Err(DiagError::InvalidArgument("'port' is not writable".to_string()));
        }
        Ok(())
    }

    pub fn sink(&mut self) -> Result<&mut (dyn Sink + Send), DiagError> {
        match self.sink.as_deref_mut() {
            Some(sink) => Ok(sink),
            None => Err(DiagError::InvalidArgument("'port' is not writable".to_string())),
        }
    }

    /// Read whatever the transport has; the caller feeds it to a collector.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<usize, DiagError> {
        let source = self
            .source
            .as_deref_mut()
            .ok_or_else(|| DiagError::InvalidArgument("'port' is not readable".to_string()))?;
        Ok(source.read_bytes(buf)?)
    }
}

impl std::fmt::Debug for DiagPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiagPort")
            .field("readable", &self.is_readable())
            .field("writable", &self.is_writable())
            .finish()
    }
}

/// Encode and frame every command, then write them in order.
///
/// Encoding happens up front, so an encode failure writes nothing. A write
/// failure aborts the remaining commands; nothing is retried.
pub fn send_commands<S: Sink + ?Sized>(sink: &mut S, commands: &[Command]) -> Result<(), DiagError> {
    let frames = commands
        .iter()
        .map(|command| encode_command(command).map(|raw| encode_frame(&raw)))
        .collect::<Result<Vec<_>, _>>()?;

    for (command, frame) in commands.iter().zip(&frames) {
        debug!(?command, bytes = hex::encode(frame), "Write");
        sink.write_bytes(frame).map_err(DiagError::Send)?;
    }
    info!("Sent {} log config message(s)", frames.len());
    Ok(())
}
