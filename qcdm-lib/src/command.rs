//! Log mask control commands.
//!
//! A request to enable a set of log types becomes a short sequence of
//! [`Command`]s: one `SetMask` per equipment id (the device keeps one mask per
//! equipment) and, when the debug message type is requested, two
//! `DebugSubsystem` commands, since debug messages are only reachable through
//! subsystem-level message masks.

use bytes::{BufMut, Bytes, BytesMut};
use num_enum::IntoPrimitive;
use strum_macros::Display;
use tracing::debug;

use crate::catalog::{EquipmentId, TypeCatalog, TypeId, catalog};
use crate::constants::{CMD_EXT_MSG_CONFIG, CMD_LOG_CONFIG, EXT_MSG_ALL_LEVELS, EXT_MSG_SET_RT_MASK};
use crate::error::DiagError;

/// Operation field of a DIAG_LOG_CONFIG request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive)]
#[repr(u32)]
pub enum LogConfigOp {
    Disable = 0,
    SetMask = 3,
}

/// Message subsystems (SSIDs) carrying the modem debug output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive)]
#[repr(u16)]
pub enum DebugSubsystem {
    #[strum(to_string = "LTE ML1")]
    LteMl1 = 9010,
    #[strum(to_string = "WCDMA L1")]
    WcdmaL1 = 4001,
}

impl DebugSubsystem {
    /// Order in which the subsystem commands are emitted.
    pub const ALL: [DebugSubsystem; 2] = [DebugSubsystem::LteMl1, DebugSubsystem::WcdmaL1];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Stop all logging.
    Disable,
    /// Enable `ids`; every id belongs to `equipment_id`.
    SetMask {
        equipment_id: EquipmentId,
        ids: Vec<TypeId>,
    },
    /// Enable every debug message level of one subsystem.
    DebugSubsystem {
        subsystem: DebugSubsystem,
        ids: Vec<TypeId>,
    },
}

impl Command {
    pub fn ids(&self) -> &[TypeId] {
        match self {
            Command::Disable => &[],
            Command::SetMask { ids, .. } => ids,
            Command::DebugSubsystem { ids, .. } => ids,
        }
    }
}

/// Turns type names into the command sequence that enables them.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'c> {
    catalog: &'c TypeCatalog,
}

impl Default for CommandBuilder<'static> {
    fn default() -> Self {
        Self::new(catalog())
    }
}

impl<'c> CommandBuilder<'c> {
    pub fn new(catalog: &'c TypeCatalog) -> Self {
        Self { catalog }
    }

    /// Build the commands enabling `names`.
    ///
    /// Any unresolvable name fails the whole call; no partial list is returned.
    pub fn build_enable<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Command>, DiagError> {
        let mut ids = Vec::new();
        for name in names {
            ids.extend_from_slice(self.catalog.find_ids(name.as_ref())?);
        }
        ids.sort_unstable();
        ids.dedup();

        let mut commands = Vec::new();
        if let Some(pos) = ids.iter().position(|&id| id == TypeId::MODEM_DEBUG_MESSAGE) {
            ids.remove(pos);
            commands.extend(DebugSubsystem::ALL.into_iter().map(|subsystem| Command::DebugSubsystem {
                subsystem,
                ids: ids.clone(),
            }));
        }

        // ids are sorted, so each equipment id forms one contiguous run
        commands.extend(ids.chunk_by(|a, b| a.equipment_id() == b.equipment_id()).map(|run| {
            Command::SetMask {
                equipment_id: run[0].equipment_id(),
                ids: run.to_vec(),
            }
        }));

        debug!(
            names = names.len(),
            ids = ids.len(),
            commands = commands.len(),
            "Built enable commands"
        );
        Ok(commands)
    }

    pub fn build_disable() -> Command {
        Command::Disable
    }
}

fn put_log_config_header(buf: &mut BytesMut, op: LogConfigOp) {
    buf.put_u8(CMD_LOG_CONFIG);
    buf.put_slice(&[0; 3]);
    buf.put_u32_le(op.into());
}

/// Serialize a command into the raw (unframed) request bytes.
pub fn encode_command(command: &Command) -> Result<Bytes, DiagError> {
    let mut buf = BytesMut::with_capacity(16);
    match command {
        Command::Disable => put_log_config_header(&mut buf, LogConfigOp::Disable),
        Command::SetMask { equipment_id, ids } => {
            let highest = ids
                .iter()
                .map(|id| id.item_id())
                .max()
                .ok_or_else(|| DiagError::Encode("set-mask command carries no type ids".to_string()))?;
            if let Some(stray) = ids.iter().find(|id| id.equipment_id() != *equipment_id) {
                return Err(DiagError::Encode(format!(
                    "type id {stray} does not belong to equipment {equipment_id}"
                )));
            }

            let num_items = u32::from(highest) + 1;
            let mut mask = vec![0u8; num_items.div_ceil(8) as usize];
            for id in ids {
                let item = usize::from(id.item_id());
                mask[item / 8] |= 1 << (item % 8);
            }

            put_log_config_header(&mut buf, LogConfigOp::SetMask);
            buf.put_u32_le(u32::from(*equipment_id));
            buf.put_u32_le(num_items);
            buf.put_slice(&mask);
        }
        Command::DebugSubsystem { subsystem, .. } => {
            let ssid: u16 = (*subsystem).into();
            buf.put_u8(CMD_EXT_MSG_CONFIG);
            buf.put_u8(EXT_MSG_SET_RT_MASK);
            buf.put_u16_le(ssid);
            buf.put_u16_le(ssid);
            buf.put_u16_le(0);
            buf.put_u32_le(EXT_MSG_ALL_LEVELS);
        }
    }
    Ok(buf.freeze())
}
