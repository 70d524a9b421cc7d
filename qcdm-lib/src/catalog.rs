//! Log packet type names and their numeric DIAG log codes.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::LazyLock;

use modular_bitfield::prelude::*;
use serde::Serialize;

use crate::constants::MODEM_DEBUG_MESSAGE;
use crate::error::DiagError;

/// Version of the protocol engine, exposed for caller-side validation.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Grouping field of a log code; all ids in one mask command share it.
pub type EquipmentId = u8;

/// Bit layout of a 16-bit log code.
#[bitfield(bytes = 2)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LogCode {
    pub item: B12,
    pub equipment: B4,
}

/// Numeric identifier of a log message class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TypeId(pub u16);

impl TypeId {
    pub const MODEM_DEBUG_MESSAGE: TypeId = TypeId(MODEM_DEBUG_MESSAGE);

    fn log_code(self) -> LogCode {
        LogCode::from_bytes(self.0.to_le_bytes())
    }

    pub fn equipment_id(self) -> EquipmentId {
        self.log_code().equipment()
    }

    /// Position of this id inside its equipment's mask.
    pub fn item_id(self) -> u16 {
        self.log_code().item()
    }
}

impl From<u16> for TypeId {
    fn from(value: u16) -> Self {
        TypeId(value)
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06X}", self.0)
    }
}

// A name listed more than once forms a group resolving to every listed id.
#[rustfmt::skip]
const LOG_PACKET_TYPES: &[(&str, u16)] = &[
    ("CDMA_Paging_Channel_Message",                 0x1007),
    ("Modem_debug_message",                         0x1FEB),
    ("WCDMA_Search_Cell_Reselection_Rank",          0x4005),
    ("WCDMA_RRC_States",                            0x4125),
    ("WCDMA_CELL_ID",                               0x4127),
    ("WCDMA_Signaling_Messages",                    0x412F),
    ("GSM_RR_Signaling_Message",                    0x512F),
    ("GSM_RR_Cell_Information",                     0x5134),
    ("UMTS_NAS_GMM_State",                          0x7130),
    ("UMTS_NAS_MM_State",                           0x7131),
    ("UMTS_NAS_MM_REG_State",                       0x7135),
    ("UMTS_NAS_OTA_Packet",                         0x713A),
    ("LTE_MAC_Configuration",                       0xB060),
    ("LTE_MAC_Rach_Trigger",                        0xB061),
    ("LTE_MAC_Rach_Attempt",                        0xB062),
    ("LTE_MAC_UL_Transport_Block",                  0xB063),
    ("LTE_MAC_DL_Transport_Block",                  0xB064),
    ("LTE_MAC_UL_Buffer_Status_Internal",           0xB066),
    ("LTE_MAC_UL_Tx_Statistics",                    0xB067),
    ("LTE_RLC_DL_Config_Log_Packet",                0xB081),
    ("LTE_RLC_DL_AM_All_PDU",                       0xB082),
    ("LTE_RLC_UL_Config_Log_Packet",                0xB091),
    ("LTE_RLC_UL_AM_All_PDU",                       0xB092),
    ("LTE_PDCP_DL_Config",                          0xB0A0),
    ("LTE_PDCP_DL_Stats",                           0xB0A4),
    ("LTE_PDCP_UL_Config",                          0xB0B0),
    ("LTE_PDCP_UL_Stats",                           0xB0B4),
    ("LTE_RRC_OTA_Packet",                          0xB0C0),
    ("LTE_RRC_MIB_Message_Log_Packet",              0xB0C1),
    ("LTE_RRC_Serv_Cell_Info",                      0xB0C2),
    ("LTE_NAS_ESM_OTA_Incoming_Packet",             0xB0E2),
    ("LTE_NAS_ESM_OTA_Outgoing_Packet",             0xB0E3),
    ("LTE_NAS_ESM_State",                           0xB0E5),
    ("LTE_NAS_EMM_OTA_Incoming_Packet",             0xB0EC),
    ("LTE_NAS_EMM_OTA_Outgoing_Packet",             0xB0ED),
    ("LTE_NAS_EMM_State",                           0xB0EE),
    ("LTE_PHY_PUSCH_Tx_Report",                     0xB139),
    ("LTE_PHY_PUCCH_Tx_Report",                     0xB13C),
    ("LTE_PHY_PUSCH_CSF",                           0xB14E),
    ("LTE_PHY_PDSCH_Packet",                        0xB173),
    ("LTE_PHY_Connected_Mode_Intra_Freq_Meas",      0xB179),
    ("LTE_PHY_Idle_Neighbor_Cell_Meas",             0xB192),
    ("LTE_PHY_Serv_Cell_Measurement",               0xB193),
    ("LTE_PHY_Connected_Mode_Neighbor_Measurement", 0xB195),
    // groups
    ("LTE_NAS_OTA_Packet",                          0xB0E2),
    ("LTE_NAS_OTA_Packet",                          0xB0E3),
    ("LTE_NAS_OTA_Packet",                          0xB0EC),
    ("LTE_NAS_OTA_Packet",                          0xB0ED),
    ("LTE_MAC_Rach",                                0xB061),
    ("LTE_MAC_Rach",                                0xB062),
];

/// Read-only mapping between type names and type ids.
#[derive(Debug, Clone)]
pub struct TypeCatalog {
    entries: Vec<(&'static str, TypeId)>,
    by_name: HashMap<&'static str, Vec<TypeId>>,
}

impl TypeCatalog {
    pub fn new(entries: &[(&'static str, u16)]) -> Self {
        let mut by_name: HashMap<&'static str, Vec<TypeId>> = HashMap::new();
        for &(name, id) in entries {
            by_name.entry(name).or_default().push(TypeId(id));
        }
        Self {
            entries: entries.iter().map(|&(name, id)| (name, TypeId(id))).collect(),
            by_name,
        }
    }

    /// Resolve a name to every id registered under it.
    pub fn find_ids(&self, name: &str) -> Result<&[TypeId], DiagError> {
        self.by_name
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| DiagError::UnknownTypeName(name.to_string()))
    }

    /// First name listed for an id.
    pub fn name_of(&self, id: TypeId) -> Option<&'static str> {
        self.entries
            .iter()
            .find(|(_, entry_id)| *entry_id == id)
            .map(|(name, _)| *name)
    }

    /// Distinct names in table order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|(name, _)| *name)
            .filter(move |name| seen.insert(*name))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TypeCatalog {
    fn default() -> Self {
        Self::new(LOG_PACKET_TYPES)
    }
}

static CATALOG: LazyLock<TypeCatalog> = LazyLock::new(TypeCatalog::default);

/// The process-wide catalog, built on first use.
pub fn catalog() -> &'static TypeCatalog {
    &CATALOG
}

/// All recognized type names, e.g. for autocompletion.
pub fn log_packet_types() -> Vec<&'static str> {
    catalog().names().collect()
}
