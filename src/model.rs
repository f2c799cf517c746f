//! Provider records produced by the loader.
//!
//! Numeric tuning values (system, modulation, FEC, ...) use the frontend
//! parameter encoding of the receiver's tuner API; [`frontend`] names the
//! ones that appear as defaults.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Aggregate of all accepted providers, keyed by [`Provider::key`].
pub type ProviderMap = BTreeMap<String, Provider>;

/// Frontend parameter values used as defaults.
pub mod frontend {
    pub mod satellite {
        pub const SYSTEM_DVB_S: i32 = 0;
        pub const POLARISATION_HORIZONTAL: i32 = 0;
        pub const FEC_AUTO: i32 = 0;
        pub const MODULATION_QPSK: i32 = 1;
        pub const INVERSION_UNKNOWN: i32 = 2;
        pub const ROLL_OFF_ALPHA_0_35: i32 = 0;
        pub const PILOT_UNKNOWN: i32 = 2;
    }

    pub mod cable {
        pub const FEC_AUTO: i32 = 0;
        pub const INVERSION_UNKNOWN: i32 = 2;
        pub const MODULATION_AUTO: i32 = 0;
    }

    pub mod terrestrial {
        pub const SYSTEM_DVB_T: i32 = 0;
        pub const INVERSION_UNKNOWN: i32 = 2;
        pub const MODULATION_AUTO: i32 = 3;
        pub const BANDWIDTH_8MHZ: u32 = 8_000_000;
        pub const FEC_AUTO: i32 = 5;
        pub const TRANSMISSION_MODE_AUTO: i32 = 2;
        pub const GUARD_INTERVAL_AUTO: i32 = 4;
        pub const HIERARCHY_AUTO: i32 = 4;
    }
}

/// Channel numbering scheme a provider's bouquets are built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Fastscan,
    Freesat,
    Lcn,
    Lcn2,
    Lcnbat,
    Lcnbat2,
    Nolcn,
    Sky,
    Vmuk,
    Vmuk2,
}

impl Protocol {
    pub const ALL: [Protocol; 10] = [
        Protocol::Fastscan,
        Protocol::Freesat,
        Protocol::Lcn,
        Protocol::Lcn2,
        Protocol::Lcnbat,
        Protocol::Lcnbat2,
        Protocol::Nolcn,
        Protocol::Sky,
        Protocol::Vmuk,
        Protocol::Vmuk2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Protocol::Fastscan => "fastscan",
            Protocol::Freesat => "freesat",
            Protocol::Lcn => "lcn",
            Protocol::Lcn2 => "lcn2",
            Protocol::Lcnbat => "lcnbat",
            Protocol::Lcnbat2 => "lcnbat2",
            Protocol::Nolcn => "nolcn",
            Protocol::Sky => "sky",
            Protocol::Vmuk => "vmuk",
            Protocol::Vmuk2 => "vmuk2",
        }
    }

    /// LCN-BAT variants: cable configurations must carry bouquet and region ids.
    pub fn is_lcnbat(self) -> bool {
        matches!(self, Protocol::Lcnbat | Protocol::Lcnbat2)
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known protocol tags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownProtocol(pub String);

impl fmt::Display for UnknownProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown protocol '{}'", self.0)
    }
}

impl std::error::Error for UnknownProtocol {}

impl FromStr for Protocol {
    type Err = UnknownProtocol;

    /// Exact, case-sensitive match against the known tags.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Protocol::ALL
            .into_iter()
            .find(|protocol| protocol.as_str() == s)
            .ok_or_else(|| UnknownProtocol(s.to_string()))
    }
}

/// PIDs and table ids of the DVB signalling tables scanned for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableIds {
    pub nit_pid: u16,
    pub nit_current_table_id: u8,
    pub nit_other_table_id: u8,
    pub sdt_pid: u16,
    pub sdt_current_table_id: u8,
    pub sdt_other_table_id: u8,
    pub bat_pid: u16,
    pub bat_table_id: u8,
}

impl Default for TableIds {
    fn default() -> Self {
        Self {
            nit_pid: 0x10,
            nit_current_table_id: 0x40,
            nit_other_table_id: 0x41,
            sdt_pid: 0x11,
            sdt_current_table_id: 0x42,
            sdt_other_table_id: 0x46,
            bat_pid: 0x11,
            bat_table_id: 0x4a,
        }
    }
}

impl TableIds {
    /// Terrestrial providers do not scan NIT-other by default.
    pub fn terrestrial() -> Self {
        Self {
            nit_other_table_id: 0x00,
            ..Self::default()
        }
    }
}

/// Home transponder of a satellite provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteTransponder {
    pub tables: TableIds,
    /// 0 when the provider has no FastScan service.
    pub fastscan_pid: u16,
    pub fastscan_table_id: u8,
    pub frequency: u32,
    pub symbol_rate: u32,
    pub polarization: i32,
    pub fec_inner: i32,
    pub orbital_position: i32,
    pub inversion: i32,
    pub system: i32,
    pub modulation: i32,
    pub roll_off: i32,
    pub pilot: i32,
    pub onid: Option<u32>,
    pub tsid: Option<u32>,
}

/// Tuning descriptor for a provider, by delivery system.
///
/// Cable and terrestrial providers only carry the table ids here; their
/// tuning parameters live on each [`BouquetConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery", rename_all = "lowercase")]
pub enum Transponder {
    Satellite(SatelliteTransponder),
    Cable(TableIds),
    Terrestrial(TableIds),
}

impl Transponder {
    pub fn tables(&self) -> &TableIds {
        match self {
            Transponder::Satellite(transponder) => &transponder.tables,
            Transponder::Cable(tables) | Transponder::Terrestrial(tables) => tables,
        }
    }

    pub fn delivery_system(&self) -> &'static str {
        match self {
            Transponder::Satellite(_) => "DVB-S",
            Transponder::Cable(_) => "DVB-C",
            Transponder::Terrestrial(_) => "DVB-T",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SatelliteBouquet {
    pub key: String,
    pub name: String,
    pub bouquet: u32,
    pub region: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CableBouquet {
    pub key: String,
    pub name: String,
    pub netid: u32,
    pub bouquettype: String,
    pub frequency: u32,
    pub symbol_rate: u32,
    pub fec_inner: i32,
    pub inversion: i32,
    pub system: i32,
    pub modulation: i32,
    pub onid: Option<u32>,
    pub tsid: Option<u32>,
    /// Only present for LCN-BAT protocols.
    pub bouquet: Option<u32>,
    pub region: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrestrialBouquet {
    pub key: String,
    pub name: String,
    pub frequency: u32,
    pub system: i32,
    pub inversion: i32,
    pub modulation: i32,
    pub bandwidth: u32,
    pub code_rate_hp: i32,
    pub code_rate_lp: i32,
    pub transmission_mode: i32,
    pub guard_interval: i32,
    pub hierarchy: i32,
    pub onid: Option<u32>,
    pub tsid: Option<u32>,
}

/// One selectable configuration inside a provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "delivery", rename_all = "lowercase")]
pub enum BouquetConfig {
    Satellite(SatelliteBouquet),
    Cable(CableBouquet),
    Terrestrial(TerrestrialBouquet),
}

impl BouquetConfig {
    pub fn key(&self) -> &str {
        match self {
            BouquetConfig::Satellite(config) => &config.key,
            BouquetConfig::Cable(config) => &config.key,
            BouquetConfig::Terrestrial(config) => &config.key,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            BouquetConfig::Satellite(config) => &config.name,
            BouquetConfig::Cable(config) => &config.name,
            BouquetConfig::Terrestrial(config) => &config.name,
        }
    }
}

/// Swap the channel at `number` with the one at `with`, optionally only
/// when `conditional` evaluates true downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapChannel {
    pub number: i32,
    pub with: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<String>,
}

/// A fully validated provider definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    pub key: String,
    pub name: String,
    pub streamtype: String,
    pub protocol: Protocol,
    pub bouquettype: Option<String>,
    pub netid: Option<String>,
    pub transponder: Transponder,
    pub bouquets: BTreeMap<String, BouquetConfig>,
    pub sections: BTreeMap<i32, String>,
    pub servicehacks: String,
    pub swapchannels: Vec<SwapChannel>,
    pub dependent: String,
    pub ignore_visible_service_flag: bool,
}
