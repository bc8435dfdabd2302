//! Core type definitions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;

/// Account ID (32-bit unsigned, assigned by the login server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AccountId(pub u32);

impl AccountId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for AccountId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Character ID (32-bit unsigned, assigned by the char server)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CharId(pub u32);

impl CharId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl From<u32> for CharId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Server family the client talks to
///
/// Chosen once from configuration; every handler picks its opcode set and
/// field layouts from this at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    /// Legacy TmwAthena servers
    TmwAthena,
    /// eAthena / Hercules style servers with the extended packet set
    EAthena,
}

impl Dialect {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tmwa" | "tmwathena" => Some(Self::TmwAthena),
            "eathena" | "evol" | "hercules" => Some(Self::EAthena),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TmwAthena => "tmwa",
            Self::EAthena => "eathena",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which server a connection targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServerRole {
    Login,
    Char,
    Map,
}

impl ServerRole {
    pub const ALL: [ServerRole; 3] = [ServerRole::Login, ServerRole::Char, ServerRole::Map];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::Char => "char",
            Self::Map => "map",
        }
    }
}

impl fmt::Display for ServerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Character gender as sent by the servers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Gender {
    Female,
    Male,
    #[default]
    Unspecified,
}

impl Gender {
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Female,
            1 => Self::Male,
            _ => Self::Unspecified,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
            Self::Unspecified => 3,
        }
    }
}

/// Resolved address of one server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Display name (char servers) or map name (map servers)
    pub name: String,
    pub host: String,
    pub port: u16,
    /// Online user count advertised by the login server
    pub online_users: u16,
}

impl ServerInfo {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            name: String::new(),
            host: host.into(),
            port,
            online_users: 0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Build from a wire IPv4 address (bytes in dotted order)
    pub fn from_wire(ip: [u8; 4], port: u16) -> Self {
        Self::new(Ipv4Addr::from(ip).to_string(), port)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether the advertised host only makes sense on the server's own machine
    pub fn is_local_only(&self) -> bool {
        matches!(self.host.parse::<Ipv4Addr>(), Ok(ip) if ip.is_loopback() || ip.is_unspecified())
    }
}

/// Credentials carried from login through char select to map authentication
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionToken {
    pub account_id: AccountId,
    pub session_id1: u32,
    pub session_id2: u32,
    pub sex: Gender,
    pub last_login: String,
    /// Filled in once the char server assigns a map server
    pub char_id: CharId,
}

/// Protocol capabilities that gate optional layouts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ServerFeatures {
    /// Items carry a color byte (TmwAthena derived servers)
    pub item_colors: bool,
    /// Vending packets are understood (eAthena servers)
    pub vending: bool,
}
