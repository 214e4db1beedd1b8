//! Miner identity types.
//!
//! A miner is identified by the triple `(coldkey, hotkey, uid)`: the uid is
//! its slot in the ledger registration table, the hotkey is the key serving
//! requests from that slot, and the coldkey is the owning wallet. The uid is
//! stable across re-registrations; the hotkey behind it is not.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ledger slot index of a registered miner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MinerUid(u16);

impl MinerUid {
    pub fn new(uid: u16) -> Self {
        Self(uid)
    }

    pub fn as_u16(&self) -> u16 {
        self.0
    }
}

impl fmt::Display for MinerUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SS58-encoded hotkey serving a miner slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hotkey(String);

impl Hotkey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Hotkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// SS58-encoded coldkey owning one or more hotkeys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coldkey(String);

impl Coldkey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Coldkey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
