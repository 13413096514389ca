//! Composite storage keys for persisted round states.
//!
//! The storage engine itself lives outside this crate; these codecs fix the
//! byte layout of the keys it indexes round states under, and the
//! round-state relation utilities accept the historic key directly so sync
//! code can order persisted entries without decoding their values.

use granite_types::constants::{ADDRESS_LEN, GROUP_PUBKEY_LEN};
use granite_types::{ConsensusError, Result};

use crate::relation::HasHeightRound;

const PREFIX_LEN: usize = 2;
const HISTORIC_KEY_LEN: usize = PREFIX_LEN + 4 + 4 + ADDRESS_LEN;
const CURRENT_KEY_LEN: usize = PREFIX_LEN + GROUP_PUBKEY_LEN + ADDRESS_LEN;

/// Key for a round state archived at a specific (height, round):
/// `prefix ‖ height ‖ round ‖ vaddr`, big-endian integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStateHistoricKey {
    /// Table prefix supplied by the storage layer.
    pub prefix: [u8; PREFIX_LEN],
    /// Block height.
    pub height: u32,
    /// Round within the height.
    pub round: u32,
    /// Validator account address.
    pub vaddr: Vec<u8>,
}

impl RoundStateHistoricKey {
    /// Encode the key. Fails `Invalid` on malformed components; a key that
    /// cannot encode must never reach storage.
    pub fn marshal_binary(&self) -> Result<Vec<u8>> {
        if self.height == 0 {
            return Err(ConsensusError::invalid("historic key: height is zero"));
        }
        if self.vaddr.len() != ADDRESS_LEN {
            return Err(ConsensusError::invalid("historic key: bad address length"));
        }
        let mut out = Vec::with_capacity(HISTORIC_KEY_LEN);
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.height.to_be_bytes());
        out.extend_from_slice(&self.round.to_be_bytes());
        out.extend_from_slice(&self.vaddr);
        Ok(out)
    }

    /// Decode a persisted key. Fails `Corrupt` on any structural damage;
    /// the enclosing storage transaction should abort.
    pub fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        if data.len() != HISTORIC_KEY_LEN {
            return Err(ConsensusError::corrupt("historic key: bad length"));
        }
        let prefix = [data[0], data[1]];
        let height = u32::from_be_bytes([data[2], data[3], data[4], data[5]]);
        let round = u32::from_be_bytes([data[6], data[7], data[8], data[9]]);
        if height == 0 {
            return Err(ConsensusError::corrupt("historic key: height is zero"));
        }
        Ok(RoundStateHistoricKey {
            prefix,
            height,
            round,
            vaddr: data[10..].to_vec(),
        })
    }

    /// Prefix covering every validator's entries at this key's height, for
    /// range scans. Big-endian encoding makes the scan order match height
    /// order.
    pub fn make_iter_key(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(PREFIX_LEN + 4);
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.height.to_be_bytes());
        out
    }
}

impl HasHeightRound for RoundStateHistoricKey {
    fn height_round(&self) -> (u32, u32) {
        (self.height, self.round)
    }
}

/// Key for a validator's live round state in the current group:
/// `prefix ‖ group_key ‖ vaddr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundStateCurrentKey {
    /// Table prefix supplied by the storage layer.
    pub prefix: [u8; PREFIX_LEN],
    /// The group public key the validator currently serves under.
    pub group_key: Vec<u8>,
    /// Validator account address.
    pub vaddr: Vec<u8>,
}

impl RoundStateCurrentKey {
    /// Encode the key; fails `Invalid` on malformed components.
    pub fn marshal_binary(&self) -> Result<Vec<u8>> {
        if self.group_key.len() != GROUP_PUBKEY_LEN {
            return Err(ConsensusError::invalid("current key: bad group key length"));
        }
        if self.vaddr.len() != ADDRESS_LEN {
            return Err(ConsensusError::invalid("current key: bad address length"));
        }
        let mut out = Vec::with_capacity(CURRENT_KEY_LEN);
        out.extend_from_slice(&self.prefix);
        out.extend_from_slice(&self.group_key);
        out.extend_from_slice(&self.vaddr);
        Ok(out)
    }

    /// Decode a persisted key; fails `Corrupt` on structural damage.
    pub fn unmarshal_binary(data: &[u8]) -> Result<Self> {
        if data.len() != CURRENT_KEY_LEN {
            return Err(ConsensusError::corrupt("current key: bad length"));
        }
        Ok(RoundStateCurrentKey {
            prefix: [data[0], data[1]],
            group_key: data[PREFIX_LEN..PREFIX_LEN + GROUP_PUBKEY_LEN].to_vec(),
            vaddr: data[PREFIX_LEN + GROUP_PUBKEY_LEN..].to_vec(),
        })
    }
}
