//! Protocol constants shared by every consensus object.

/// The round at which consensus gives up on a proposer and forces a
/// deterministic empty-block proposal to guarantee liveness.
pub const DEAD_BLOCK_ROUND: u32 = 5;

/// The last round from which a NextRound message may advance; a NextRound
/// built on this round moves the validator into the dead block round.
pub const DEAD_BLOCK_ROUND_NR: u32 = DEAD_BLOCK_ROUND - 1;

/// Length of a validator account address in bytes.
pub const ADDRESS_LEN: usize = 20;

/// Length of a recoverable secp256k1 signature: r ‖ s ‖ recovery id.
pub const SECP_SIGNATURE_LEN: usize = 65;

/// Length of a compressed secp256k1 public key.
pub const SECP_PUBKEY_LEN: usize = 33;

/// Length of a compressed G2 group public key.
pub const GROUP_PUBKEY_LEN: usize = 96;

/// Length of a compressed G1 group signature point.
pub const GROUP_SIG_POINT_LEN: usize = 48;

/// Length of a group signature blob: embedded public key ‖ signature point.
/// Signature shares use the same layout with the share key embedded.
pub const GROUP_SIGNATURE_LEN: usize = GROUP_PUBKEY_LEN + GROUP_SIG_POINT_LEN;
