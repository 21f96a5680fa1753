//! Commit-reveal scheme binding a hidden move to a public hash
//!
//! The committing player publishes `commit_move(move, salt)` at room
//! creation and discloses `(move, salt)` at reveal. The hash input is a
//! domain tag, a fixed-width 32-byte big-endian move field, then the raw
//! salt bytes, so no two distinct `(move, salt)` pairs can produce the
//! same input bytes.
//!
//! The salt never reaches this crate before reveal; clients generate it
//! with `generate_salt` and must retain it until reveal. A lost salt means
//! forfeiture - there is no recovery path.

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::{Hash256, Move, SALT_SIZE};

/// Domain separation tag for move commitments
const MOVE_COMMIT_DOMAIN: &[u8] = b"RPS3_MOVE_COMMIT";

/// Commitment salt, zeroized when dropped
///
/// 256 bits from the OS CSPRNG. Held by the client between commit and
/// reveal; the core only ever sees it inside `reveal_move`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Salt([u8; SALT_SIZE]);

impl Salt {
    pub fn from_bytes(bytes: [u8; SALT_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Salt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Never log salt material
        f.write_str("Salt(..)")
    }
}

/// Generate a fresh commitment salt from the OS CSPRNG
pub fn generate_salt() -> Salt {
    let mut bytes = [0u8; SALT_SIZE];
    getrandom::getrandom(&mut bytes).expect("OS randomness unavailable");
    Salt(bytes)
}

/// Compute the commitment hash for a move and salt
///
/// Accepts arbitrary-length salts; the 32-byte `Salt` is what clients
/// produce, but verification only requires byte equality of the inputs.
pub fn commit_move(mv: Move, salt: &[u8]) -> Hash256 {
    let mut hasher = Sha256::new();
    hasher.update(MOVE_COMMIT_DOMAIN);
    // Fixed-width move field: 31 zero bytes then the move value
    let mut move_field = [0u8; 32];
    move_field[31] = mv.as_u8();
    hasher.update(move_field);
    hasher.update(salt);
    hasher.finalize().into()
}

/// Check a revealed `(move, salt)` pair against a stored commitment
pub fn verify_commitment(commitment: &Hash256, mv: Move, salt: &[u8]) -> bool {
    commit_move(mv, salt) == *commitment
}
