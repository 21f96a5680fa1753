//! Error types for the RPS3 escrow core
//!
//! Every operation failure maps to a specific named kind so callers can
//! present actionable messages; no operation ever fails with a generic
//! error. A failed operation leaves no partial state behind.

use thiserror::Error;

/// Result type alias for RPS3 operations
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Base stake below the configured minimum or not a valid multiple
    #[error("invalid stake: {0}")]
    InvalidStake(String),

    /// Move value outside the playable set (Rock, Scissor, Paper)
    #[error("invalid move")]
    InvalidMove,

    /// Free balance cannot cover the requested amount
    #[error("insufficient free balance: need {needed}, have {available}")]
    InsufficientFreeBalance { needed: u64, available: u64 },

    #[error("room {0} not found")]
    RoomNotFound(u64),

    /// Room is not open for joining (wrong state, or past expiration)
    #[error("room not joinable: {0}")]
    RoomNotJoinable(String),

    #[error("cannot join a room you created")]
    SelfJoinForbidden,

    /// Reveal attempted after the reveal deadline passed
    #[error("reveal window expired at {deadline}, now {now}")]
    RevealExpired { deadline: u64, now: u64 },

    /// Revealed (move, salt) does not reproduce the stored commitment
    #[error("commitment mismatch")]
    CommitMismatch,

    /// Cancellation attempted before the room expired
    #[error("room not expired: expires at {expires_at}, now {now}")]
    RoomNotExpired { expires_at: u64, now: u64 },

    /// Forfeit claim before the reveal deadline passed, or wrong state
    #[error("forfeit not claimable: {0}")]
    ForfeitNotClaimable(String),

    #[error("referrer already set")]
    ReferrerAlreadySet,

    #[error("self-referral forbidden")]
    SelfReferralForbidden,

    /// Caller is not the expected party for the operation
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Operation resubmitted against a room that already moved on
    #[error("invalid room state: {0}")]
    InvalidRoomState(String),

    #[error("arithmetic overflow: {0}")]
    ArithmeticOverflow(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_are_specific() {
        let err = Error::InsufficientFreeBalance {
            needed: 500,
            available: 100,
        };
        assert_eq!(
            err.to_string(),
            "insufficient free balance: need 500, have 100"
        );

        let err = Error::RevealExpired {
            deadline: 1000,
            now: 1001,
        };
        assert!(err.to_string().contains("1000"));
    }
}
