//! Structured event records
//!
//! Every state transition emits an immutable event. The sequenced log is
//! the durable source of game history - there is no separate history
//! table; history views are projections over these records. Events also
//! fan out over an unbounded channel for live observers (UI feeds).

use serde::{Deserialize, Serialize};

use crate::protocol::{AccountId, Move, RoomId, Tier, Tokens};

/// A protocol event, mirrored after the settlement-ledger event surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    RoomCreated {
        room_id: RoomId,
        player_a: AccountId,
        tier: Tier,
        base_stake: Tokens,
        /// Highest-multiplier stake the hidden move could require
        max_stake: Tokens,
    },
    PlayerJoined {
        room_id: RoomId,
        player_b: AccountId,
        mv: Move,
        stake: Tokens,
    },
    GameRevealed {
        room_id: RoomId,
        player_a: AccountId,
        player_b: AccountId,
        player_a_move: Move,
        player_b_move: Move,
        /// `None` for a draw
        winner: Option<AccountId>,
        winnings: Tokens,
    },
    GameForfeited {
        room_id: RoomId,
        player_a: AccountId,
        /// `None` when an unjoined room expired
        player_b: Option<AccountId>,
        compensation: Tokens,
        penalty: Tokens,
    },
    BalanceDeposited {
        player: AccountId,
        amount: Tokens,
    },
    BalanceWithdrawn {
        player: AccountId,
        amount: Tokens,
    },
    ReferrerSet {
        player: AccountId,
        referrer: AccountId,
    },
    ReferralFeeDistributed {
        room_id: RoomId,
        referrer: AccountId,
        amount: Tokens,
    },
    PlatformFeeCollected {
        room_id: RoomId,
        amount: Tokens,
    },
}

impl GameEvent {
    /// Room this event belongs to, if any
    pub fn room_id(&self) -> Option<RoomId> {
        match self {
            GameEvent::RoomCreated { room_id, .. }
            | GameEvent::PlayerJoined { room_id, .. }
            | GameEvent::GameRevealed { room_id, .. }
            | GameEvent::GameForfeited { room_id, .. }
            | GameEvent::ReferralFeeDistributed { room_id, .. }
            | GameEvent::PlatformFeeCollected { room_id, .. } => Some(*room_id),
            GameEvent::BalanceDeposited { .. }
            | GameEvent::BalanceWithdrawn { .. }
            | GameEvent::ReferrerSet { .. } => None,
        }
    }

    /// Accounts this event directly concerns (for per-player history)
    pub fn participants(&self) -> Vec<AccountId> {
        match self {
            GameEvent::RoomCreated { player_a, .. } => vec![*player_a],
            GameEvent::PlayerJoined { player_b, .. } => vec![*player_b],
            // both parties took part in the round, not just the winner
            GameEvent::GameRevealed {
                player_a, player_b, ..
            } => vec![*player_a, *player_b],
            GameEvent::GameForfeited {
                player_a, player_b, ..
            } => {
                let mut out = vec![*player_a];
                out.extend(player_b.iter().copied());
                out
            }
            GameEvent::BalanceDeposited { player, .. }
            | GameEvent::BalanceWithdrawn { player, .. } => vec![*player],
            GameEvent::ReferrerSet {
                player, referrer, ..
            } => vec![*player, *referrer],
            GameEvent::ReferralFeeDistributed { referrer, .. } => vec![*referrer],
            GameEvent::PlatformFeeCollected { .. } => vec![],
        }
    }
}

/// An event with its position in the log and emission time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, gap-free
    pub seq: u64,
    /// Unix timestamp at emission
    pub timestamp: u64,
    pub event: GameEvent,
}
