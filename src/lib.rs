//! RPS3 - a commit-reveal rock-scissor-paper escrow core
//!
//! Two players stake tokens on a single round of rock-scissor-paper. The
//! creating player commits to a hidden move, an opponent joins with a
//! cleartext move, and the creator must reveal before a deadline or forfeit
//! their safety deposit. Every token movement funnels through a free/locked
//! balance ledger so escrowed funds can never be stuck or double-spent.
//!
//! Module map:
//! - protocol: core value types, the commitment scheme, stake arithmetic,
//!   and the round rules
//! - ledger: free/locked balance accounting and atomic settlement
//! - referral: one-time referrer registry consulted during fee splits
//! - game: the room state machine and public operation surface
//! - config: protocol configuration (fees, windows, minimums)
//! - error: the protocol error taxonomy

pub mod config;
pub mod error;
pub mod game;
pub mod ledger;
pub mod protocol;
pub mod referral;

// Re-export commonly used types for easy access
pub use config::{FeeConfig, ProtocolConfig, TimingConfig};
pub use error::{Error, Result};
pub use game::{
    Clock, EventRecord, GameEvent, GameService, ManualClock, SystemClock,
};
pub use ledger::{BalanceLedger, PlayerBalance};
pub use protocol::{
    calculate_stake, commit_move, AccountId, Hash256, Move, Room, RoomId,
    RoomState, Salt, Tier, TierMultipliers, Tokens,
};
pub use referral::ReferralRegistry;
