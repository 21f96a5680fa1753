//! Core protocol types for the RPS3 escrow game
//!
//! Value types shared by every component: account and room identifiers,
//! the checked token amount newtype, the move/tier/state enumerations, and
//! the central `Room` record. Nothing in this module mutates balances; all
//! value movement goes through the ledger.

pub mod commitment;
pub mod rules;
pub mod stakes;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub use commitment::{commit_move, generate_salt, verify_commitment, Salt};
pub use rules::RoundOutcome;
pub use stakes::{calculate_stake, collateral_penalty, safety_deposit, TierMultipliers};

/// Account identifier - 32 bytes, supplied by the out-of-scope wallet layer
pub type AccountId = [u8; 32];

/// Room identifier - monotonically increasing, assigned at creation
pub type RoomId = u64;

/// 32-byte hash value (move commitments)
pub type Hash256 = [u8; 32];

/// Decimal places of the settlement token
pub const TOKEN_DECIMALS: u32 = 6;

/// Smallest representable amount of one whole token
pub const TOKEN_UNIT: u64 = 10u64.pow(TOKEN_DECIMALS);

/// Base stakes must be multiples of 0.1 token
pub const STAKE_UNIT: u64 = TOKEN_UNIT / 10;

/// Size of a commitment salt in bytes (256 bits of entropy)
pub const SALT_SIZE: usize = 32;

/// Token amount in the smallest unit of the settlement token
///
/// All arithmetic is checked; there is no wrapping path from safe code.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
pub struct Tokens(u64);

impl Tokens {
    pub const ZERO: Tokens = Tokens(0);

    pub const fn new(amount: u64) -> Self {
        Self(amount)
    }

    pub const fn amount(&self) -> u64 {
        self.0
    }

    /// Whole tokens, e.g. `Tokens::whole(10)` is 10.000000
    ///
    /// Saturates at `u64::MAX` rather than wrapping; a saturated amount
    /// fails the first checked operation it meets instead of minting a
    /// silently wrong balance.
    pub const fn whole(tokens: u64) -> Self {
        Self(tokens.saturating_mul(TOKEN_UNIT))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Tokens) -> crate::error::Result<Tokens> {
        self.0
            .checked_add(other.0)
            .map(Tokens)
            .ok_or_else(|| Error::ArithmeticOverflow("token addition".into()))
    }

    pub fn checked_sub(self, other: Tokens) -> crate::error::Result<Tokens> {
        self.0
            .checked_sub(other.0)
            .map(Tokens)
            .ok_or_else(|| Error::ArithmeticOverflow("token subtraction".into()))
    }

    pub fn checked_mul(self, factor: u64) -> crate::error::Result<Tokens> {
        self.0
            .checked_mul(factor)
            .map(Tokens)
            .ok_or_else(|| Error::ArithmeticOverflow("token multiplication".into()))
    }

    /// Integer percentage cut, floored. `percent` is 0..=100.
    pub fn percent(self, percent: u8) -> Tokens {
        debug_assert!(percent <= 100);
        Tokens(self.0 / 100 * u64::from(percent) + self.0 % 100 * u64::from(percent) / 100)
    }
}

impl From<u64> for Tokens {
    fn from(amount: u64) -> Self {
        Tokens(amount)
    }
}

impl fmt::Display for Tokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:06}",
            self.0 / TOKEN_UNIT,
            self.0 % TOKEN_UNIT
        )
    }
}

/// A playable move
///
/// Wire encoding reserves 0 for "no move"; the enum deliberately has no
/// such member, so a raw 0 is rejected at the boundary with `InvalidMove`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Move {
    Rock = 1,
    Scissor = 2,
    Paper = 3,
}

impl Move {
    pub const ALL: [Move; 3] = [Move::Rock, Move::Scissor, Move::Paper];

    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for Move {
    type Error = Error;

    fn try_from(value: u8) -> crate::error::Result<Self> {
        match value {
            1 => Ok(Move::Rock),
            2 => Ok(Move::Scissor),
            3 => Ok(Move::Paper),
            _ => Err(Error::InvalidMove),
        }
    }
}

/// Risk/reward profile determining the stake multiplier table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tier {
    Casual = 0,
    Standard = 1,
    Degen = 2,
}

impl Tier {
    pub const ALL: [Tier; 3] = [Tier::Casual, Tier::Standard, Tier::Degen];
}

/// Room lifecycle state
///
/// Transitions are one-directional: `WaitingForPlayerB -> WaitingForReveal
/// -> Completed | Forfeited`, with a direct `WaitingForPlayerB -> Forfeited`
/// exit when an unjoined room expires. `Completed` and `Forfeited` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RoomState {
    WaitingForPlayerB = 1,
    WaitingForReveal = 2,
    Completed = 3,
    Forfeited = 4,
}

impl RoomState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RoomState::Completed | RoomState::Forfeited)
    }
}

/// A single game room from creation through resolution
///
/// Immutable once terminal, except for being queryable forever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: RoomId,
    pub player_a: AccountId,
    /// Set exactly once, when an opponent joins
    pub player_b: Option<AccountId>,
    pub tier: Tier,
    /// Player-chosen unit amount from which per-move stakes derive
    pub base_stake: Tokens,
    /// Known only at reveal time; until then the safety deposit covers the
    /// highest-multiplier move
    pub player_a_stake: Option<Tokens>,
    pub player_b_stake: Option<Tokens>,
    /// Hash binding player A's move and salt; never reveals the move
    pub player_a_commit: Hash256,
    /// Stored at reveal for audit/history
    pub player_a_move: Option<Move>,
    pub player_b_move: Option<Move>,
    /// Set when player B joins; player A forfeits past this point
    pub reveal_deadline: Option<u64>,
    /// An unjoined room may be cancelled once this passes
    pub expiration_time: u64,
    /// Extra amount locked from player A, forfeited to B on non-reveal
    pub collateral_penalty: Tokens,
    pub state: RoomState,
}

impl Room {
    /// Total locked from player A at creation: the maximum possible stake
    /// plus the collateral penalty
    pub fn safety_deposit(&self) -> crate::error::Result<Tokens> {
        stakes::safety_deposit(self.base_stake, self.tier, self.collateral_penalty)
    }
}
