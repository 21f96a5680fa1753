//! Stake sizing from tier multiplier tables
//!
//! Each tier weights the three moves so the statistically safer pick costs
//! more to play: rock > scissor > paper, with paper at parity with the base
//! stake. Tables are protocol constants; the configurable knobs (fees,
//! penalty percentage) live in `crate::config`.

use serde::{Deserialize, Serialize};

use super::{Move, Tier, Tokens};
use crate::error::Result;

/// Per-tier multiplier table, rock:scissor:paper
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierMultipliers {
    pub rock: u64,
    pub scissor: u64,
    pub paper: u64,
}

impl TierMultipliers {
    /// The fixed multiplier table for a tier
    pub const fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Casual => Self { rock: 5, scissor: 2, paper: 1 },
            Tier::Standard => Self { rock: 10, scissor: 5, paper: 1 },
            Tier::Degen => Self { rock: 100, scissor: 20, paper: 1 },
        }
    }

    pub const fn for_move(&self, mv: Move) -> u64 {
        match mv {
            Move::Rock => self.rock,
            Move::Scissor => self.scissor,
            Move::Paper => self.paper,
        }
    }
}

/// Required stake for playing `mv` at `tier` with the given base stake
pub fn calculate_stake(base_stake: Tokens, mv: Move, tier: Tier) -> Result<Tokens> {
    base_stake.checked_mul(TierMultipliers::for_tier(tier).for_move(mv))
}

/// Maximum possible stake for a tier (the rock multiplier)
pub fn max_stake(base_stake: Tokens, tier: Tier) -> Result<Tokens> {
    calculate_stake(base_stake, Move::Rock, tier)
}

/// Collateral penalty: a configured percentage of the maximum stake
pub fn collateral_penalty(
    base_stake: Tokens,
    tier: Tier,
    penalty_percent: u8,
) -> Result<Tokens> {
    Ok(max_stake(base_stake, tier)?.percent(penalty_percent))
}

/// Amount locked from the creator before their move is known: the
/// maximum possible stake plus the collateral penalty
pub fn safety_deposit(base_stake: Tokens, tier: Tier, penalty: Tokens) -> Result<Tokens> {
    max_stake(base_stake, tier)?.checked_add(penalty)
}
