//! Balance ledger - the sole writer of player balances
//!
//! Every account carries a free balance (usable/withdrawable) and a locked
//! balance (escrowed in open rooms). The room state machine never touches
//! balances directly; it always goes through `lock` and `settle`, keeping a
//! single chokepoint for the conservation-of-value invariant.
//!
//! `settle` is the only multi-party transfer: it moves named amounts out of
//! locked balances and into (possibly different players') free balances,
//! and requires the two sides to balance exactly except for the declared
//! fee contributions. Fees are split between each paying player's referrer
//! (if any) and the platform fee recipient. Validation happens before any
//! mutation, so a failed settlement changes nothing.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::FeeConfig;
use crate::error::{Error, Result};
use crate::protocol::{AccountId, Tokens};
use crate::referral::ReferralRegistry;

/// Per-account balance pair. Both sides are non-negative by construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerBalance {
    pub free: Tokens,
    pub locked: Tokens,
}

/// One player's fee carved out of a settlement
#[derive(Debug, Clone, Copy)]
pub struct FeeContribution {
    pub payer: AccountId,
    pub amount: Tokens,
}

/// A multi-party settlement: locked debits, free credits, and fees.
/// Conservation: sum(debits) == sum(credits) + sum(fees).
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    pub debits: Vec<(AccountId, Tokens)>,
    pub credits: Vec<(AccountId, Tokens)>,
    pub fees: Vec<FeeContribution>,
}

/// Where the fee value actually went, for event emission
#[derive(Debug, Clone, Default)]
pub struct SettlementReceipt {
    /// (paying player, their referrer, referral cut)
    pub referral_payouts: Vec<(AccountId, AccountId, Tokens)>,
    /// Total credited to the platform fee recipient
    pub platform_fee: Tokens,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BalanceLedger {
    accounts: HashMap<AccountId, PlayerBalance>,
}

impl BalanceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance snapshot; unknown accounts read as zero
    pub fn balance(&self, player: &AccountId) -> PlayerBalance {
        self.accounts.get(player).copied().unwrap_or_default()
    }

    /// Sum of all locked balances, for invariant checks
    pub fn total_locked(&self) -> Tokens {
        self.accounts
            .values()
            .fold(Tokens::ZERO, |acc, b| {
                Tokens::new(acc.amount().saturating_add(b.locked.amount()))
            })
    }

    /// Credit an external deposit to the player's free balance
    pub fn deposit(&mut self, player: AccountId, amount: Tokens) -> Result<()> {
        let entry = self.accounts.entry(player).or_default();
        entry.free = entry.free.checked_add(amount)?;
        debug!(player = %hex::encode(player), %amount, "deposit");
        Ok(())
    }

    /// Debit a withdrawal from the player's free balance
    pub fn withdraw(&mut self, player: AccountId, amount: Tokens) -> Result<()> {
        let balance = self.balance(&player);
        if amount > balance.free {
            return Err(Error::InsufficientFreeBalance {
                needed: amount.amount(),
                available: balance.free.amount(),
            });
        }
        let entry = self.accounts.entry(player).or_default();
        entry.free = entry.free.checked_sub(amount)?;
        debug!(player = %hex::encode(player), %amount, "withdraw");
        Ok(())
    }

    /// Move `amount` from the player's free balance into escrow
    pub fn lock(&mut self, player: AccountId, amount: Tokens) -> Result<()> {
        let balance = self.balance(&player);
        if amount > balance.free {
            return Err(Error::InsufficientFreeBalance {
                needed: amount.amount(),
                available: balance.free.amount(),
            });
        }
        let entry = self.accounts.entry(player).or_default();
        entry.free = entry.free.checked_sub(amount)?;
        entry.locked = entry.locked.checked_add(amount)?;
        debug!(player = %hex::encode(player), %amount, "lock");
        Ok(())
    }

    /// Execute an atomic multi-party settlement
    ///
    /// Validates conservation and locked-balance sufficiency up front;
    /// only then mutates. Fee contributions are split per paying player:
    /// `referral_percent` of the contribution to the payer's referrer if
    /// one is set, the remainder to `fee_recipient`.
    pub fn settle(
        &mut self,
        settlement: &Settlement,
        referrals: &ReferralRegistry,
        fees: &FeeConfig,
        fee_recipient: AccountId,
    ) -> Result<SettlementReceipt> {
        let mut debit_total = Tokens::ZERO;
        for (player, amount) in &settlement.debits {
            debit_total = debit_total.checked_add(*amount)?;
            if *amount > self.balance(player).locked {
                return Err(Error::ArithmeticOverflow(format!(
                    "settlement would underflow locked balance of {}",
                    hex::encode(player)
                )));
            }
        }
        let mut credit_total = Tokens::ZERO;
        for (_, amount) in &settlement.credits {
            credit_total = credit_total.checked_add(*amount)?;
        }
        let mut fee_total = Tokens::ZERO;
        for contribution in &settlement.fees {
            fee_total = fee_total.checked_add(contribution.amount)?;
        }
        if debit_total != credit_total.checked_add(fee_total)? {
            return Err(Error::ArithmeticOverflow(format!(
                "settlement does not conserve value: {} locked vs {} out",
                debit_total,
                credit_total.checked_add(fee_total)?
            )));
        }

        for (player, amount) in &settlement.debits {
            let entry = self.accounts.entry(*player).or_default();
            entry.locked = entry.locked.checked_sub(*amount)?;
        }
        for (player, amount) in &settlement.credits {
            let entry = self.accounts.entry(*player).or_default();
            entry.free = entry.free.checked_add(*amount)?;
        }

        let mut receipt = SettlementReceipt::default();
        for contribution in &settlement.fees {
            let mut platform_share = contribution.amount;
            if let Some(referrer) = referrals.get_referrer(&contribution.payer) {
                let cut = contribution.amount.percent(fees.referral_percent);
                if !cut.is_zero() {
                    let entry = self.accounts.entry(referrer).or_default();
                    entry.free = entry.free.checked_add(cut)?;
                    platform_share = platform_share.checked_sub(cut)?;
                    receipt
                        .referral_payouts
                        .push((contribution.payer, referrer, cut));
                }
            }
            if !platform_share.is_zero() {
                let entry = self.accounts.entry(fee_recipient).or_default();
                entry.free = entry.free.checked_add(platform_share)?;
                receipt.platform_fee = receipt.platform_fee.checked_add(platform_share)?;
            }
        }
        debug!(
            debits = %debit_total,
            credits = %credit_total,
            fees = %fee_total,
            "settled"
        );
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: AccountId = [1u8; 32];
    const B: AccountId = [2u8; 32];
    const REF: AccountId = [9u8; 32];
    const PLATFORM: AccountId = [0xFEu8; 32];

    fn fees() -> FeeConfig {
        FeeConfig {
            platform_fee_percent: 5,
            referral_percent: 10,
            collateral_penalty_percent: 20,
        }
    }

    #[test]
    fn test_deposit_withdraw() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit(A, Tokens::whole(100)).unwrap();
        assert_eq!(ledger.balance(&A).free, Tokens::whole(100));

        ledger.withdraw(A, Tokens::whole(30)).unwrap();
        assert_eq!(ledger.balance(&A).free, Tokens::whole(70));

        let err = ledger.withdraw(A, Tokens::whole(71)).unwrap_err();
        assert!(matches!(err, Error::InsufficientFreeBalance { .. }));
        assert_eq!(ledger.balance(&A).free, Tokens::whole(70));
    }

    #[test]
    fn test_lock_moves_free_to_locked() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit(A, Tokens::whole(100)).unwrap();
        ledger.lock(A, Tokens::whole(60)).unwrap();

        let balance = ledger.balance(&A);
        assert_eq!(balance.free, Tokens::whole(40));
        assert_eq!(balance.locked, Tokens::whole(60));

        assert!(matches!(
            ledger.lock(A, Tokens::whole(41)),
            Err(Error::InsufficientFreeBalance { .. })
        ));
    }

    #[test]
    fn test_settle_conserves_value() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit(A, Tokens::whole(100)).unwrap();
        ledger.deposit(B, Tokens::whole(50)).unwrap();
        ledger.lock(A, Tokens::whole(100)).unwrap();
        ledger.lock(B, Tokens::whole(50)).unwrap();

        // B wins the pot of 150 minus a 5 fee; A keeps nothing
        let settlement = Settlement {
            debits: vec![(A, Tokens::whole(100)), (B, Tokens::whole(50))],
            credits: vec![(B, Tokens::whole(145))],
            fees: vec![FeeContribution {
                payer: A,
                amount: Tokens::whole(5),
            }],
        };
        let receipt = ledger
            .settle(&settlement, &ReferralRegistry::new(), &fees(), PLATFORM)
            .unwrap();
        assert_eq!(receipt.platform_fee, Tokens::whole(5));
        assert!(receipt.referral_payouts.is_empty());

        assert_eq!(ledger.balance(&A).locked, Tokens::ZERO);
        assert_eq!(ledger.balance(&B).free, Tokens::whole(145));
        assert_eq!(ledger.balance(&PLATFORM).free, Tokens::whole(5));
        assert_eq!(ledger.total_locked(), Tokens::ZERO);
    }

    #[test]
    fn test_settle_rejects_unbalanced_plan() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit(A, Tokens::whole(10)).unwrap();
        ledger.lock(A, Tokens::whole(10)).unwrap();

        let settlement = Settlement {
            debits: vec![(A, Tokens::whole(10))],
            credits: vec![(A, Tokens::whole(11))], // creates value
            fees: vec![],
        };
        assert!(ledger
            .settle(&settlement, &ReferralRegistry::new(), &fees(), PLATFORM)
            .is_err());
        // nothing changed
        assert_eq!(ledger.balance(&A).locked, Tokens::whole(10));
    }

    #[test]
    fn test_settle_rejects_locked_underflow_without_partial_apply() {
        let mut ledger = BalanceLedger::new();
        ledger.deposit(A, Tokens::whole(10)).unwrap();
        ledger.lock(A, Tokens::whole(10)).unwrap();

        let settlement = Settlement {
            debits: vec![(A, Tokens::whole(10)), (B, Tokens::whole(1))],
            credits: vec![(A, Tokens::whole(11))],
            fees: vec![],
        };
        assert!(ledger
            .settle(&settlement, &ReferralRegistry::new(), &fees(), PLATFORM)
            .is_err());
        assert_eq!(ledger.balance(&A).locked, Tokens::whole(10));
        assert_eq!(ledger.balance(&A).free, Tokens::ZERO);
    }

    #[test]
    fn test_fee_split_with_referrer() {
        let mut ledger = BalanceLedger::new();
        let mut referrals = ReferralRegistry::new();
        referrals.set_referrer(A, REF).unwrap();

        ledger.deposit(A, Tokens::whole(100)).unwrap();
        ledger.lock(A, Tokens::whole(100)).unwrap();

        // A pays a 10-token fee; referrer gets 10% of it
        let settlement = Settlement {
            debits: vec![(A, Tokens::whole(100))],
            credits: vec![(A, Tokens::whole(90))],
            fees: vec![FeeContribution {
                payer: A,
                amount: Tokens::whole(10),
            }],
        };
        let receipt = ledger
            .settle(&settlement, &referrals, &fees(), PLATFORM)
            .unwrap();

        assert_eq!(receipt.referral_payouts, vec![(A, REF, Tokens::whole(1))]);
        assert_eq!(receipt.platform_fee, Tokens::whole(9));
        assert_eq!(ledger.balance(&REF).free, Tokens::whole(1));
        assert_eq!(ledger.balance(&PLATFORM).free, Tokens::whole(9));
    }

    #[test]
    fn test_fee_split_independent_per_player() {
        let mut ledger = BalanceLedger::new();
        let mut referrals = ReferralRegistry::new();
        let ref_b = [8u8; 32];
        referrals.set_referrer(A, REF).unwrap();
        referrals.set_referrer(B, ref_b).unwrap();

        ledger.deposit(A, Tokens::whole(100)).unwrap();
        ledger.deposit(B, Tokens::whole(100)).unwrap();
        ledger.lock(A, Tokens::whole(100)).unwrap();
        ledger.lock(B, Tokens::whole(100)).unwrap();

        let settlement = Settlement {
            debits: vec![(A, Tokens::whole(100)), (B, Tokens::whole(100))],
            credits: vec![(A, Tokens::whole(90)), (B, Tokens::whole(90))],
            fees: vec![
                FeeContribution {
                    payer: A,
                    amount: Tokens::whole(10),
                },
                FeeContribution {
                    payer: B,
                    amount: Tokens::whole(10),
                },
            ],
        };
        let receipt = ledger
            .settle(&settlement, &referrals, &fees(), PLATFORM)
            .unwrap();

        // each referrer earns from their own player's contribution only
        assert_eq!(ledger.balance(&REF).free, Tokens::whole(1));
        assert_eq!(ledger.balance(&ref_b).free, Tokens::whole(1));
        assert_eq!(receipt.platform_fee, Tokens::whole(18));
    }

    #[test]
    fn test_settle_with_rounding_remainder_conserves() {
        // 99-unit fee at 10% referral: referrer 9, platform 90
        let mut ledger = BalanceLedger::new();
        let mut referrals = ReferralRegistry::new();
        referrals.set_referrer(A, REF).unwrap();

        ledger.deposit(A, Tokens::new(99)).unwrap();
        ledger.lock(A, Tokens::new(99)).unwrap();

        let settlement = Settlement {
            debits: vec![(A, Tokens::new(99))],
            credits: vec![],
            fees: vec![FeeContribution {
                payer: A,
                amount: Tokens::new(99),
            }],
        };
        let receipt = ledger
            .settle(&settlement, &referrals, &fees(), PLATFORM)
            .unwrap();
        let referral_total: u64 = receipt
            .referral_payouts
            .iter()
            .map(|(_, _, t)| t.amount())
            .sum();
        assert_eq!(referral_total + receipt.platform_fee.amount(), 99);
    }
}
