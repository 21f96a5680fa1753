//! One-time referrer registry
//!
//! Each account may set a referrer exactly once; the mapping is immutable
//! afterwards. Only the direct referrer of a fee-paying player earns a cut -
//! chains are never resolved transitively, so the self-referral check is the
//! only cycle handling required.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::AccountId;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferralRegistry {
    referrers: HashMap<AccountId, AccountId>,
}

impl ReferralRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `referrer` to `player`, once and irreversibly
    pub fn set_referrer(&mut self, player: AccountId, referrer: AccountId) -> Result<()> {
        if player == referrer {
            return Err(Error::SelfReferralForbidden);
        }
        if self.referrers.contains_key(&player) {
            return Err(Error::ReferrerAlreadySet);
        }
        self.referrers.insert(player, referrer);
        Ok(())
    }

    pub fn get_referrer(&self, player: &AccountId) -> Option<AccountId> {
        self.referrers.get(player).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_once_then_immutable() {
        let mut registry = ReferralRegistry::new();
        let player = [1u8; 32];
        let referrer = [2u8; 32];
        let other = [3u8; 32];

        assert_eq!(registry.get_referrer(&player), None);
        registry.set_referrer(player, referrer).unwrap();
        assert_eq!(registry.get_referrer(&player), Some(referrer));

        assert!(matches!(
            registry.set_referrer(player, other),
            Err(Error::ReferrerAlreadySet)
        ));
        assert_eq!(registry.get_referrer(&player), Some(referrer));
    }

    #[test]
    fn test_self_referral_rejected() {
        let mut registry = ReferralRegistry::new();
        let player = [7u8; 32];
        assert!(matches!(
            registry.set_referrer(player, player),
            Err(Error::SelfReferralForbidden)
        ));
        assert_eq!(registry.get_referrer(&player), None);
    }

    #[test]
    fn test_two_party_mutual_referral_is_allowed() {
        // A refers B and B refers A is legal; only direct referrers pay out
        let mut registry = ReferralRegistry::new();
        let a = [1u8; 32];
        let b = [2u8; 32];
        registry.set_referrer(a, b).unwrap();
        registry.set_referrer(b, a).unwrap();
        assert_eq!(registry.get_referrer(&a), Some(b));
        assert_eq!(registry.get_referrer(&b), Some(a));
    }
}
