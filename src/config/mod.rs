//! Protocol configuration
//!
//! Fee percentages, timeout windows, and stake minimums are deployment
//! configuration, not protocol constants - they can differ per environment
//! without changing settlement semantics. Loading supports a TOML file plus
//! environment-variable overrides for the common knobs.

use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::protocol::{AccountId, Tokens, STAKE_UNIT};

/// Top-level protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Minimum base stake, in smallest token units
    pub min_base_stake: u64,
    /// Base stakes must be a multiple of this (0.1 token)
    pub stake_unit: u64,
    /// Account credited with the platform's share of fees
    pub fee_recipient: AccountId,
    pub fees: FeeConfig,
    pub timing: TimingConfig,
}

/// Fee and penalty percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeeConfig {
    /// Platform fee, percent of each settled stake
    pub platform_fee_percent: u8,
    /// Referrer's cut, percent of the paying player's fee contribution
    pub referral_percent: u8,
    /// Collateral penalty, percent of the maximum stake
    pub collateral_penalty_percent: u8,
}

/// Timeout windows, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingConfig {
    /// How long an unjoined room stays open
    pub room_ttl_secs: u64,
    /// How long player A has to reveal after an opponent joins
    pub reveal_window_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            min_base_stake: STAKE_UNIT, // 0.1 token
            stake_unit: STAKE_UNIT,
            fee_recipient: [0xFEu8; 32],
            fees: FeeConfig {
                platform_fee_percent: 5,
                referral_percent: 10,
                collateral_penalty_percent: 20,
            },
            timing: TimingConfig {
                room_ttl_secs: 3600,
                reveal_window_secs: 600,
            },
        }
    }
}

impl ProtocolConfig {
    /// Load configuration from a TOML file, then apply environment
    /// overrides, then validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: ProtocolConfig =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("parse error: {}", e)))?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Environment overrides for the knobs operators tune most often
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_u64("RPS3_MIN_BASE_STAKE") {
            self.min_base_stake = v;
        }
        if let Some(v) = env_u64("RPS3_PLATFORM_FEE_PERCENT") {
            self.fees.platform_fee_percent = v.min(100) as u8;
        }
        if let Some(v) = env_u64("RPS3_REFERRAL_PERCENT") {
            self.fees.referral_percent = v.min(100) as u8;
        }
        if let Some(v) = env_u64("RPS3_ROOM_TTL_SECS") {
            self.timing.room_ttl_secs = v;
        }
        if let Some(v) = env_u64("RPS3_REVEAL_WINDOW_SECS") {
            self.timing.reveal_window_secs = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.stake_unit == 0 {
            return Err(Error::Config("stake_unit must be positive".into()));
        }
        if self.min_base_stake == 0 || self.min_base_stake % self.stake_unit != 0 {
            return Err(Error::Config(
                "min_base_stake must be a positive multiple of stake_unit".into(),
            ));
        }
        for (name, pct) in [
            ("platform_fee_percent", self.fees.platform_fee_percent),
            ("referral_percent", self.fees.referral_percent),
            (
                "collateral_penalty_percent",
                self.fees.collateral_penalty_percent,
            ),
        ] {
            if pct > 100 {
                return Err(Error::Config(format!("{} must be <= 100", name)));
            }
        }
        if self.timing.room_ttl_secs == 0 || self.timing.reveal_window_secs == 0 {
            return Err(Error::Config("timeout windows must be positive".into()));
        }
        Ok(())
    }

    pub fn min_base_stake(&self) -> Tokens {
        Tokens::new(self.min_base_stake)
    }
}

fn env_u64(key: &str) -> Option<u64> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        ProtocolConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_rejects_bad_percentages() {
        let mut config = ProtocolConfig::default();
        config.fees.referral_percent = 101;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validation_rejects_misaligned_minimum() {
        let mut config = ProtocolConfig::default();
        config.min_base_stake = STAKE_UNIT + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_toml_file() {
        let toml = r#"
            min_base_stake = 200000
            stake_unit = 100000
            fee_recipient = [254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254, 254]

            [fees]
            platform_fee_percent = 3
            referral_percent = 15
            collateral_penalty_percent = 25

            [timing]
            room_ttl_secs = 1800
            reveal_window_secs = 300
        "#;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(toml.as_bytes()).unwrap();

        let config = ProtocolConfig::load(file.path()).unwrap();
        assert_eq!(config.min_base_stake, 200_000);
        assert_eq!(config.fees.platform_fee_percent, 3);
        assert_eq!(config.timing.reveal_window_secs, 300);
        assert_eq!(config.fee_recipient, [0xFEu8; 32]);
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not valid toml [").unwrap();
        assert!(ProtocolConfig::load(file.path()).is_err());
    }
}
