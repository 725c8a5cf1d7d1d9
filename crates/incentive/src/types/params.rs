//! Governance parameters: reward periods per category, claim multipliers and claim deadline.
//!
//! Load from: env `INCENTIVE_PARAMS_PATH`, or `./config/incentive_params.json`, or `./incentive_params.json`.

use crate::types::claim::ClaimType;
use crate::types::multiplier::{Multiplier, MultiplierName, MultipliersPerDenom};
use crate::types::period::MultiRewardPeriod;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::debug;

#[derive(Error, Debug)]
pub enum ParamsError {
    #[error("invalid reward period for {source_id}: {reason}")]
    InvalidPeriod { source_id: String, reason: String },
    #[error("duplicate {claim_type} reward period for {source_id}")]
    DuplicatePeriod {
        claim_type: ClaimType,
        source_id: String,
    },
    #[error("invalid multipliers for {denom}: {reason}")]
    InvalidMultiplier { denom: String, reason: String },
    #[error("lockup of {months} months is out of calendar range")]
    LockupOutOfRange { months: u32 },
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    #[serde(default)]
    pub reward_periods: BTreeMap<ClaimType, Vec<MultiRewardPeriod>>,
    #[serde(default)]
    pub claim_multipliers: Vec<MultipliersPerDenom>,
    /// Claims submitted after this instant are rejected.
    #[serde(with = "time::serde::rfc3339")]
    pub claim_end: OffsetDateTime,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            reward_periods: BTreeMap::new(),
            claim_multipliers: Vec::new(),
            claim_end: OffsetDateTime::UNIX_EPOCH,
        }
    }
}

impl Params {
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (claim_type, periods) in &self.reward_periods {
            let mut seen = BTreeSet::new();
            for period in periods {
                period.validate()?;
                if !seen.insert(period.source_id.as_str()) {
                    return Err(ParamsError::DuplicatePeriod {
                        claim_type: *claim_type,
                        source_id: period.source_id.clone(),
                    });
                }
            }
        }
        let mut denoms = BTreeSet::new();
        for per_denom in &self.claim_multipliers {
            per_denom.validate()?;
            if !denoms.insert(per_denom.denom.as_str()) {
                return Err(ParamsError::InvalidMultiplier {
                    denom: per_denom.denom.clone(),
                    reason: "denom listed twice".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn reward_periods(&self, claim_type: ClaimType) -> &[MultiRewardPeriod] {
        self.reward_periods
            .get(&claim_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn reward_period(&self, claim_type: ClaimType, source_id: &str) -> Option<&MultiRewardPeriod> {
        self.reward_periods(claim_type)
            .iter()
            .find(|p| p.source_id == source_id)
    }

    pub fn multiplier(&self, denom: &str, name: MultiplierName) -> Option<&Multiplier> {
        self.claim_multipliers
            .iter()
            .find(|m| m.denom == denom)
            .and_then(|m| m.get(name))
    }

    /// Read and validate params from a JSON file.
    pub fn load_from_path(path: &Path) -> Result<Self, ParamsError> {
        let content = std::fs::read_to_string(path)?;
        let params: Params = serde_json::from_str(&content)?;
        params.validate()?;
        debug!(path = %path.display(), "loaded params");
        Ok(params)
    }

    /// Load params: env INCENTIVE_PARAMS_PATH, then ./config/incentive_params.json,
    /// then ./incentive_params.json. Falls back to empty params when none exist.
    pub fn load() -> Result<Self, ParamsError> {
        if let Ok(path) = std::env::var("INCENTIVE_PARAMS_PATH") {
            let p = Path::new(&path);
            if p.exists() {
                return Self::load_from_path(p);
            }
        }
        for candidate in [
            Path::new("./config/incentive_params.json"),
            Path::new("./incentive_params.json"),
        ] {
            if candidate.exists() {
                return Self::load_from_path(candidate);
            }
        }
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::{Coins, Dec};
    use time::macros::datetime;

    fn period(source: &str) -> MultiRewardPeriod {
        MultiRewardPeriod::new(
            source,
            datetime!(2024-01-01 0:00 UTC),
            datetime!(2025-01-01 0:00 UTC),
            [("hard", 10u128)].into_iter().collect::<Coins>(),
        )
    }

    #[test]
    fn duplicate_sources_rejected_within_category() {
        let mut params = Params::default();
        params
            .reward_periods
            .insert(ClaimType::Supply, vec![period("btc"), period("btc")]);
        assert!(matches!(
            params.validate(),
            Err(ParamsError::DuplicatePeriod { .. })
        ));
    }

    #[test]
    fn same_source_allowed_across_categories() {
        let mut params = Params::default();
        params.reward_periods.insert(ClaimType::Supply, vec![period("btc")]);
        params.reward_periods.insert(ClaimType::Borrow, vec![period("btc")]);
        assert!(params.validate().is_ok());
        assert!(params.reward_period(ClaimType::Borrow, "btc").is_some());
        assert!(params.reward_period(ClaimType::Swap, "btc").is_none());
    }

    #[test]
    fn multiplier_lookup() {
        let params = Params {
            claim_multipliers: vec![MultipliersPerDenom {
                denom: "hard".to_string(),
                multipliers: vec![Multiplier::new(MultiplierName::Medium, 6, Dec::one())],
            }],
            ..Params::default()
        };
        assert!(params.multiplier("hard", MultiplierName::Medium).is_some());
        assert!(params.multiplier("hard", MultiplierName::Large).is_none());
        assert!(params.multiplier("ukava", MultiplierName::Medium).is_none());
    }

    #[test]
    fn load_from_path_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.json");
        std::fs::write(
            &path,
            r#"{"reward_periods":{"swap":[{"source_id":"","start":"2024-01-01T00:00:00Z","end":"2024-02-01T00:00:00Z"}]},"claim_end":"2025-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        assert!(Params::load_from_path(&path).is_err());
    }
}
