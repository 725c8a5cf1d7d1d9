//! Reward index vectors: cumulative reward per unit of share, by denom and source.

use crate::math::{Dec, MathError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RewardError {
    #[error("reward factor for {denom} decreased from {old} to {new}")]
    DecreasingFactor { denom: String, old: Dec, new: Dec },
    #[error("reward factor for {denom} disappeared (was {old})")]
    MissingFactor { denom: String, old: Dec },
    #[error("math: {0}")]
    Math(#[from] MathError),
}

/// Reward factor per denom for a single source.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewardIndexes(BTreeMap<String, Dec>);

impl RewardIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, denom: &str) -> Option<Dec> {
        self.0.get(denom).copied()
    }

    pub fn set(&mut self, denom: impl Into<String>, factor: Dec) {
        self.0.insert(denom.into(), factor);
    }

    pub fn with(mut self, denom: impl Into<String>, factor: Dec) -> Self {
        self.set(denom, factor);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Dec)> + '_ {
        self.0.iter().map(|(d, f)| (d.as_str(), *f))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Adds each increment to the matching factor, creating denoms that are
    /// not tracked yet.
    pub fn add(&self, increments: &RewardIndexes) -> Result<RewardIndexes, MathError> {
        let mut out = self.clone();
        for (denom, delta) in increments.iter() {
            let current = out.get(denom).unwrap_or_default();
            out.set(denom, current.checked_add(&delta)?);
        }
        Ok(out)
    }

    /// Checks that `self` is a valid successor of `previous`: every denom
    /// from `previous` is still present and no factor went down.
    pub fn check_advance(&self, previous: &RewardIndexes) -> Result<(), RewardError> {
        for (denom, old) in previous.iter() {
            let Some(new) = self.get(denom) else {
                return Err(RewardError::MissingFactor {
                    denom: denom.to_string(),
                    old,
                });
            };
            if new < old {
                return Err(RewardError::DecreasingFactor {
                    denom: denom.to_string(),
                    old,
                    new,
                });
            }
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, Dec)> for RewardIndexes {
    fn from_iter<I: IntoIterator<Item = (S, Dec)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(d, f)| (d.into(), f)).collect())
    }
}

/// Reward indexes keyed by source id.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MultiRewardIndexes(BTreeMap<String, RewardIndexes>);

impl MultiRewardIndexes {
    pub fn get(&self, source_id: &str) -> Option<&RewardIndexes> {
        self.0.get(source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.0.contains_key(source_id)
    }

    pub fn set(&mut self, source_id: impl Into<String>, indexes: RewardIndexes) {
        self.0.insert(source_id.into(), indexes);
    }

    pub fn remove(&mut self, source_id: &str) -> Option<RewardIndexes> {
        self.0.remove(source_id)
    }

    pub fn source_ids(&self) -> Vec<String> {
        self.0.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RewardIndexes)> + '_ {
        self.0.iter().map(|(s, i)| (s.as_str(), i))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Dec {
        s.parse().unwrap()
    }

    #[test]
    fn add_creates_missing_denoms() {
        let base = RewardIndexes::new().with("hard", dec("1.5"));
        let inc = RewardIndexes::new()
            .with("hard", dec("0.5"))
            .with("ukava", dec("0.25"));
        let out = base.add(&inc).unwrap();
        assert_eq!(out.get("hard"), Some(dec("2")));
        assert_eq!(out.get("ukava"), Some(dec("0.25")));
    }

    #[test]
    fn check_advance_flags_decrease_and_removal() {
        let old = RewardIndexes::new().with("hard", dec("2"));
        let lower = RewardIndexes::new().with("hard", dec("1.9"));
        assert!(matches!(
            lower.check_advance(&old),
            Err(RewardError::DecreasingFactor { .. })
        ));
        let other = RewardIndexes::new().with("ukava", dec("5"));
        assert!(matches!(
            other.check_advance(&old),
            Err(RewardError::MissingFactor { .. })
        ));
        let grown = old.clone().with("ukava", dec("0.1"));
        assert!(grown.check_advance(&old).is_ok());
    }

    #[test]
    fn multi_indexes_serialize_as_nested_maps() {
        let mut multi = MultiRewardIndexes::default();
        multi.set("btc", RewardIndexes::new().with("hard", dec("0.1")));
        let json = serde_json::to_string(&multi).unwrap();
        assert_eq!(json, r#"{"btc":{"hard":"0.100000000000000000"}}"#);
    }
}
