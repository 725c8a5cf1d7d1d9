//! Claim categories and per-owner claim records.

use crate::math::Coins;
use crate::types::index::MultiRewardIndexes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of activity that earns rewards. Each category keeps its own
/// accumulators and claims.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClaimType {
    Minting,
    Supply,
    Borrow,
    Delegator,
    Swap,
    Savings,
    Earn,
}

impl ClaimType {
    pub const ALL: [ClaimType; 7] = [
        ClaimType::Minting,
        ClaimType::Supply,
        ClaimType::Borrow,
        ClaimType::Delegator,
        ClaimType::Swap,
        ClaimType::Savings,
        ClaimType::Earn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimType::Minting => "minting",
            ClaimType::Supply => "supply",
            ClaimType::Borrow => "borrow",
            ClaimType::Delegator => "delegator",
            ClaimType::Swap => "swap",
            ClaimType::Savings => "savings",
            ClaimType::Earn => "earn",
        }
    }
}

impl fmt::Display for ClaimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClaimType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClaimType::ALL
            .into_iter()
            .find(|ct| ct.as_str() == s.trim())
            .ok_or_else(|| format!("unknown claim type {s:?}"))
    }
}

/// Rewards owed to one owner in one category, plus the index snapshot
/// (per source) taken the last time the owner was synchronized.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    pub claim_type: ClaimType,
    pub owner: String,
    #[serde(default)]
    pub reward: Coins,
    #[serde(default)]
    pub reward_indexes: MultiRewardIndexes,
}

impl Claim {
    pub fn new(claim_type: ClaimType, owner: impl Into<String>) -> Self {
        Self {
            claim_type,
            owner: owner.into(),
            reward: Coins::new(),
            reward_indexes: MultiRewardIndexes::default(),
        }
    }

    /// True once the owner has neither a balance nor any tracked source.
    pub fn is_empty(&self) -> bool {
        self.reward.is_empty() && self.reward_indexes.is_empty()
    }
}
