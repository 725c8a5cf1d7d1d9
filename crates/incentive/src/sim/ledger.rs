//! Share positions held by owners, per category and source.

use crate::keeper::SourceShares;
use crate::math::{Dec, MathError};
use crate::types::ClaimType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("{owner} holds {held}, cannot withdraw {requested}")]
    InsufficientShares {
        owner: String,
        held: Dec,
        requested: Dec,
    },
    #[error("math: {0}")]
    Math(#[from] MathError),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub claim_type: ClaimType,
    pub source_id: String,
    pub owner: String,
    pub shares: Dec,
}

type PositionKey = (ClaimType, String, String);

/// Positions keyed by (category, source, owner). Empty positions are removed.
#[derive(Clone, Debug, Default)]
pub struct ShareLedger {
    positions: BTreeMap<PositionKey, Dec>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_positions(positions: &[Position]) -> Result<Self, LedgerError> {
        let mut ledger = Self::new();
        for p in positions {
            ledger.deposit(p.claim_type, &p.source_id, &p.owner, p.shares)?;
        }
        Ok(ledger)
    }

    pub fn owner_shares(&self, claim_type: ClaimType, source_id: &str, owner: &str) -> Dec {
        self.positions
            .get(&(claim_type, source_id.to_string(), owner.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn deposit(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        owner: &str,
        amount: Dec,
    ) -> Result<(), LedgerError> {
        if amount.is_zero() {
            return Ok(());
        }
        let slot = self
            .positions
            .entry((claim_type, source_id.to_string(), owner.to_string()))
            .or_default();
        *slot = slot.checked_add(&amount)?;
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        owner: &str,
        amount: Dec,
    ) -> Result<(), LedgerError> {
        let key = (claim_type, source_id.to_string(), owner.to_string());
        let held = self.positions.get(&key).copied().unwrap_or_default();
        let left = held
            .checked_sub(&amount)
            .ok_or_else(|| LedgerError::InsufficientShares {
                owner: owner.to_string(),
                held,
                requested: amount,
            })?;
        if left.is_zero() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, left);
        }
        Ok(())
    }

    /// Sources in which `owner` holds a non-zero position.
    pub fn sources_of(&self, claim_type: ClaimType, owner: &str) -> Vec<String> {
        self.positions
            .keys()
            .filter(|(ct, _, o)| *ct == claim_type && o == owner)
            .map(|(_, source, _)| source.clone())
            .collect()
    }

    pub fn positions(&self) -> Vec<Position> {
        self.positions
            .iter()
            .map(|((claim_type, source_id, owner), shares)| Position {
                claim_type: *claim_type,
                source_id: source_id.clone(),
                owner: owner.clone(),
                shares: *shares,
            })
            .collect()
    }

    /// Share view of one category for the keeper.
    pub fn view(&self, claim_type: ClaimType) -> CategoryShares<'_> {
        CategoryShares {
            ledger: self,
            claim_type,
        }
    }
}

pub struct CategoryShares<'a> {
    ledger: &'a ShareLedger,
    claim_type: ClaimType,
}

impl SourceShares for CategoryShares<'_> {
    fn total_shares(&self, source_id: &str) -> Dec {
        // saturates instead of overflowing; a U256 of shares is unreachable
        self.ledger
            .positions
            .iter()
            .filter(|((ct, s, _), _)| *ct == self.claim_type && s == source_id)
            .fold(Dec::zero(), |acc, (_, shares)| {
                acc.checked_add(shares).unwrap_or(acc)
            })
    }

    fn owner_shares(&self, owner: &str, source_id: &str) -> Dec {
        self.ledger.owner_shares(self.claim_type, source_id, owner)
    }
}
