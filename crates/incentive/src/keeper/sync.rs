//! Per-owner catch-up: move earned rewards into the claim and advance its index snapshots.

use super::calculate::calculate_rewards;
use super::{IncentiveError, Keeper, SourceShares};
use crate::math::Dec;
use crate::store::Store;
use crate::types::{Claim, ClaimType};
use std::collections::BTreeSet;
use tracing::debug;

impl<S: Store> Keeper<S> {
    /// Credits `claim` with what `shares` earned on `source_id` since its
    /// snapshot and moves the snapshot to the current global indexes.
    /// Returns false when the source has no accumulator yet.
    fn synchronize_source(
        &self,
        claim: &mut Claim,
        source_id: &str,
        shares: Dec,
    ) -> Result<bool, IncentiveError> {
        let Some(global) = self.store.accumulator(claim.claim_type, source_id)? else {
            return Ok(false);
        };
        let user = claim
            .reward_indexes
            .get(source_id)
            .cloned()
            .unwrap_or_default();
        let earned = calculate_rewards(&user, &global.indexes, shares)
            .map_err(|e| IncentiveError::from_reward(claim.claim_type, source_id, e))?;
        claim.reward.add_all(&earned)?;
        claim.reward_indexes.set(source_id, global.indexes);
        if !earned.is_empty() {
            debug!(
                claim_type = %claim.claim_type,
                owner = %claim.owner,
                source_id,
                earned = %earned,
                "synchronized"
            );
        }
        Ok(true)
    }

    /// Sets up tracking for an owner's first position in `source_id`.
    /// Creates the claim if needed; sources the owner already holds are
    /// synchronized first so nothing accrued on them is lost.
    pub fn initialize_reward(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        source_id: &str,
        shares: &dyn SourceShares,
    ) -> Result<(), IncentiveError> {
        let mut claim = match self.store.claim(claim_type, owner)? {
            Some(mut claim) => {
                for other in claim.reward_indexes.source_ids() {
                    if other != source_id {
                        self.synchronize_source(&mut claim, &other, shares.owner_shares(owner, &other))?;
                    }
                }
                claim
            }
            None => Claim::new(claim_type, owner),
        };
        let global = self
            .store
            .accumulator(claim_type, source_id)?
            .map(|state| state.indexes)
            .unwrap_or_default();
        claim.reward_indexes.set(source_id, global);
        self.store.set_claim(&claim)?;
        Ok(())
    }

    /// Catches one source of a claim up to the global index. Must be called
    /// with the owner's shares as they were before the change about to be
    /// applied. No-op if the claim or the accumulator is missing.
    pub fn synchronize_reward(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        source_id: &str,
        pre_change_shares: Dec,
    ) -> Result<(), IncentiveError> {
        let Some(mut claim) = self.store.claim(claim_type, owner)? else {
            return Ok(());
        };
        if self.synchronize_source(&mut claim, source_id, pre_change_shares)? {
            self.store.set_claim(&claim)?;
        }
        Ok(())
    }

    /// Synchronizes every source the owner tracks or currently holds shares
    /// in, persists and returns the claim. `None` if the owner has no claim.
    pub fn synchronize_claim(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        shares: &dyn SourceShares,
    ) -> Result<Option<Claim>, IncentiveError> {
        let Some(mut claim) = self.store.claim(claim_type, owner)? else {
            return Ok(None);
        };
        let mut sources: BTreeSet<String> = claim.reward_indexes.source_ids().into_iter().collect();
        for (source_id, _) in self.store.accumulators(claim_type)? {
            if !shares.owner_shares(owner, &source_id).is_zero() {
                sources.insert(source_id);
            }
        }
        for source_id in &sources {
            self.synchronize_source(&mut claim, source_id, shares.owner_shares(owner, source_id))?;
        }
        self.store.set_claim(&claim)?;
        Ok(Some(claim))
    }

    /// Reconciles which sources a claim tracks with the sources the owner
    /// holds now: new ones start at the current global index, abandoned ones
    /// are dropped. Creates the claim if needed.
    pub fn update_membership(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        current_sources: &[String],
    ) -> Result<(), IncentiveError> {
        let mut claim = self
            .store
            .claim(claim_type, owner)?
            .unwrap_or_else(|| Claim::new(claim_type, owner));
        let current: BTreeSet<&str> = current_sources.iter().map(String::as_str).collect();
        for source_id in &current {
            if !claim.reward_indexes.contains(source_id) {
                let global = self
                    .store
                    .accumulator(claim_type, source_id)?
                    .map(|state| state.indexes)
                    .unwrap_or_default();
                claim.reward_indexes.set(*source_id, global);
            }
        }
        for tracked in claim.reward_indexes.source_ids() {
            if !current.contains(tracked.as_str()) {
                claim.reward_indexes.remove(&tracked);
            }
        }
        self.store.set_claim(&claim)?;
        Ok(())
    }

    /// Returns the claim as it would look after synchronizing every tracked
    /// source, without writing anything.
    pub fn simulate_synchronization(
        &self,
        claim: &Claim,
        shares: &dyn SourceShares,
    ) -> Result<Claim, IncentiveError> {
        let mut simulated = claim.clone();
        for source_id in claim.reward_indexes.source_ids() {
            let owner_shares = shares.owner_shares(&claim.owner, &source_id);
            self.synchronize_source(&mut simulated, &source_id, owner_shares)?;
        }
        Ok(simulated)
    }
}
