//! Entry points called by the module that owns positions, around every share change.

use super::{IncentiveError, Keeper, SourceShares};
use crate::math::Dec;
use crate::store::Store;
use crate::types::ClaimType;

impl<S: Store> Keeper<S> {
    /// After an owner opens their first position in `source_id`.
    pub fn after_position_created(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        source_id: &str,
        shares: &dyn SourceShares,
    ) -> Result<(), IncentiveError> {
        self.initialize_reward(claim_type, owner, source_id, shares)
    }

    /// Before an existing position changes size. `pre_change_shares` is the
    /// owner's balance in `source_id` before the change.
    pub fn before_position_modified(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        source_id: &str,
        pre_change_shares: Dec,
    ) -> Result<(), IncentiveError> {
        self.synchronize_reward(claim_type, owner, source_id, pre_change_shares)
    }

    /// After a position changed, with the full list of sources the owner
    /// still holds in this category.
    pub fn after_position_modified(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        current_sources: &[String],
    ) -> Result<(), IncentiveError> {
        self.update_membership(claim_type, owner, current_sources)
    }
}
