//! Global accumulation: fold elapsed emission into the per-source reward indexes.

use super::{IncentiveError, Keeper, SourceShares};
use crate::math::Dec;
use crate::store::Store;
use crate::types::{AccumulatorState, ClaimType, MultiRewardPeriod};
use time::OffsetDateTime;
use tracing::debug;

impl<S: Store> Keeper<S> {
    /// Advances the accumulator for `period.source_id`. The first call for a
    /// source only records `now` as its starting point.
    pub fn accumulate_rewards(
        &mut self,
        claim_type: ClaimType,
        period: &MultiRewardPeriod,
        total_shares: Dec,
        now: OffsetDateTime,
    ) -> Result<(), IncentiveError> {
        if period.start > period.end {
            return Err(IncentiveError::InvalidPeriod {
                source_id: period.source_id.clone(),
            });
        }
        let source_id = period.source_id.as_str();
        let state = match self.store.accumulator(claim_type, source_id)? {
            None => {
                debug!(%claim_type, source_id, "seeding accumulator");
                AccumulatorState::seeded(now)
            }
            Some(mut state) => {
                state.accumulate(period, total_shares, now)?;
                state
            }
        };
        self.store_accumulator(claim_type, source_id, &state)?;
        debug!(
            %claim_type,
            source_id,
            total_shares = %total_shares,
            accrual_time = %state.previous_accrual_time,
            "accumulated"
        );
        Ok(())
    }

    /// Accumulates one source using its configured period. Sources without a
    /// period are left alone.
    pub fn accumulate(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        shares: &dyn SourceShares,
        now: OffsetDateTime,
    ) -> Result<(), IncentiveError> {
        let Some(period) = self.params.reward_period(claim_type, source_id).cloned() else {
            return Ok(());
        };
        self.accumulate_rewards(claim_type, &period, shares.total_shares(source_id), now)
    }

    /// Accumulates every configured period of a category.
    pub fn accumulate_all(
        &mut self,
        claim_type: ClaimType,
        shares: &dyn SourceShares,
        now: OffsetDateTime,
    ) -> Result<(), IncentiveError> {
        let periods = self.params.reward_periods(claim_type).to_vec();
        for period in &periods {
            self.accumulate_rewards(claim_type, period, shares.total_shares(&period.source_id), now)?;
        }
        Ok(())
    }
}
