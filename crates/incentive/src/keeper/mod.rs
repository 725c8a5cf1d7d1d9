//! Reward engine: lazy accumulation into global indexes and per-owner claim synchronization.

mod accumulate;
mod calculate;
mod hooks;
mod payout;
mod sync;

pub use calculate::calculate_rewards;
pub use payout::{EventSink, LockError, Lockup, PayoutContext, Selection, TimeLocker};

use crate::math::{Dec, MathError};
use crate::store::{Store, StoreError};
use crate::types::{
    AccumulatorState, Claim, ClaimType, MultiplierName, Params, ParamsError, RewardError,
};
use thiserror::Error;
use time::OffsetDateTime;
use tracing::error;

/// Share balances for one claim category, owned by the module that tracks
/// positions.
pub trait SourceShares {
    fn total_shares(&self, source_id: &str) -> Dec;
    fn owner_shares(&self, owner: &str, source_id: &str) -> Dec;
}

#[derive(Error, Debug)]
pub enum IncentiveError {
    #[error("no {claim_type} claim found for {owner}")]
    ClaimNotFound { claim_type: ClaimType, owner: String },
    #[error("no {name} multiplier configured for {denom}")]
    InvalidMultiplier { denom: String, name: MultiplierName },
    #[error("claim period expired: {now} is after claim end {claim_end}")]
    ClaimExpired {
        now: OffsetDateTime,
        claim_end: OffsetDateTime,
    },
    #[error("cannot claim {denom}: payout rounds to zero")]
    ZeroClaim { denom: String },
    #[error("{denom} selected more than once")]
    DuplicateSelection { denom: String },
    #[error("reward period {source_id} ends before it starts")]
    InvalidPeriod { source_id: String },
    #[error("global indexes for {claim_type}/{source_id} went backwards: {reason}")]
    CorruptedIndexes {
        claim_type: ClaimType,
        source_id: String,
        #[source]
        reason: Box<RewardError>,
    },
    #[error("accrual time for {claim_type}/{source_id} moved backwards")]
    AccrualTimeRegressed {
        claim_type: ClaimType,
        source_id: String,
    },
    #[error("params: {0}")]
    Params(#[from] ParamsError),
    #[error("math: {0}")]
    Math(#[from] MathError),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("lock: {0}")]
    Lock(#[from] LockError),
}

impl IncentiveError {
    /// Broken ledger invariants. The host must halt rather than carry on
    /// with this state.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            IncentiveError::CorruptedIndexes { .. } | IncentiveError::AccrualTimeRegressed { .. }
        )
    }

    fn from_reward(claim_type: ClaimType, source_id: &str, err: RewardError) -> Self {
        match err {
            RewardError::Math(e) => IncentiveError::Math(e),
            reason => {
                error!(%claim_type, source_id, %reason, "reward index invariant violated");
                IncentiveError::CorruptedIndexes {
                    claim_type,
                    source_id: source_id.to_string(),
                    reason: Box::new(reason),
                }
            }
        }
    }
}

/// Owns the store and the active params. All state transitions go through
/// here.
pub struct Keeper<S> {
    store: S,
    params: Params,
}

impl<S: Store> Keeper<S> {
    pub fn new(store: S, params: Params) -> Self {
        Self { store, params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Replaces params after validating them. Existing accumulators keep
    /// their accrual time, so a period added later starts earning from the
    /// next accumulation.
    pub fn set_params(&mut self, params: Params) -> Result<(), IncentiveError> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn claim(&self, claim_type: ClaimType, owner: &str) -> Result<Option<Claim>, IncentiveError> {
        Ok(self.store.claim(claim_type, owner)?)
    }

    pub fn accumulator(
        &self,
        claim_type: ClaimType,
        source_id: &str,
    ) -> Result<Option<AccumulatorState>, IncentiveError> {
        Ok(self.store.accumulator(claim_type, source_id)?)
    }

    /// Writes accumulator state only if it is a valid successor of what is
    /// stored: no factor decreases or disappears and accrual time does not
    /// regress.
    fn store_accumulator(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        state: &AccumulatorState,
    ) -> Result<(), IncentiveError> {
        if let Some(previous) = self.store.accumulator(claim_type, source_id)? {
            state
                .indexes
                .check_advance(&previous.indexes)
                .map_err(|e| IncentiveError::from_reward(claim_type, source_id, e))?;
            if state.previous_accrual_time < previous.previous_accrual_time {
                error!(%claim_type, source_id, "accrual time regression rejected");
                return Err(IncentiveError::AccrualTimeRegressed {
                    claim_type,
                    source_id: source_id.to_string(),
                });
            }
        }
        self.store.set_accumulator(claim_type, source_id, state)?;
        Ok(())
    }
}
