//! Global accumulator state and the pure accrual step.

use crate::math::{Coins, Dec, MathError};
use crate::types::index::RewardIndexes;
use crate::types::period::MultiRewardPeriod;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// Per (category, source) accrual state: the last time rewards were
/// folded into the global indexes, and the indexes themselves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorState {
    #[serde(with = "time::serde::rfc3339")]
    pub previous_accrual_time: OffsetDateTime,
    #[serde(default)]
    pub indexes: RewardIndexes,
}

impl AccumulatorState {
    /// Fresh state anchored at `now` with no indexes.
    pub fn seeded(now: OffsetDateTime) -> Self {
        Self {
            previous_accrual_time: now,
            indexes: RewardIndexes::new(),
        }
    }

    /// Folds the emission between the previous accrual time and `now`
    /// (clipped to the period window) into the indexes, spread over
    /// `total_shares`. Accrual time only moves forward.
    pub fn accumulate(
        &mut self,
        period: &MultiRewardPeriod,
        total_shares: Dec,
        now: OffsetDateTime,
    ) -> Result<(), MathError> {
        let elapsed = eligible_seconds(period.start, period.end, self.previous_accrual_time, now);
        let increments = new_reward_factors(&period.rewards_per_second, total_shares, elapsed)?;
        if !increments.is_empty() {
            self.indexes = self.indexes.add(&increments)?;
        }
        if now > self.previous_accrual_time {
            self.previous_accrual_time = now;
        }
        Ok(())
    }
}

/// Whole seconds of `[previous, now]` that fall inside `[start, end]`,
/// rounded half to even.
pub fn eligible_seconds(
    start: OffsetDateTime,
    end: OffsetDateTime,
    previous: OffsetDateTime,
    now: OffsetDateTime,
) -> u64 {
    let from = previous.max(start);
    let to = now.min(end);
    if to <= from {
        return 0;
    }
    round_seconds_half_even(to - from)
}

fn round_seconds_half_even(span: Duration) -> u64 {
    let mut secs = span.whole_seconds();
    let nanos = span.subsec_nanoseconds();
    if nanos > 500_000_000 || (nanos == 500_000_000 && secs % 2 == 1) {
        secs += 1;
    }
    u64::try_from(secs).unwrap_or(0)
}

/// Index increments for `elapsed` seconds of emission at `rates`, shared
/// across `total_shares`. Empty when nothing is owed or nobody holds shares.
pub fn new_reward_factors(
    rates: &Coins,
    total_shares: Dec,
    elapsed: u64,
) -> Result<RewardIndexes, MathError> {
    let mut increments = RewardIndexes::new();
    if elapsed == 0 || total_shares.is_zero() || rates.is_empty() {
        return Ok(increments);
    }
    for (denom, rate) in rates.iter() {
        let emitted = Dec::from_int(rate).mul_int(u128::from(elapsed))?;
        increments.set(denom, emitted.quo(&total_shares)?);
    }
    Ok(increments)
}
