//! Reward owed between two index snapshots.

use crate::math::{Coins, Dec};
use crate::types::{RewardError, RewardIndexes};

/// Rewards earned by `shares` while the indexes moved from `old` to `new`:
/// `round_half_even((new - old) * shares)` per denom. Denoms missing from
/// `old` count from zero. A denom that vanished or a factor that decreased
/// is an error.
pub fn calculate_rewards(
    old: &RewardIndexes,
    new: &RewardIndexes,
    shares: Dec,
) -> Result<Coins, RewardError> {
    new.check_advance(old)?;
    let mut reward = Coins::new();
    for (denom, new_factor) in new.iter() {
        let old_factor = old.get(denom).unwrap_or_default();
        let increase = new_factor
            .checked_sub(&old_factor)
            .ok_or_else(|| RewardError::DecreasingFactor {
                denom: denom.to_string(),
                old: old_factor,
                new: new_factor,
            })?;
        let amount = increase.mul(&shares)?.round_int()?;
        reward.add(denom, amount)?;
    }
    Ok(reward)
}
