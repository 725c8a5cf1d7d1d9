//! Domain types: claim categories, reward indexes, periods, params and events.

mod accumulator;
mod claim;
mod events;
mod index;
mod multiplier;
mod params;
mod period;

pub use accumulator::{eligible_seconds, new_reward_factors, AccumulatorState};
pub use claim::{Claim, ClaimType};
pub use events::{Event, EventKind};
pub use index::{MultiRewardIndexes, RewardError, RewardIndexes};
pub use multiplier::{add_months, Multiplier, MultiplierName, MultipliersPerDenom};
pub use params::{Params, ParamsError};
pub use period::MultiRewardPeriod;
