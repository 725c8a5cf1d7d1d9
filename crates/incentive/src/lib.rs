//! incentive: lazy reward accumulation and claim synchronization.
//!
//! Emission per source is folded into global reward indexes only when
//! something touches that source; each owner's claim catches up from its
//! last index snapshot when their shares change or they claim.

pub mod keeper;
pub mod math;
pub mod report;
pub mod sim;
pub mod store;
pub mod types;
pub mod verify;

pub use keeper::{
    calculate_rewards, EventSink, IncentiveError, Keeper, LockError, Lockup, PayoutContext,
    Selection, SourceShares, TimeLocker,
};
pub use math::{Coins, Dec, MathError};
pub use report::ReportData;
pub use sim::{run_scenario, Scenario, ScenarioError, ScenarioOutcome, ShareLedger, VestingLedger};
pub use store::{MemoryStore, SqliteStore, Store, StoreError};
pub use types::{
    AccumulatorState, Claim, ClaimType, Event, EventKind, MultiRewardIndexes, MultiRewardPeriod,
    Multiplier, MultiplierName, MultipliersPerDenom, Params, ParamsError, RewardIndexes,
};
pub use verify::{reproducibility_hash, StateSnapshot, VerificationResult, VerifyError};
