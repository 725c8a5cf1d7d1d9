//! Host-side collaborators and a scenario runner that drives the keeper through time.

mod ledger;
mod scenario;
mod sinks;

pub use ledger::{CategoryShares, LedgerError, Position, ShareLedger};
pub use scenario::{run_scenario, Action, ActionFailure, Scenario, ScenarioError, ScenarioOutcome, Step};
pub use sinks::{EventLog, VestingEntry, VestingLedger};
