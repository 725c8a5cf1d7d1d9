//! Scripted runs: timed steps of deposits, withdrawals, claims and param changes.

use super::ledger::{LedgerError, ShareLedger};
use super::sinks::{EventLog, VestingLedger};
use crate::keeper::{IncentiveError, Keeper, PayoutContext, Selection};
use crate::math::{Coins, Dec};
use crate::store::Store;
use crate::types::{ClaimType, MultiplierName, Params, ParamsError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("params: {0}")]
    Params(#[from] ParamsError),
    #[error("step {step} at {time} is earlier than the step before it")]
    OutOfOrder { step: usize, time: OffsetDateTime },
    #[error("halted at step {step}: {source}")]
    Halted {
        step: usize,
        #[source]
        source: IncentiveError,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Deposit {
        claim_type: ClaimType,
        owner: String,
        source_id: String,
        amount: Dec,
    },
    Withdraw {
        claim_type: ClaimType,
        owner: String,
        source_id: String,
        amount: Dec,
    },
    Claim {
        claim_type: ClaimType,
        owner: String,
        denom: String,
        multiplier: MultiplierName,
    },
    UpdateParams {
        params: Params,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(with = "time::serde::rfc3339")]
    pub time: OffsetDateTime,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub params: Params,
    /// Funds available for payouts. Unlimited when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reward_pool: Option<Coins>,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn load_from_path(path: &Path) -> Result<Self, ScenarioError> {
        let content = std::fs::read_to_string(path)?;
        let scenario: Scenario = serde_json::from_str(&content)?;
        scenario.params.validate()?;
        Ok(scenario)
    }
}

/// An action the keeper or ledger refused. The run continues past these.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFailure {
    pub step: usize,
    pub action: usize,
    pub reason: String,
}

pub struct ScenarioOutcome<S> {
    pub keeper: Keeper<S>,
    pub ledger: ShareLedger,
    pub vesting: VestingLedger,
    pub events: EventLog,
    pub failures: Vec<ActionFailure>,
}

enum ActionError {
    Rejected(String),
    Halt(IncentiveError),
}

impl From<IncentiveError> for ActionError {
    fn from(err: IncentiveError) -> Self {
        match err {
            IncentiveError::ClaimNotFound { .. }
            | IncentiveError::InvalidMultiplier { .. }
            | IncentiveError::ClaimExpired { .. }
            | IncentiveError::ZeroClaim { .. }
            | IncentiveError::DuplicateSelection { .. }
            | IncentiveError::Params(_)
            | IncentiveError::Lock(_) => ActionError::Rejected(err.to_string()),
            other => ActionError::Halt(other),
        }
    }
}

impl From<LedgerError> for ActionError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Math(e) => ActionError::Halt(IncentiveError::Math(e)),
            other => ActionError::Rejected(other.to_string()),
        }
    }
}

struct Host<S> {
    keeper: Keeper<S>,
    ledger: ShareLedger,
    vesting: VestingLedger,
    events: EventLog,
}

impl<S: Store> Host<S> {
    fn apply(&mut self, action: &Action, now: OffsetDateTime) -> Result<(), ActionError> {
        match action {
            Action::Deposit {
                claim_type,
                owner,
                source_id,
                amount,
            } => {
                let ct = *claim_type;
                let held = self.ledger.owner_shares(ct, source_id, owner);
                if held.is_zero() {
                    self.ledger.deposit(ct, source_id, owner, *amount)?;
                    self.keeper
                        .after_position_created(ct, owner, source_id, &self.ledger.view(ct))?;
                } else {
                    self.keeper
                        .before_position_modified(ct, owner, source_id, held)?;
                    self.ledger.deposit(ct, source_id, owner, *amount)?;
                }
                let sources = self.ledger.sources_of(ct, owner);
                self.keeper.after_position_modified(ct, owner, &sources)?;
            }
            Action::Withdraw {
                claim_type,
                owner,
                source_id,
                amount,
            } => {
                let ct = *claim_type;
                let held = self.ledger.owner_shares(ct, source_id, owner);
                if held < *amount {
                    return Err(ActionError::Rejected(format!(
                        "{owner} holds {held} of {ct}/{source_id}, cannot withdraw {amount}"
                    )));
                }
                self.keeper
                    .before_position_modified(ct, owner, source_id, held)?;
                self.ledger.withdraw(ct, source_id, owner, *amount)?;
                let sources = self.ledger.sources_of(ct, owner);
                self.keeper.after_position_modified(ct, owner, &sources)?;
            }
            Action::Claim {
                claim_type,
                owner,
                denom,
                multiplier,
            } => {
                let shares = self.ledger.view(*claim_type);
                let mut ctx = PayoutContext {
                    shares: &shares,
                    locker: &mut self.vesting,
                    events: &mut self.events,
                    now,
                };
                self.keeper.payout(
                    *claim_type,
                    owner,
                    &Selection::new(denom.as_str(), *multiplier),
                    &mut ctx,
                )?;
            }
            Action::UpdateParams { params } => {
                self.keeper.set_params(params.clone())?;
                info!("params updated");
            }
        }
        Ok(())
    }
}

/// Replays `scenario` against `store`. Each step first accumulates every
/// configured period up to the step time, then applies its actions in
/// order. Refused actions are collected in `failures`; broken invariants
/// stop the run.
pub fn run_scenario<S: Store>(
    scenario: &Scenario,
    store: S,
) -> Result<ScenarioOutcome<S>, ScenarioError> {
    scenario.params.validate()?;
    let mut host = Host {
        keeper: Keeper::new(store, scenario.params.clone()),
        ledger: ShareLedger::new(),
        vesting: match &scenario.reward_pool {
            Some(pool) => VestingLedger::with_pool(pool.clone()),
            None => VestingLedger::new(),
        },
        events: EventLog::new(),
    };
    let mut failures = Vec::new();
    let mut last_time: Option<OffsetDateTime> = None;

    for (step_index, step) in scenario.steps.iter().enumerate() {
        if last_time.is_some_and(|prev| step.time < prev) {
            return Err(ScenarioError::OutOfOrder {
                step: step_index,
                time: step.time,
            });
        }
        last_time = Some(step.time);

        for ct in ClaimType::ALL {
            host.keeper
                .accumulate_all(ct, &host.ledger.view(ct), step.time)
                .map_err(|source| ScenarioError::Halted {
                    step: step_index,
                    source,
                })?;
        }

        for (action_index, action) in step.actions.iter().enumerate() {
            match host.apply(action, step.time) {
                Ok(()) => {}
                Err(ActionError::Rejected(reason)) => {
                    warn!(step = step_index, action = action_index, %reason, "action rejected");
                    failures.push(ActionFailure {
                        step: step_index,
                        action: action_index,
                        reason,
                    });
                }
                Err(ActionError::Halt(source)) => {
                    return Err(ScenarioError::Halted {
                        step: step_index,
                        source,
                    });
                }
            }
        }
        info!(step = step_index, time = %step.time, actions = step.actions.len(), "step applied");
    }

    Ok(ScenarioOutcome {
        keeper: host.keeper,
        ledger: host.ledger,
        vesting: host.vesting,
        events: host.events,
        failures,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::{MultiRewardPeriod, Multiplier, MultipliersPerDenom};
    use time::macros::datetime;
    use time::Duration;

    fn params() -> Params {
        let mut params = Params {
            claim_multipliers: vec![MultipliersPerDenom {
                denom: "hard".to_string(),
                multipliers: vec![Multiplier::new(MultiplierName::Large, 12, Dec::one())],
            }],
            claim_end: datetime!(2026-01-01 0:00 UTC),
            ..Params::default()
        };
        params.reward_periods.insert(
            ClaimType::Supply,
            vec![MultiRewardPeriod::new(
                "btc",
                datetime!(2024-01-01 0:00 UTC),
                datetime!(2025-01-01 0:00 UTC),
                [("hard", 1000u128)].into_iter().collect(),
            )],
        );
        params
    }

    fn deposit(owner: &str, amount: u128) -> Action {
        Action::Deposit {
            claim_type: ClaimType::Supply,
            owner: owner.to_string(),
            source_id: "btc".to_string(),
            amount: Dec::from_int(amount),
        }
    }

    #[test]
    fn steps_must_be_ordered() {
        let t0 = datetime!(2024-01-01 0:00 UTC);
        let scenario = Scenario {
            params: params(),
            reward_pool: None,
            steps: vec![
                Step { time: t0, actions: vec![] },
                Step { time: t0 - Duration::seconds(1), actions: vec![] },
            ],
        };
        let err = run_scenario(&scenario, MemoryStore::new()).err().unwrap();
        assert!(matches!(err, ScenarioError::OutOfOrder { step: 1, .. }));
    }

    #[test]
    fn refused_actions_do_not_stop_the_run() {
        let t0 = datetime!(2024-01-01 0:00 UTC);
        let scenario = Scenario {
            params: params(),
            reward_pool: None,
            steps: vec![
                Step { time: t0, actions: vec![deposit("alice", 100)] },
                Step {
                    time: t0 + Duration::seconds(10),
                    actions: vec![
                        Action::Withdraw {
                            claim_type: ClaimType::Supply,
                            owner: "alice".to_string(),
                            source_id: "btc".to_string(),
                            amount: Dec::from_int(101),
                        },
                        Action::Claim {
                            claim_type: ClaimType::Supply,
                            owner: "alice".to_string(),
                            denom: "hard".to_string(),
                            multiplier: MultiplierName::Large,
                        },
                    ],
                },
            ],
        };
        let outcome = run_scenario(&scenario, MemoryStore::new()).unwrap();
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].action, 0);
        assert_eq!(outcome.vesting.entries().len(), 1);
        assert_eq!(outcome.vesting.entries()[0].amount, 10_000);
    }

    #[test]
    fn second_depositor_does_not_earn_past_rewards() {
        let t0 = datetime!(2024-01-01 0:00 UTC);
        let scenario = Scenario {
            params: params(),
            reward_pool: None,
            steps: vec![
                Step { time: t0, actions: vec![deposit("alice", 100)] },
                Step { time: t0 + Duration::seconds(10), actions: vec![deposit("bob", 100)] },
                Step { time: t0 + Duration::seconds(20), actions: vec![deposit("alice", 1)] },
            ],
        };
        let outcome = run_scenario(&scenario, MemoryStore::new()).unwrap();
        let alice = outcome.keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        // 10s alone at 1000/s plus 10s at half share
        assert_eq!(alice.reward.amount_of("hard"), 15_000);
        let bob = outcome.keeper.claim(ClaimType::Supply, "bob").unwrap().unwrap();
        assert!(bob.reward.is_empty());
    }
}
