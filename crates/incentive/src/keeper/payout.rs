//! Claim payout: apply a multiplier, hand the result to a time-locked transfer, zero the balance.

use super::{IncentiveError, Keeper, SourceShares};
use crate::math::{Coins, Dec};
use crate::store::Store;
use crate::types::{ClaimType, Event, MultiplierName};
use std::collections::BTreeSet;
use thiserror::Error;
use time::OffsetDateTime;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    #[error("recipient {0:?} cannot receive locked funds")]
    InvalidRecipient(String),
    #[error("reward pool holds too little {denom} (needs {needed}, has {available})")]
    InsufficientFunds {
        denom: String,
        needed: u128,
        available: u128,
    },
}

/// Coins that unlock together after `lockup_seconds`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lockup {
    pub amount: Coins,
    pub lockup_seconds: i64,
}

/// Transfers funds that vest after a lockup.
pub trait TimeLocker {
    /// Locks every tranche or none of them.
    fn lock(
        &mut self,
        recipient: &str,
        lockups: &[Lockup],
        now: OffsetDateTime,
    ) -> Result<(), LockError>;
}

pub trait EventSink {
    fn emit(&mut self, event: Event);
}

/// One denom to claim and the multiplier to claim it with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub denom: String,
    pub multiplier: MultiplierName,
}

impl Selection {
    pub fn new(denom: impl Into<String>, multiplier: MultiplierName) -> Self {
        Self {
            denom: denom.into(),
            multiplier,
        }
    }
}

/// Collaborators a payout talks to.
pub struct PayoutContext<'a> {
    pub shares: &'a dyn SourceShares,
    pub locker: &'a mut dyn TimeLocker,
    pub events: &'a mut dyn EventSink,
    pub now: OffsetDateTime,
}

struct Planned {
    denom: String,
    balance: u128,
    amount: u128,
    lockup_seconds: i64,
}

impl<S: Store> Keeper<S> {
    /// Claims one denom. Returns the amount handed to the locker.
    pub fn payout(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        selection: &Selection,
        ctx: &mut PayoutContext<'_>,
    ) -> Result<u128, IncentiveError> {
        let paid = self.payout_selections(claim_type, owner, std::slice::from_ref(selection), ctx)?;
        Ok(paid.amount_of(&selection.denom))
    }

    /// Claims several denoms at once, each with its own multiplier. Every
    /// selection must pay out something. All tranches are locked in one
    /// call; if any part is rejected no funds move and the claim keeps its
    /// balances.
    pub fn payout_selections(
        &mut self,
        claim_type: ClaimType,
        owner: &str,
        selections: &[Selection],
        ctx: &mut PayoutContext<'_>,
    ) -> Result<Coins, IncentiveError> {
        if self.store.claim(claim_type, owner)?.is_none() {
            return Err(IncentiveError::ClaimNotFound {
                claim_type,
                owner: owner.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        let mut multipliers = Vec::with_capacity(selections.len());
        for selection in selections {
            if !seen.insert(selection.denom.as_str()) {
                return Err(IncentiveError::DuplicateSelection {
                    denom: selection.denom.clone(),
                });
            }
            let multiplier = self
                .params
                .multiplier(&selection.denom, selection.multiplier)
                .cloned()
                .ok_or_else(|| IncentiveError::InvalidMultiplier {
                    denom: selection.denom.clone(),
                    name: selection.multiplier,
                })?;
            multipliers.push(multiplier);
        }
        if ctx.now > self.params.claim_end {
            return Err(IncentiveError::ClaimExpired {
                now: ctx.now,
                claim_end: self.params.claim_end,
            });
        }

        let Some(mut claim) = self.synchronize_claim(claim_type, owner, ctx.shares)? else {
            return Err(IncentiveError::ClaimNotFound {
                claim_type,
                owner: owner.to_string(),
            });
        };

        let mut planned = Vec::with_capacity(selections.len());
        for (selection, multiplier) in selections.iter().zip(&multipliers) {
            let balance = claim.reward.amount_of(&selection.denom);
            let amount = Dec::from_int(balance).mul(&multiplier.factor)?.round_int()?;
            if amount == 0 {
                return Err(IncentiveError::ZeroClaim {
                    denom: selection.denom.clone(),
                });
            }
            planned.push(Planned {
                denom: selection.denom.clone(),
                balance,
                amount,
                lockup_seconds: multiplier.lockup_seconds(ctx.now)?,
            });
        }

        let mut remaining = claim.reward.clone();
        let mut paid = Coins::new();
        let mut lockups = Vec::with_capacity(planned.len());
        for p in &planned {
            remaining.checked_sub(&p.denom, p.balance)?;
            paid.add(&p.denom, p.amount)?;
            lockups.push(Lockup {
                amount: [(p.denom.as_str(), p.amount)].into_iter().collect(),
                lockup_seconds: p.lockup_seconds,
            });
        }
        ctx.locker.lock(owner, &lockups, ctx.now)?;
        claim.reward = remaining;
        self.store.set_claim(&claim)?;

        for lockup in lockups {
            info!(
                %claim_type,
                owner,
                amount = %lockup.amount,
                lockup_seconds = lockup.lockup_seconds,
                "claim paid"
            );
            ctx.events.emit(Event::claim_paid(
                claim_type,
                owner,
                lockup.amount,
                lockup.lockup_seconds,
                ctx.now,
            ));
        }
        Ok(paid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keeper::test_support::FixedShares;
    use crate::sim::VestingLedger;
    use crate::store::MemoryStore;
    use crate::types::{
        AccumulatorState, Claim, EventKind, Multiplier, MultipliersPerDenom, Params, RewardIndexes,
    };
    use time::macros::datetime;

    #[derive(Default)]
    struct Locks(Vec<(String, Coins, i64)>);

    impl TimeLocker for Locks {
        fn lock(
            &mut self,
            recipient: &str,
            lockups: &[Lockup],
            _now: OffsetDateTime,
        ) -> Result<(), LockError> {
            for l in lockups {
                self.0
                    .push((recipient.to_string(), l.amount.clone(), l.lockup_seconds));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct Events(Vec<Event>);

    impl EventSink for Events {
        fn emit(&mut self, event: Event) {
            self.0.push(event);
        }
    }

    fn params() -> Params {
        Params {
            claim_multipliers: vec![
                MultipliersPerDenom {
                    denom: "hard".to_string(),
                    multipliers: vec![
                        Multiplier::new(MultiplierName::Small, 1, "0.2".parse().unwrap()),
                        Multiplier::new(MultiplierName::Large, 12, Dec::one()),
                    ],
                },
                MultipliersPerDenom {
                    denom: "swp".to_string(),
                    multipliers: vec![
                        Multiplier::new(MultiplierName::Small, 1, "0.2".parse().unwrap()),
                        Multiplier::new(MultiplierName::Medium, 6, "0.5".parse().unwrap()),
                    ],
                },
                MultipliersPerDenom {
                    denom: "ukava".to_string(),
                    multipliers: vec![Multiplier::new(
                        MultiplierName::Small,
                        1,
                        "0.2".parse().unwrap(),
                    )],
                },
            ],
            claim_end: datetime!(2026-01-01 0:00 UTC),
            ..Params::default()
        }
    }

    fn keeper_with_claim(balance: u128) -> Keeper<MemoryStore> {
        keeper_with_rewards(&[("hard", balance)])
    }

    fn keeper_with_rewards(rewards: &[(&str, u128)]) -> Keeper<MemoryStore> {
        let mut keeper = Keeper::new(MemoryStore::new(), params());
        let mut claim = Claim::new(ClaimType::Supply, "alice");
        for (denom, amount) in rewards {
            claim.reward.add(denom, *amount).unwrap();
        }
        keeper.store.set_claim(&claim).unwrap();
        keeper
    }

    #[test]
    fn full_factor_pays_balance_and_zeroes_it() {
        let mut keeper = keeper_with_claim(7_000_000);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let now = datetime!(2024-01-01 0:00 UTC);
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now,
        };
        let paid = keeper
            .payout(ClaimType::Supply, "alice", &Selection::new("hard", MultiplierName::Large), &mut ctx)
            .unwrap();
        assert_eq!(paid, 7_000_000);
        assert_eq!(locks.0.len(), 1);
        assert_eq!(locks.0[0].1.amount_of("hard"), 7_000_000);
        assert_eq!(locks.0[0].2, 366 * 86_400);
        assert_eq!(events.0.len(), 1);
        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert_eq!(claim.reward.amount_of("hard"), 0);
    }

    #[test]
    fn partial_factor_forfeits_remainder() {
        let mut keeper = keeper_with_claim(5000);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let paid = keeper
            .payout(ClaimType::Supply, "alice", &Selection::new("hard", MultiplierName::Small), &mut ctx)
            .unwrap();
        assert_eq!(paid, 1000);
        assert_eq!(locks.0[0].2, 31 * 86_400);
        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert!(claim.reward.is_empty());
    }

    #[test]
    fn rejections_checked_in_order() {
        let mut keeper = keeper_with_claim(10);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2027-01-01 0:00 UTC),
        };
        let missing = keeper.payout(
            ClaimType::Borrow,
            "alice",
            &Selection::new("hard", MultiplierName::Small),
            &mut ctx,
        );
        assert!(matches!(missing, Err(IncentiveError::ClaimNotFound { .. })));
        let no_mult = keeper.payout(
            ClaimType::Supply,
            "alice",
            &Selection::new("hard", MultiplierName::Medium),
            &mut ctx,
        );
        assert!(matches!(no_mult, Err(IncentiveError::InvalidMultiplier { .. })));
        let expired = keeper.payout(
            ClaimType::Supply,
            "alice",
            &Selection::new("hard", MultiplierName::Small),
            &mut ctx,
        );
        assert!(matches!(expired, Err(IncentiveError::ClaimExpired { .. })));
        assert!(locks.0.is_empty());
    }

    #[test]
    fn zero_payout_rejected_and_balance_kept() {
        let mut keeper = keeper_with_claim(2);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        // 2 * 0.2 = 0.4 rounds to zero
        let err = keeper
            .payout(ClaimType::Supply, "alice", &Selection::new("hard", MultiplierName::Small), &mut ctx)
            .unwrap_err();
        assert!(matches!(err, IncentiveError::ZeroClaim { .. }));
        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert_eq!(claim.reward.amount_of("hard"), 2);
    }

    #[test]
    fn payout_synchronizes_before_paying() {
        let mut keeper = keeper_with_claim(0);
        let state = AccumulatorState {
            previous_accrual_time: datetime!(2024-01-01 0:00 UTC),
            indexes: RewardIndexes::new().with("hard", Dec::from_int(4)),
        };
        keeper.store.set_accumulator(ClaimType::Supply, "btc", &state).unwrap();
        let shares = FixedShares::default().with("alice", "btc", 25);
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let paid = keeper
            .payout(ClaimType::Supply, "alice", &Selection::new("hard", MultiplierName::Large), &mut ctx)
            .unwrap();
        assert_eq!(paid, 100);
    }

    #[test]
    fn duplicate_denom_selection_rejected() {
        let mut keeper = keeper_with_claim(100);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let selections = [
            Selection::new("hard", MultiplierName::Small),
            Selection::new("hard", MultiplierName::Large),
        ];
        let err = keeper
            .payout_selections(ClaimType::Supply, "alice", &selections, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, IncentiveError::DuplicateSelection { .. }));
    }

    #[test]
    fn two_denoms_lock_separately_and_clear_claim() {
        let mut keeper = keeper_with_rewards(&[("hard", 100), ("swp", 100), ("ukava", 7)]);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let selections = [
            Selection::new("hard", MultiplierName::Large),
            Selection::new("swp", MultiplierName::Medium),
        ];
        let paid = keeper
            .payout_selections(ClaimType::Supply, "alice", &selections, &mut ctx)
            .unwrap();
        assert_eq!(paid.to_string(), "100hard,50swp");

        assert_eq!(locks.0.len(), 2);
        assert_eq!(locks.0[0].1.amount_of("hard"), 100);
        assert_eq!(locks.0[0].2, 366 * 86_400);
        assert_eq!(locks.0[1].1.amount_of("swp"), 50);
        assert_eq!(locks.0[1].2, 182 * 86_400);

        assert_eq!(events.0.len(), 2);
        assert!(events
            .0
            .iter()
            .all(|e| matches!(&e.kind, EventKind::ClaimPaid { owner, .. } if owner == "alice")));

        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert_eq!(claim.reward.to_string(), "7ukava");
    }

    #[test]
    fn one_zero_selection_rejects_whole_claim() {
        let mut keeper = keeper_with_rewards(&[("hard", 100), ("ukava", 2)]);
        let shares = FixedShares::default();
        let (mut locks, mut events) = (Locks::default(), Events::default());
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut locks,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let selections = [
            Selection::new("hard", MultiplierName::Large),
            Selection::new("ukava", MultiplierName::Small),
        ];
        let err = keeper
            .payout_selections(ClaimType::Supply, "alice", &selections, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, IncentiveError::ZeroClaim { ref denom } if denom == "ukava"));
        assert!(locks.0.is_empty());
        assert!(events.0.is_empty());
        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert_eq!(claim.reward.amount_of("hard"), 100);
        assert_eq!(claim.reward.amount_of("ukava"), 2);
    }

    #[test]
    fn failed_lock_leaves_pool_and_claim_untouched() {
        let mut keeper = keeper_with_rewards(&[("hard", 100), ("swp", 100)]);
        let shares = FixedShares::default();
        let mut vesting = VestingLedger::with_pool([("hard", 1000u128)].into_iter().collect());
        let mut events = Events::default();
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut vesting,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let selections = [
            Selection::new("hard", MultiplierName::Small),
            Selection::new("swp", MultiplierName::Small),
        ];
        let err = keeper
            .payout_selections(ClaimType::Supply, "alice", &selections, &mut ctx)
            .unwrap_err();
        assert!(matches!(
            err,
            IncentiveError::Lock(LockError::InsufficientFunds { ref denom, .. }) if denom == "swp"
        ));
        assert!(vesting.entries().is_empty());
        assert!(events.0.is_empty());
        let claim = keeper.claim(ClaimType::Supply, "alice").unwrap().unwrap();
        assert_eq!(claim.reward.amount_of("hard"), 100);
        assert_eq!(claim.reward.amount_of("swp"), 100);

        // the pool is intact, so hard alone still pays out in full
        let mut ctx = PayoutContext {
            shares: &shares,
            locker: &mut vesting,
            events: &mut events,
            now: datetime!(2024-01-01 0:00 UTC),
        };
        let paid = keeper
            .payout(ClaimType::Supply, "alice", &Selection::new("hard", MultiplierName::Large), &mut ctx)
            .unwrap();
        assert_eq!(paid, 100);
        assert_eq!(vesting.entries().len(), 1);
    }
}
