//! Vesting ledger and event log used as payout collaborators.

use crate::keeper::{EventSink, LockError, Lockup, TimeLocker};
use crate::math::{serde_amount, Coins, MathError};
use crate::types::Event;
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

/// A locked transfer recorded by [`VestingLedger`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VestingEntry {
    pub recipient: String,
    pub denom: String,
    #[serde(with = "serde_amount")]
    pub amount: u128,
    pub lockup_seconds: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub locked_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub unlocks_at: OffsetDateTime,
}

/// Records locked transfers. With a pool set, transfers draw it down and
/// fail once it runs dry.
#[derive(Clone, Debug, Default)]
pub struct VestingLedger {
    entries: Vec<VestingEntry>,
    pool: Option<Coins>,
}

impl VestingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pool(pool: Coins) -> Self {
        Self {
            entries: Vec::new(),
            pool: Some(pool),
        }
    }

    pub fn entries(&self) -> &[VestingEntry] {
        &self.entries
    }

    /// Everything locked for `recipient`, by denom.
    pub fn total_for(&self, recipient: &str) -> Result<Coins, MathError> {
        let mut total = Coins::new();
        for e in self.entries.iter().filter(|e| e.recipient == recipient) {
            total.add(&e.denom, e.amount)?;
        }
        Ok(total)
    }
}

impl TimeLocker for VestingLedger {
    fn lock(
        &mut self,
        recipient: &str,
        lockups: &[Lockup],
        now: OffsetDateTime,
    ) -> Result<(), LockError> {
        if recipient.trim().is_empty() {
            return Err(LockError::InvalidRecipient(recipient.to_string()));
        }
        if let Some(pool) = &mut self.pool {
            let mut remaining = pool.clone();
            for (denom, needed) in lockups.iter().flat_map(|l| l.amount.iter()) {
                let available = remaining.amount_of(denom);
                remaining
                    .checked_sub(denom, needed)
                    .map_err(|_| LockError::InsufficientFunds {
                        denom: denom.to_string(),
                        needed,
                        available,
                    })?;
            }
            *pool = remaining;
        }
        for lockup in lockups {
            let unlocks_at = now.saturating_add(Duration::seconds(lockup.lockup_seconds));
            for (denom, value) in lockup.amount.iter() {
                self.entries.push(VestingEntry {
                    recipient: recipient.to_string(),
                    denom: denom.to_string(),
                    amount: value,
                    lockup_seconds: lockup.lockup_seconds,
                    locked_at: now,
                    unlocks_at,
                });
            }
        }
        Ok(())
    }
}

/// Events in emission order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl EventSink for EventLog {
    fn emit(&mut self, event: Event) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn lockup(denom: &str, amount: u128, lockup_seconds: i64) -> Lockup {
        Lockup {
            amount: [(denom, amount)].into_iter().collect(),
            lockup_seconds,
        }
    }

    #[test]
    fn pool_limits_transfers() {
        let mut ledger = VestingLedger::with_pool([("hard", 100u128)].into_iter().collect());
        let now = datetime!(2024-01-01 0:00 UTC);
        ledger.lock("alice", &[lockup("hard", 60, 86_400)], now).unwrap();
        let err = ledger
            .lock("bob", &[lockup("hard", 60, 86_400)], now)
            .unwrap_err();
        assert!(matches!(err, LockError::InsufficientFunds { available: 40, .. }));
        assert_eq!(ledger.entries().len(), 1);
        assert_eq!(ledger.entries()[0].unlocks_at, datetime!(2024-01-02 0:00 UTC));
        assert_eq!(ledger.total_for("alice").unwrap().amount_of("hard"), 60);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let mut ledger = VestingLedger::with_pool([("hard", 100u128)].into_iter().collect());
        let now = datetime!(2024-01-01 0:00 UTC);
        let batch = [lockup("hard", 50, 0), lockup("hard", 60, 86_400)];
        assert!(ledger.lock("alice", &batch, now).is_err());
        assert!(ledger.entries().is_empty());

        let batch = [lockup("hard", 50, 0), lockup("hard", 50, 86_400)];
        ledger.lock("alice", &batch, now).unwrap();
        assert_eq!(ledger.entries().len(), 2);
        assert_eq!(ledger.entries()[0].unlocks_at, now);
        assert_eq!(ledger.total_for("alice").unwrap().amount_of("hard"), 100);
    }

    #[test]
    fn blank_recipient_rejected() {
        let mut ledger = VestingLedger::new();
        assert!(ledger
            .lock("", &[lockup("hard", 1, 0)], datetime!(2024-01-01 0:00 UTC))
            .is_err());
    }
}
