//! Events emitted by state transitions that move funds.

use crate::math::Coins;
use crate::types::claim::ClaimType;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventKind {
    ClaimPaid {
        claim_type: ClaimType,
        owner: String,
        amount: Coins,
        lockup_seconds: i64,
    },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Event {
    pub kind: EventKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl Event {
    pub fn claim_paid(
        claim_type: ClaimType,
        owner: &str,
        amount: Coins,
        lockup_seconds: i64,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            kind: EventKind::ClaimPaid {
                claim_type,
                owner: owner.to_string(),
                amount,
                lockup_seconds,
            },
            timestamp,
        }
    }
}
