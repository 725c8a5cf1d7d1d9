//! Time-bounded emission schedules for a single source.

use crate::math::Coins;
use crate::types::params::ParamsError;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Emits `rewards_per_second` to holders of `source_id` between `start`
/// and `end`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultiRewardPeriod {
    pub source_id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
    #[serde(default)]
    pub rewards_per_second: Coins,
}

impl MultiRewardPeriod {
    pub fn new(
        source_id: impl Into<String>,
        start: OffsetDateTime,
        end: OffsetDateTime,
        rewards_per_second: Coins,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            start,
            end,
            rewards_per_second,
        }
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        let invalid = |reason: &str| ParamsError::InvalidPeriod {
            source_id: self.source_id.clone(),
            reason: reason.to_string(),
        };
        if self.source_id.trim().is_empty() {
            return Err(invalid("source id cannot be blank"));
        }
        if self.start.unix_timestamp() <= 0 {
            return Err(invalid("start time must be after the unix epoch"));
        }
        if self.end.unix_timestamp() <= 0 {
            return Err(invalid("end time must be after the unix epoch"));
        }
        if self.start > self.end {
            return Err(invalid("end time cannot be before start time"));
        }
        if self.rewards_per_second.denoms().any(|d| d.trim().is_empty()) {
            return Err(invalid("reward denoms cannot be blank"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn rejects_inverted_window() {
        let p = MultiRewardPeriod::new(
            "btc",
            datetime!(2024-02-01 0:00 UTC),
            datetime!(2024-01-01 0:00 UTC),
            Coins::new(),
        );
        assert!(matches!(p.validate(), Err(ParamsError::InvalidPeriod { .. })));
    }

    #[test]
    fn rejects_epoch_start_and_blank_source() {
        let epoch = MultiRewardPeriod::new(
            "btc",
            OffsetDateTime::UNIX_EPOCH,
            datetime!(2024-01-01 0:00 UTC),
            Coins::new(),
        );
        assert!(epoch.validate().is_err());
        let blank = MultiRewardPeriod::new(
            " ",
            datetime!(2024-01-01 0:00 UTC),
            datetime!(2024-01-02 0:00 UTC),
            Coins::new(),
        );
        assert!(blank.validate().is_err());
    }

    #[test]
    fn parses_rfc3339_json() {
        let json = r#"{"source_id":"bnb","start":"2024-01-01T00:00:00Z","end":"2025-01-01T00:00:00Z","rewards_per_second":{"hard":"122354"}}"#;
        let p: MultiRewardPeriod = serde_json::from_str(json).unwrap();
        assert_eq!(p.rewards_per_second.amount_of("hard"), 122_354);
        assert!(p.validate().is_ok());
    }
}
