//! Claim multipliers: payout factor traded against a vesting lockup.

use crate::math::Dec;
use crate::types::params::ParamsError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use time::{Date, Duration, Month, OffsetDateTime};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiplierName {
    Small,
    Medium,
    Large,
}

impl MultiplierName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiplierName::Small => "small",
            MultiplierName::Medium => "medium",
            MultiplierName::Large => "large",
        }
    }
}

impl fmt::Display for MultiplierName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MultiplierName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "small" => Ok(MultiplierName::Small),
            "medium" => Ok(MultiplierName::Medium),
            "large" => Ok(MultiplierName::Large),
            other => Err(format!("unknown multiplier {other:?}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Multiplier {
    pub name: MultiplierName,
    pub months_lockup: u32,
    pub factor: Dec,
}

impl Multiplier {
    pub fn new(name: MultiplierName, months_lockup: u32, factor: Dec) -> Self {
        Self {
            name,
            months_lockup,
            factor,
        }
    }

    /// Length in seconds of a lockup that starts at `now` and ends the same
    /// day-of-month `months_lockup` months later.
    pub fn lockup_seconds(&self, now: OffsetDateTime) -> Result<i64, ParamsError> {
        let until = add_months(now, self.months_lockup).ok_or(ParamsError::LockupOutOfRange {
            months: self.months_lockup,
        })?;
        Ok((until - now).whole_seconds())
    }
}

/// Calendar month addition. Days past the end of the target month roll
/// into the next one, so Jan 31 + 1 month is Mar 2 (or Mar 3 in a common
/// year).
pub fn add_months(at: OffsetDateTime, months: u32) -> Option<OffsetDateTime> {
    let date = at.date();
    let index = i64::from(date.year()) * 12 + i64::from(u8::from(date.month())) - 1 + i64::from(months);
    let year = i32::try_from(index.div_euclid(12)).ok()?;
    let month = Month::try_from(u8::try_from(index.rem_euclid(12) + 1).ok()?).ok()?;
    let first = Date::from_calendar_date(year, month, 1).ok()?;
    let shifted = first.checked_add(Duration::days(i64::from(date.day()) - 1))?;
    Some(at.replace_date(shifted))
}

/// Multipliers offered when claiming one reward denom.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultipliersPerDenom {
    pub denom: String,
    pub multipliers: Vec<Multiplier>,
}

impl MultipliersPerDenom {
    pub fn get(&self, name: MultiplierName) -> Option<&Multiplier> {
        self.multipliers.iter().find(|m| m.name == name)
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.denom.trim().is_empty() {
            return Err(ParamsError::InvalidMultiplier {
                denom: self.denom.clone(),
                reason: "denom cannot be blank".to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        for m in &self.multipliers {
            if !seen.insert(m.name) {
                return Err(ParamsError::InvalidMultiplier {
                    denom: self.denom.clone(),
                    reason: format!("duplicate multiplier {}", m.name),
                });
            }
        }
        Ok(())
    }
}
