//! Sorted multiset of integer token amounts keyed by denom.

use super::dec::MathError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Token amounts keyed by denom. Zero entries are never stored.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coins(BTreeMap<String, u128>);

impl Coins {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0.get(denom).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u128)> + '_ {
        self.0.iter().map(|(d, a)| (d.as_str(), *a))
    }

    pub fn denoms(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.keys().map(String::as_str)
    }

    pub fn add(&mut self, denom: &str, amount: u128) -> Result<(), MathError> {
        if amount == 0 {
            return Ok(());
        }
        let slot = self.0.entry(denom.to_string()).or_insert(0);
        *slot = slot.checked_add(amount).ok_or(MathError::Overflow)?;
        Ok(())
    }

    pub fn add_all(&mut self, other: &Coins) -> Result<(), MathError> {
        for (denom, amount) in other.iter() {
            self.add(denom, amount)?;
        }
        Ok(())
    }

    /// Subtracts `amount` of `denom`; fails without modifying anything when
    /// the balance is too small.
    pub fn checked_sub(&mut self, denom: &str, amount: u128) -> Result<(), MathError> {
        if amount == 0 {
            return Ok(());
        }
        let held = self.amount_of(denom);
        let left = held.checked_sub(amount).ok_or(MathError::Overflow)?;
        if left == 0 {
            self.0.remove(denom);
        } else {
            self.0.insert(denom.to_string(), left);
        }
        Ok(())
    }
}

impl<S: Into<String>> FromIterator<(S, u128)> for Coins {
    fn from_iter<I: IntoIterator<Item = (S, u128)>>(iter: I) -> Self {
        let mut map: BTreeMap<String, u128> = BTreeMap::new();
        for (denom, amount) in iter {
            if amount > 0 {
                let slot = map.entry(denom.into()).or_insert(0);
                *slot = slot.saturating_add(amount);
            }
        }
        Self(map)
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (denom, amount) in self.iter() {
            if !first {
                f.write_str(",")?;
            }
            write!(f, "{amount}{denom}")?;
            first = false;
        }
        Ok(())
    }
}

// Amounts travel as decimal strings so they survive JSON readers limited
// to 64-bit numbers.
impl Serialize for Coins {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (denom, amount) in &self.0 {
            map.serialize_entry(denom, &amount.to_string())?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Coins {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut coins = Coins::new();
        for (denom, amount) in raw {
            if denom.trim().is_empty() {
                return Err(serde::de::Error::custom("blank denom"));
            }
            let parsed: u128 = amount.parse().map_err(serde::de::Error::custom)?;
            coins.add(&denom, parsed).map_err(serde::de::Error::custom)?;
        }
        Ok(coins)
    }
}

/// `#[serde(with = "serde_amount")]` for single `u128` amounts.
pub mod serde_amount {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(amount: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(amount)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
