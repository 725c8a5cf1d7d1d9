//! In-memory store backed by ordered maps.

use super::{Store, StoreError};
use crate::types::{AccumulatorState, Claim, ClaimType};
use std::collections::BTreeMap;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    accumulators: BTreeMap<(ClaimType, String), AccumulatorState>,
    claims: BTreeMap<(ClaimType, String), Claim>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn accumulator(
        &self,
        claim_type: ClaimType,
        source_id: &str,
    ) -> Result<Option<AccumulatorState>, StoreError> {
        Ok(self
            .accumulators
            .get(&(claim_type, source_id.to_string()))
            .cloned())
    }

    fn set_accumulator(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        state: &AccumulatorState,
    ) -> Result<(), StoreError> {
        self.accumulators
            .insert((claim_type, source_id.to_string()), state.clone());
        Ok(())
    }

    fn accumulators(
        &self,
        claim_type: ClaimType,
    ) -> Result<Vec<(String, AccumulatorState)>, StoreError> {
        Ok(self
            .accumulators
            .iter()
            .filter(|((ct, _), _)| *ct == claim_type)
            .map(|((_, source), state)| (source.clone(), state.clone()))
            .collect())
    }

    fn claim(&self, claim_type: ClaimType, owner: &str) -> Result<Option<Claim>, StoreError> {
        Ok(self.claims.get(&(claim_type, owner.to_string())).cloned())
    }

    fn set_claim(&mut self, claim: &Claim) -> Result<(), StoreError> {
        self.claims
            .insert((claim.claim_type, claim.owner.clone()), claim.clone());
        Ok(())
    }

    fn claims(&self, claim_type: ClaimType) -> Result<Vec<Claim>, StoreError> {
        Ok(self
            .claims
            .iter()
            .filter(|((ct, _), _)| *ct == claim_type)
            .map(|(_, claim)| claim.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn listings_are_scoped_by_claim_type() {
        let mut store = MemoryStore::new();
        let state = AccumulatorState::seeded(datetime!(2024-01-01 0:00 UTC));
        store.set_accumulator(ClaimType::Supply, "btc", &state).unwrap();
        store.set_accumulator(ClaimType::Borrow, "btc", &state).unwrap();
        store.set_accumulator(ClaimType::Supply, "atom", &state).unwrap();
        let supply = store.accumulators(ClaimType::Supply).unwrap();
        let sources: Vec<_> = supply.iter().map(|(s, _)| s.as_str()).collect();
        assert_eq!(sources, vec!["atom", "btc"]);

        store.set_claim(&Claim::new(ClaimType::Swap, "alice")).unwrap();
        assert!(store.claim(ClaimType::Swap, "alice").unwrap().is_some());
        assert!(store.claim(ClaimType::Earn, "alice").unwrap().is_none());
        assert_eq!(store.claims(ClaimType::Swap).unwrap().len(), 1);
        assert!(store.claims(ClaimType::Earn).unwrap().is_empty());
    }
}
