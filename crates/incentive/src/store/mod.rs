//! Persistence for accumulators and claims.

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::types::{AccumulatorState, Claim, ClaimType};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Keyed storage for global accumulators `(claim type, source)` and claims
/// `(claim type, owner)`. Listings come back ordered by key.
pub trait Store {
    fn accumulator(
        &self,
        claim_type: ClaimType,
        source_id: &str,
    ) -> Result<Option<AccumulatorState>, StoreError>;

    fn set_accumulator(
        &mut self,
        claim_type: ClaimType,
        source_id: &str,
        state: &AccumulatorState,
    ) -> Result<(), StoreError>;

    fn accumulators(
        &self,
        claim_type: ClaimType,
    ) -> Result<Vec<(String, AccumulatorState)>, StoreError>;

    fn claim(&self, claim_type: ClaimType, owner: &str) -> Result<Option<Claim>, StoreError>;

    fn set_claim(&mut self, claim: &Claim) -> Result<(), StoreError>;

    fn claims(&self, claim_type: ClaimType) -> Result<Vec<Claim>, StoreError>;
}
