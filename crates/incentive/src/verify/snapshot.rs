//! Full-state snapshot and SHA-256 reproducibility hash.

use crate::keeper::Keeper;
use crate::sim::{ActionFailure, Position, ScenarioOutcome, VestingEntry};
use crate::store::{Store, StoreError};
use crate::types::{AccumulatorState, Claim, ClaimType, Event, Params, ParamsError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("serialize: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("store: {0}")]
    Store(#[from] StoreError),
    #[error("params: {0}")]
    Params(#[from] ParamsError),
    #[error("unsupported snapshot version {0}")]
    Version(u32),
    #[error("inconsistent snapshot: {0}")]
    Inconsistent(String),
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccumulatorRecord {
    pub claim_type: ClaimType,
    pub source_id: String,
    pub state: AccumulatorState,
}

/// Everything needed to rebuild and audit a ledger: params, global
/// accumulators, claims, the positions behind them, and what was paid out.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub version: u32,
    pub created_utc_rfc3339: String,
    pub params: Params,
    /// Sorted by (claim type, source).
    pub accumulators: Vec<AccumulatorRecord>,
    /// Sorted by (claim type, owner).
    pub claims: Vec<Claim>,
    #[serde(default)]
    pub positions: Vec<Position>,
    #[serde(default)]
    pub payouts: Vec<VestingEntry>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub failures: Vec<ActionFailure>,
}

const SNAPSHOT_VERSION: u32 = 1;

impl StateSnapshot {
    /// Reads params, accumulators and claims out of the keeper.
    pub fn export<S: Store>(keeper: &Keeper<S>) -> Result<Self, VerifyError> {
        let store = keeper.store();
        let mut accumulators = Vec::new();
        let mut claims = Vec::new();
        for claim_type in ClaimType::ALL {
            for (source_id, state) in store.accumulators(claim_type)? {
                accumulators.push(AccumulatorRecord {
                    claim_type,
                    source_id,
                    state,
                });
            }
            claims.extend(store.claims(claim_type)?);
        }
        let created_utc_rfc3339 = time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_default();
        Ok(Self {
            version: SNAPSHOT_VERSION,
            created_utc_rfc3339,
            params: keeper.params().clone(),
            accumulators,
            claims,
            positions: Vec::new(),
            payouts: Vec::new(),
            events: Vec::new(),
            failures: Vec::new(),
        })
    }

    /// Captures a finished scenario run, including its host-side records.
    pub fn from_outcome<S: Store>(outcome: &ScenarioOutcome<S>) -> Result<Self, VerifyError> {
        let mut snapshot = Self::export(&outcome.keeper)?;
        snapshot.positions = outcome.ledger.positions();
        snapshot.payouts = outcome.vesting.entries().to_vec();
        snapshot.events = outcome.events.events().to_vec();
        snapshot.failures = outcome.failures.clone();
        Ok(snapshot)
    }

    /// Writes accumulators and claims into `store`.
    pub fn import_into<S: Store>(&self, store: &mut S) -> Result<(), VerifyError> {
        self.validate()?;
        for record in &self.accumulators {
            store.set_accumulator(record.claim_type, &record.source_id, &record.state)?;
        }
        for claim in &self.claims {
            store.set_claim(claim)?;
        }
        Ok(())
    }

    /// Structural checks: known version, valid params, unique keys, and no
    /// claim snapshot ahead of its global index.
    pub fn validate(&self) -> Result<(), VerifyError> {
        if self.version != SNAPSHOT_VERSION {
            return Err(VerifyError::Version(self.version));
        }
        self.params.validate()?;

        let mut globals = BTreeMap::new();
        for record in &self.accumulators {
            let key = (record.claim_type, record.source_id.as_str());
            if globals.insert(key, &record.state).is_some() {
                return Err(VerifyError::Inconsistent(format!(
                    "duplicate accumulator {}/{}",
                    record.claim_type, record.source_id
                )));
            }
        }

        let mut owners = BTreeSet::new();
        for claim in &self.claims {
            if claim.owner.trim().is_empty() {
                return Err(VerifyError::Inconsistent(format!(
                    "{} claim with blank owner",
                    claim.claim_type
                )));
            }
            if !owners.insert((claim.claim_type, claim.owner.as_str())) {
                return Err(VerifyError::Inconsistent(format!(
                    "duplicate {} claim for {}",
                    claim.claim_type, claim.owner
                )));
            }
            for (source_id, snapshot) in claim.reward_indexes.iter() {
                let ahead = match globals.get(&(claim.claim_type, source_id)) {
                    Some(global) => global.indexes.check_advance(snapshot).is_err(),
                    None => !snapshot.is_empty(),
                };
                if ahead {
                    return Err(VerifyError::Inconsistent(format!(
                        "{} claim of {} is ahead of the global index for {}",
                        claim.claim_type, claim.owner, source_id
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Compact JSON of the snapshot minus its creation time. `serde_json` maps
/// are key-ordered, so equal states always serialize to the same bytes.
fn canonical_json(snapshot: &StateSnapshot) -> Result<String, VerifyError> {
    let mut value = serde_json::to_value(snapshot)?;
    if let serde_json::Value::Object(fields) = &mut value {
        fields.remove("created_utc_rfc3339");
    }
    Ok(serde_json::to_string(&value)?)
}

/// SHA-256 of [`canonical_json`], hex encoded.
pub fn reproducibility_hash(snapshot: &StateSnapshot) -> Result<String, VerifyError> {
    let digest = Sha256::digest(canonical_json(snapshot)?.as_bytes());
    Ok(hex::encode(digest))
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerificationResult {
    pub snapshot_hash: String,
    pub expected_hash: Option<String>,
    pub matches: bool,
}

/// Check a snapshot against the contents of its `.sha256` file.
pub fn verify_snapshot_hash(
    snapshot: &StateSnapshot,
    expected_hex: &str,
) -> Result<VerificationResult, VerifyError> {
    let snapshot_hash = reproducibility_hash(snapshot)?;
    let expected = expected_hex.trim().to_lowercase();
    let matches = snapshot_hash == expected;
    Ok(VerificationResult {
        snapshot_hash,
        expected_hash: Some(expected),
        matches,
    })
}
