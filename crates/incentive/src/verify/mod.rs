//! State snapshots, reproducibility hashing, and verification.

mod snapshot;

pub use snapshot::{
    reproducibility_hash, verify_snapshot_hash, AccumulatorRecord, StateSnapshot,
    VerificationResult, VerifyError,
};
