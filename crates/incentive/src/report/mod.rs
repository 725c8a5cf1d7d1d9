//! Report data structure (HTML is generated in the incentive_report crate).

use crate::verify::StateSnapshot;
use serde::{Deserialize, Serialize};

/// Data passed to the HTML report generator: snapshot + reproducibility hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportData {
    pub snapshot: StateSnapshot,
    pub reproducibility_hash_sha256: String,
}
