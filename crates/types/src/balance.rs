use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time balance snapshot. Never used for arithmetic -- it is
/// overwritten wholesale by each refresh, never incremented or decremented.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Balance in wei, as a decimal string.
    pub balance: String,
    /// The block height the balance was read at.
    pub block_number: u64,
    /// When this snapshot was taken.
    pub updated_at: DateTime<Utc>,
}
