use crate::cycle::CycleId;
use crate::shared::entity::ID;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The (reminder, cycle) pair has been reserved by one scheduler
    /// instance but delivery has not completed yet.
    Claimed,
    /// Delivery completed (or terminally failed on a dead target); the pair
    /// will never be dispatched again.
    Dispatched,
}

impl Display for DispatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DispatchStatus::Claimed => "claimed",
            DispatchStatus::Dispatched => "dispatched",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum InvalidDispatchStatusError {
    #[error("Dispatch status: {0} is not known")]
    Unknown(String),
}

impl FromStr for DispatchStatus {
    type Err = InvalidDispatchStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claimed" => Ok(DispatchStatus::Claimed),
            "dispatched" => Ok(DispatchStatus::Dispatched),
            _ => Err(InvalidDispatchStatusError::Unknown(s.to_string())),
        }
    }
}

/// One row of the dispatch ledger. The composite key `(reminder_id,
/// cycle_id)` is unique at the storage layer; that uniqueness is the sole
/// mechanism preventing duplicate notifications when several scheduler
/// instances evaluate the same pair concurrently.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchRecord {
    pub reminder_id: ID,
    pub cycle_id: CycleId,
    pub status: DispatchStatus,
    pub claimed_at: i64,
    pub dispatched_at: Option<i64>,
}
