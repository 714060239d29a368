mod inmemory;
mod postgres;

pub use inmemory::InMemoryDispatchRecordRepo;
pub use postgres::PostgresDispatchRecordRepo;
use warden_domain::{CycleId, DispatchRecord, ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimOutcome {
    Claimed,
    /// Another evaluator holds or held the pair. Expected race outcome, not
    /// an error; the loser simply skips.
    AlreadyClaimed,
}

/// The dedupe ledger. `try_claim` is a single conditional insert against
/// the unique composite key `(reminder_id, cycle_id)`; under any number of
/// concurrently racing scheduler instances exactly one claim succeeds. The
/// uniqueness guarantee lives in the storage layer, never in application
/// logic.
#[async_trait::async_trait]
pub trait IDispatchRecordRepo: Send + Sync {
    async fn try_claim(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        now: i64,
    ) -> anyhow::Result<ClaimOutcome>;
    /// Mark a held claim as dispatched. The pair is terminal afterwards.
    async fn commit(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        dispatched_at: i64,
    ) -> anyhow::Result<()>;
    /// Roll back an uncommitted claim so the next tick can retry the pair.
    async fn release(&self, reminder_id: &ID, cycle_id: &CycleId) -> anyhow::Result<()>;
    /// Release claims that were never committed and are older than the
    /// grace period: their holder crashed mid-dispatch.
    async fn release_abandoned_before(
        &self,
        claimed_before: i64,
    ) -> anyhow::Result<Vec<DispatchRecord>>;
    async fn find(&self, reminder_id: &ID, cycle_id: &CycleId) -> Option<DispatchRecord>;
    /// Prune committed records older than any plausible cycle. Not needed
    /// for correctness, only to keep the ledger small.
    async fn delete_all_before(&self, dispatched_before: i64) -> anyhow::Result<u64>;
}
