use super::{ClaimOutcome, IDispatchRecordRepo};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Mutex;
use warden_domain::{CycleId, DispatchRecord, DispatchStatus, ID};

pub struct InMemoryDispatchRecordRepo {
    records: Mutex<HashMap<(ID, CycleId), DispatchRecord>>,
}

impl InMemoryDispatchRecordRepo {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait::async_trait]
impl IDispatchRecordRepo for InMemoryDispatchRecordRepo {
    async fn try_claim(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        now: i64,
    ) -> anyhow::Result<ClaimOutcome> {
        let mut records = self.records.lock().unwrap();
        match records.entry((reminder_id.clone(), cycle_id.clone())) {
            Entry::Occupied(_) => Ok(ClaimOutcome::AlreadyClaimed),
            Entry::Vacant(entry) => {
                entry.insert(DispatchRecord {
                    reminder_id: reminder_id.clone(),
                    cycle_id: cycle_id.clone(),
                    status: DispatchStatus::Claimed,
                    claimed_at: now,
                    dispatched_at: None,
                });
                Ok(ClaimOutcome::Claimed)
            }
        }
    }

    async fn commit(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        dispatched_at: i64,
    ) -> anyhow::Result<()> {
        let mut records = self.records.lock().unwrap();
        if let Some(record) = records.get_mut(&(reminder_id.clone(), cycle_id.clone())) {
            record.status = DispatchStatus::Dispatched;
            record.dispatched_at = Some(dispatched_at);
        }
        Ok(())
    }

    async fn release(&self, reminder_id: &ID, cycle_id: &CycleId) -> anyhow::Result<()> {
        let mut records = self.records.lock().unwrap();
        let key = (reminder_id.clone(), cycle_id.clone());
        if let Some(record) = records.get(&key) {
            if record.status == DispatchStatus::Claimed {
                records.remove(&key);
            }
        }
        Ok(())
    }

    async fn release_abandoned_before(
        &self,
        claimed_before: i64,
    ) -> anyhow::Result<Vec<DispatchRecord>> {
        let mut records = self.records.lock().unwrap();
        let abandoned: Vec<DispatchRecord> = records
            .values()
            .filter(|r| r.status == DispatchStatus::Claimed && r.claimed_at <= claimed_before)
            .cloned()
            .collect();
        for record in &abandoned {
            records.remove(&(record.reminder_id.clone(), record.cycle_id.clone()));
        }
        Ok(abandoned)
    }

    async fn find(&self, reminder_id: &ID, cycle_id: &CycleId) -> Option<DispatchRecord> {
        let records = self.records.lock().unwrap();
        records
            .get(&(reminder_id.clone(), cycle_id.clone()))
            .cloned()
    }

    async fn delete_all_before(&self, dispatched_before: i64) -> anyhow::Result<u64> {
        let mut records = self.records.lock().unwrap();
        let before = records.len();
        records.retain(|_, r| match (r.status, r.dispatched_at) {
            (DispatchStatus::Dispatched, Some(at)) => at > dispatched_before,
            _ => true,
        });
        Ok((before - records.len()) as u64)
    }
}
