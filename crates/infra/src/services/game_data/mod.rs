mod api;

pub use api::GameApiClient;

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use thiserror::Error;
use warden_domain::{Cycle, EventFamily, GroupRef};

#[derive(Debug, Error)]
pub enum GameDataError {
    /// The upstream could not answer right now. Retry on the next tick;
    /// this is never the same as "no live cycle".
    #[error("Game data upstream unavailable: {0}")]
    Unavailable(String),
}

/// The game data collaborator. `Ok(None)` means there is no live cycle for
/// the group, which is a normal and silent outcome. Repeated calls within a
/// short window are safe and idempotent; the cycle cache relies on that.
#[async_trait::async_trait]
pub trait IGameDataClient: Send + Sync {
    async fn get_active_cycle(
        &self,
        family: EventFamily,
        group_ref: &GroupRef,
    ) -> Result<Option<Cycle>, GameDataError>;
}

/// Programmable stand-in for tests.
pub struct InMemoryGameDataClient {
    cycles: Mutex<HashMap<(EventFamily, GroupRef), Cycle>>,
    unavailable: AtomicBool,
    upstream_calls: AtomicUsize,
}

impl InMemoryGameDataClient {
    pub fn new() -> Self {
        Self {
            cycles: Mutex::new(HashMap::new()),
            unavailable: AtomicBool::new(false),
            upstream_calls: AtomicUsize::new(0),
        }
    }

    pub fn put_cycle(&self, cycle: Cycle) {
        let mut cycles = self.cycles.lock().unwrap();
        cycles.insert((cycle.family, cycle.group_ref.clone()), cycle);
    }

    pub fn clear_cycle(&self, family: EventFamily, group_ref: &GroupRef) {
        let mut cycles = self.cycles.lock().unwrap();
        cycles.remove(&(family, group_ref.clone()));
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn upstream_calls(&self) -> usize {
        self.upstream_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IGameDataClient for InMemoryGameDataClient {
    async fn get_active_cycle(
        &self,
        family: EventFamily,
        group_ref: &GroupRef,
    ) -> Result<Option<Cycle>, GameDataError> {
        self.upstream_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GameDataError::Unavailable("scripted outage".to_string()));
        }
        let cycles = self.cycles.lock().unwrap();
        Ok(cycles.get(&(family, group_ref.clone())).cloned())
    }
}
