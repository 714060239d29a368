use crate::family::EventFamily;
use crate::group::GroupRef;
use crate::member::Member;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Deterministic identifier of one concrete event instance. Derived from
/// the group and the cycle start instant so that re-fetching the same live
/// event always yields the same id, which is what makes the dispatch ledger
/// key stable across ticks and scheduler instances.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CycleId(String);

impl CycleId {
    pub fn derive(family: EventFamily, group_ref: &GroupRef, start_ts: i64) -> Self {
        Self(format!("{}:{}:{}", family, group_ref, start_ts))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Display for CycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CycleState {
    Pending,
    Active,
    Ended,
}

/// One live event instance for one group, fetched on demand from the game
/// data collaborator and never mutated by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Cycle {
    pub id: CycleId,
    pub family: EventFamily,
    pub group_ref: GroupRef,
    pub start_ts: i64,
    pub end_ts: i64,
    pub state: CycleState,
    pub members: Vec<Member>,
}

impl Cycle {
    pub fn new(
        family: EventFamily,
        group_ref: GroupRef,
        start_ts: i64,
        end_ts: i64,
        state: CycleState,
        members: Vec<Member>,
    ) -> Self {
        Self {
            id: CycleId::derive(family, &group_ref, start_ts),
            family,
            group_ref,
            start_ts,
            end_ts,
            state,
            members,
        }
    }

    pub fn participants(&self) -> Vec<&Member> {
        self.members.iter().filter(|m| m.participant).collect()
    }

    /// The instant a reminder with the given lead time should fire for this
    /// cycle.
    pub fn fire_instant(&self, lead_time: i64) -> i64 {
        self.end_ts - lead_time
    }

    pub fn has_ended(&self, now: i64) -> bool {
        self.state == CycleState::Ended || self.end_ts <= now
    }
}
