use crate::family::EventFamily;
use crate::group::{ChannelId, GroupRef, GroupRole, GuildId};
use crate::shared::entity::{Entity, ID};
use crate::windows::ScheduleSet;
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Per-family filter fields of a reminder. The variant fixes the event
/// family, so a war reminder cannot silently carry a points threshold and
/// vice versa.
#[derive(Debug, Clone, PartialEq)]
pub enum ReminderFilter {
    War {
        /// Only remind members with this many attacks left. Empty = any.
        remaining_attacks: Vec<u32>,
    },
    Raid {
        /// Only remind members with this many attacks left. Empty = any.
        remaining_attacks: Vec<u32>,
    },
    PointsEvent {
        /// Only remind members still short of this score. `None` and
        /// `Some(0)` both mean: remind regardless of current score.
        min_points: Option<i64>,
    },
}

impl ReminderFilter {
    pub fn family(&self) -> EventFamily {
        match self {
            ReminderFilter::War { .. } => EventFamily::War,
            ReminderFilter::Raid { .. } => EventFamily::Raid,
            ReminderFilter::PointsEvent { .. } => EventFamily::PointsEvent,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticipationScope {
    /// Address the whole group roster.
    AllMembers,
    /// Address only members on the live cycle's participant roster.
    ParticipantsOnly,
}

impl Display for ParticipationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ParticipationScope::AllMembers => "all_members",
            ParticipationScope::ParticipantsOnly => "participants_only",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug)]
pub enum InvalidParticipationScopeError {
    #[error("Participation scope: {0} is not known")]
    Unknown(String),
}

impl FromStr for ParticipationScope {
    type Err = InvalidParticipationScopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "all_members" => Ok(ParticipationScope::AllMembers),
            "participants_only" => Ok(ParticipationScope::ParticipantsOnly),
            _ => Err(InvalidParticipationScopeError::Unknown(s.to_string())),
        }
    }
}

/// One community-configured alert. Created and edited through the command
/// layer, evaluated by the scheduler every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Reminder {
    pub id: ID,
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    /// Groups this reminder watches. Empty = every group the guild tracks.
    pub group_refs: Vec<GroupRef>,
    /// How long before cycle close the alert fires, in millis.
    pub lead_time: i64,
    /// Only remind members holding one of these roles. Empty = any role.
    pub role_filter: Vec<GroupRole>,
    pub scope: ParticipationScope,
    pub message_template: String,
    pub filter: ReminderFilter,
    /// Next instant this reminder becomes due, maintained by the engine and
    /// indexed for the due-candidate query.
    pub next_fire_at: i64,
    pub created: i64,
    pub updated: i64,
}

impl Reminder {
    pub fn family(&self) -> EventFamily {
        self.filter.family()
    }

    /// Configuration invariants are enforced here, at creation and edit
    /// time, never at dispatch time.
    pub fn validate(&self, schedules: &ScheduleSet) -> Result<(), ReminderValidationError> {
        if self.message_template.trim().is_empty() {
            return Err(ReminderValidationError::EmptyTemplate);
        }
        let max = schedules.for_family(self.family()).max_cycle_duration();
        if self.lead_time <= 0 || self.lead_time >= max {
            return Err(ReminderValidationError::InvalidLeadTime {
                family: self.family(),
                lead_time: self.lead_time,
                max,
            });
        }
        Ok(())
    }
}

impl Entity for Reminder {
    fn id(&self) -> &ID {
        &self.id
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ReminderValidationError {
    #[error(
        "Lead time of {lead_time} millis must be positive and shorter than the maximum {family} cycle of {max} millis"
    )]
    InvalidLeadTime {
        family: EventFamily,
        lead_time: i64,
        max: i64,
    },
    #[error("Message template cannot be empty")]
    EmptyTemplate,
}
