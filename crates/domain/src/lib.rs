mod cycle;
mod dispatch;
pub mod eligibility;
mod family;
mod group;
mod member;
mod reminder;
mod shared;
pub mod windows;

pub use cycle::{Cycle, CycleId, CycleState};
pub use dispatch::{DispatchRecord, DispatchStatus};
pub use family::{EventFamily, InvalidEventFamilyError};
pub use group::{ChannelId, GroupRef, GroupRole, GuildGroupLink, GuildId, InvalidGroupRoleError};
pub use member::{Member, MemberProgress};
pub use reminder::{ParticipationScope, Reminder, ReminderFilter, ReminderValidationError};
pub use shared::entity::{Entity, ID};
pub use windows::{CalendarException, CycleBounds, FamilySchedule, ScheduleSet};
