use crate::cycle::Cycle;
use crate::group::GroupRole;
use crate::member::Member;
use crate::reminder::{ParticipationScope, Reminder, ReminderFilter};

/// Members of `cycle` that satisfy every filter of `reminder`. Filters are
/// conjunctive; an EMPTY filter set matches ALL members, not none — that is
/// the default configuration most reminders run with. An empty result is a
/// valid outcome that simply suppresses dispatch.
pub fn eligible_members(reminder: &Reminder, cycle: &Cycle) -> Vec<Member> {
    if reminder.family() != cycle.family {
        return Vec::new();
    }
    cycle
        .members
        .iter()
        .filter(|m| matches_scope(reminder.scope, m))
        .filter(|m| matches_role(&reminder.role_filter, m))
        .filter(|m| matches_progress(&reminder.filter, m))
        .cloned()
        .collect()
}

fn matches_scope(scope: ParticipationScope, member: &Member) -> bool {
    match scope {
        ParticipationScope::AllMembers => true,
        ParticipationScope::ParticipantsOnly => member.participant,
    }
}

fn matches_role(role_filter: &[GroupRole], member: &Member) -> bool {
    role_filter.is_empty() || role_filter.contains(&member.role)
}

fn matches_progress(filter: &ReminderFilter, member: &Member) -> bool {
    match filter {
        ReminderFilter::War { remaining_attacks }
        | ReminderFilter::Raid { remaining_attacks } => {
            match member.progress.remaining_attacks() {
                Some(left) => remaining_attacks.is_empty() || remaining_attacks.contains(&left),
                None => false,
            }
        }
        ReminderFilter::PointsEvent { min_points } => match (min_points, member.progress.points())
        {
            // No threshold, or an explicit zero threshold: remind everyone
            // regardless of current score.
            (None, Some(_)) | (Some(0), Some(_)) => true,
            (Some(threshold), Some(points)) => points < *threshold,
            (_, None) => false,
        },
    }
}
