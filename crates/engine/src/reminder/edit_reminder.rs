use crate::shared::usecase::UseCase;
use warden_domain::{
    windows, ChannelId, GroupRef, GroupRole, ParticipationScope, Reminder, ReminderFilter,
    ReminderValidationError, ID,
};
use warden_infra::WardenContext;

/// Applies a partial edit to a reminder and recomputes its fire instant. A
/// lead time shortened past the original fire instant makes the reminder due
/// immediately when the live cycle has not closed yet, rather than waiting a
/// full cycle.
#[derive(Debug)]
pub struct EditReminderUseCase {
    pub reminder_id: ID,
    pub channel_id: Option<ChannelId>,
    pub group_refs: Option<Vec<GroupRef>>,
    pub lead_time: Option<i64>,
    pub role_filter: Option<Vec<GroupRole>>,
    pub scope: Option<ParticipationScope>,
    pub message_template: Option<String>,
    pub filter: Option<ReminderFilter>,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    NotFound(ID),
    InvalidConfiguration(ReminderValidationError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for EditReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "EditReminder";

    async fn execute(&mut self, ctx: &WardenContext) -> Result<Self::Response, Self::Error> {
        let mut reminder = ctx
            .repos
            .reminders
            .find(&self.reminder_id)
            .await
            .ok_or_else(|| UseCaseError::NotFound(self.reminder_id.clone()))?;

        if let Some(channel_id) = &self.channel_id {
            reminder.channel_id = channel_id.clone();
        }
        if let Some(group_refs) = &self.group_refs {
            reminder.group_refs = group_refs.clone();
        }
        if let Some(lead_time) = self.lead_time {
            reminder.lead_time = lead_time;
        }
        if let Some(role_filter) = &self.role_filter {
            reminder.role_filter = role_filter.clone();
        }
        if let Some(scope) = self.scope {
            reminder.scope = scope;
        }
        if let Some(message_template) = &self.message_template {
            reminder.message_template = message_template.clone();
        }
        if let Some(filter) = &self.filter {
            reminder.filter = filter.clone();
        }

        reminder
            .validate(&ctx.config.schedules)
            .map_err(UseCaseError::InvalidConfiguration)?;

        let now = ctx.sys.get_timestamp_millis();
        let family = reminder.family();
        let schedule = ctx.config.schedules.for_family(family);
        let exceptions = ctx.config.exceptions_for(family);
        reminder.next_fire_at =
            windows::upcoming_fire_instant(now, schedule, exceptions, reminder.lead_time);
        reminder.updated = now;

        ctx.repos
            .reminders
            .save(&reminder)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(reminder)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reminder::create_reminder::CreateReminderUseCase;
    use crate::shared::usecase::execute;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;
    use warden_domain::GuildId;
    use warden_infra::{
        Config, InMemoryGameDataClient, InMemoryMessenger, Repos, StaticSys, WardenContext,
    };

    const HOUR: i64 = 1000 * 60 * 60;

    fn test_context(now: i64) -> WardenContext {
        WardenContext::new(
            Repos::create_inmemory(),
            Config::new(),
            Arc::new(StaticSys(now)),
            Arc::new(InMemoryGameDataClient::new()),
            Arc::new(InMemoryMessenger::new()),
        )
    }

    fn edit(reminder_id: &ID) -> EditReminderUseCase {
        EditReminderUseCase {
            reminder_id: reminder_id.clone(),
            channel_id: None,
            group_refs: None,
            lead_time: None,
            role_filter: None,
            scope: None,
            message_template: None,
            filter: None,
        }
    }

    async fn seeded_reminder(ctx: &WardenContext, lead_time: i64) -> Reminder {
        let usecase = CreateReminderUseCase {
            guild_id: GuildId::new("g-1"),
            channel_id: ChannelId::new("c-1"),
            group_refs: vec![GroupRef::new("#AAA")],
            lead_time,
            role_filter: Vec::new(),
            scope: ParticipationScope::ParticipantsOnly,
            message_template: "closing soon".to_string(),
            filter: ReminderFilter::Raid {
                remaining_attacks: Vec::new(),
            },
        };
        execute(usecase, ctx).await.unwrap()
    }

    #[tokio::test]
    async fn unknown_reminder_is_not_found() {
        let ctx = test_context(1_600_000_000_000);
        let id = ID::new();
        assert_eq!(
            execute(edit(&id), &ctx).await,
            Err(UseCaseError::NotFound(id))
        );
    }

    #[tokio::test]
    async fn shortened_lead_time_past_its_fire_instant_is_due_immediately() {
        // Inside a raid window, three hours before close: a 10h lead
        // reminder has already fired, shortening it to 4h leaves the new
        // fire instant in the past as well.
        let now = Utc.ymd(2021, 1, 4).and_hms(4, 0, 0).timestamp_millis();
        let ctx = test_context(now);
        let reminder = seeded_reminder(&ctx, 10 * HOUR).await;
        assert!(reminder.next_fire_at <= now);

        let mut usecase = edit(&reminder.id);
        usecase.lead_time = Some(4 * HOUR);
        let edited = execute(usecase, &ctx).await.unwrap();

        // Still due before the current window closes at 07:00
        assert!(edited.next_fire_at <= now);
        let close = Utc.ymd(2021, 1, 4).and_hms(7, 0, 0).timestamp_millis();
        assert_eq!(edited.next_fire_at, close - 4 * HOUR);
    }

    #[tokio::test]
    async fn invalid_edit_is_rejected_and_not_saved() {
        let now = 1_600_000_000_000;
        let ctx = test_context(now);
        let reminder = seeded_reminder(&ctx, HOUR).await;

        let mut usecase = edit(&reminder.id);
        usecase.lead_time = Some(100 * HOUR);
        match execute(usecase, &ctx).await {
            Err(UseCaseError::InvalidConfiguration(_)) => {}
            other => panic!("Expected InvalidConfiguration, got {:?}", other),
        }

        let stored = ctx.repos.reminders.find(&reminder.id).await.unwrap();
        assert_eq!(stored.lead_time, HOUR);
    }
}
