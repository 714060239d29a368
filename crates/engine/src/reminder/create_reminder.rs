use crate::shared::usecase::UseCase;
use warden_domain::{
    windows, ChannelId, GroupRef, GroupRole, GuildId, ParticipationScope, Reminder,
    ReminderFilter, ReminderValidationError,
};
use warden_infra::WardenContext;

/// Creates a reminder on behalf of the command layer. Guild-level
/// authorization has already happened there.
#[derive(Debug)]
pub struct CreateReminderUseCase {
    pub guild_id: GuildId,
    pub channel_id: ChannelId,
    pub group_refs: Vec<GroupRef>,
    pub lead_time: i64,
    pub role_filter: Vec<GroupRole>,
    pub scope: ParticipationScope,
    pub message_template: String,
    pub filter: ReminderFilter,
}

#[derive(Debug, PartialEq)]
pub enum UseCaseError {
    InvalidConfiguration(ReminderValidationError),
    StorageError,
}

#[async_trait::async_trait]
impl UseCase for CreateReminderUseCase {
    type Response = Reminder;

    type Error = UseCaseError;

    const NAME: &'static str = "CreateReminder";

    async fn execute(&mut self, ctx: &WardenContext) -> Result<Self::Response, Self::Error> {
        let now = ctx.sys.get_timestamp_millis();
        let family = self.filter.family();
        let schedule = ctx.config.schedules.for_family(family);
        let exceptions = ctx.config.exceptions_for(family);

        let reminder = Reminder {
            id: Default::default(),
            guild_id: self.guild_id.clone(),
            channel_id: self.channel_id.clone(),
            group_refs: self.group_refs.clone(),
            lead_time: self.lead_time,
            role_filter: self.role_filter.clone(),
            scope: self.scope,
            message_template: self.message_template.clone(),
            filter: self.filter.clone(),
            next_fire_at: windows::upcoming_fire_instant(now, schedule, exceptions, self.lead_time),
            created: now,
            updated: now,
        };

        reminder
            .validate(&ctx.config.schedules)
            .map_err(UseCaseError::InvalidConfiguration)?;

        ctx.repos
            .reminders
            .insert(&reminder)
            .await
            .map_err(|_| UseCaseError::StorageError)?;

        Ok(reminder)
    }
}
