use crate::shared::usecase::UseCase;
use warden_domain::{EventFamily, GuildId, Reminder};
use warden_infra::WardenContext;

/// Lists a guild's reminders for display in the command layer. The
/// scheduler's own candidate query does not go through here.
#[derive(Debug)]
pub struct ListRemindersUseCase {
    pub guild_id: GuildId,
    pub family: Option<EventFamily>,
}

#[derive(Debug)]
pub enum UseCaseError {}

#[async_trait::async_trait]
impl UseCase for ListRemindersUseCase {
    type Response = Vec<Reminder>;

    type Error = UseCaseError;

    const NAME: &'static str = "ListReminders";

    async fn execute(&mut self, ctx: &WardenContext) -> Result<Self::Response, Self::Error> {
        let mut reminders = ctx.repos.reminders.find_by_guild(&self.guild_id).await;
        if let Some(family) = self.family {
            reminders.retain(|r| r.family() == family);
        }
        Ok(reminders)
    }
}
