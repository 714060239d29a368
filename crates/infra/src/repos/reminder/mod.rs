mod inmemory;
mod postgres;

pub use inmemory::InMemoryReminderRepo;
pub use postgres::PostgresReminderRepo;
use warden_domain::{GuildId, Reminder, ID};

#[async_trait::async_trait]
pub trait IReminderRepo: Send + Sync {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()>;
    async fn save(&self, reminder: &Reminder) -> anyhow::Result<()>;
    async fn find(&self, reminder_id: &ID) -> Option<Reminder>;
    async fn find_by_guild(&self, guild_id: &GuildId) -> Vec<Reminder>;
    /// Candidates whose `next_fire_at` falls at or before `before_ts`. The
    /// scheduler calls this once per tick with `now + lookahead`.
    async fn find_due(&self, before_ts: i64) -> anyhow::Result<Vec<Reminder>>;
    async fn delete(&self, reminder_id: &ID) -> Option<Reminder>;
}
