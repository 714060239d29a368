mod inmemory;
mod postgres;

pub use inmemory::InMemoryGuildGroupRepo;
pub use postgres::PostgresGuildGroupRepo;
use warden_domain::{GroupRef, GuildGroupLink, GuildId};

/// The groups each guild tracks. Reminders configured without explicit
/// groups expand against this set at evaluation time.
#[async_trait::async_trait]
pub trait IGuildGroupRepo: Send + Sync {
    async fn link(&self, link: &GuildGroupLink) -> anyhow::Result<()>;
    async fn unlink(&self, guild_id: &GuildId, group_ref: &GroupRef) -> anyhow::Result<()>;
    async fn find_by_guild(&self, guild_id: &GuildId) -> anyhow::Result<Vec<GuildGroupLink>>;
}
