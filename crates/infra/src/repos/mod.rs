mod dispatch_record;
mod guild_group;
mod reminder;
mod shared;

use dispatch_record::{InMemoryDispatchRecordRepo, PostgresDispatchRecordRepo};
use guild_group::{InMemoryGuildGroupRepo, PostgresGuildGroupRepo};
use reminder::{InMemoryReminderRepo, PostgresReminderRepo};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::info;

pub use dispatch_record::{ClaimOutcome, IDispatchRecordRepo};
pub use guild_group::IGuildGroupRepo;
pub use reminder::IReminderRepo;

#[derive(Clone)]
pub struct Repos {
    pub reminders: Arc<dyn IReminderRepo>,
    pub guild_groups: Arc<dyn IGuildGroupRepo>,
    pub dispatch_records: Arc<dyn IDispatchRecordRepo>,
}

impl Repos {
    pub async fn create_postgres(connection_string: &str) -> anyhow::Result<Self> {
        info!("DB CHECKING CONNECTION ...");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(connection_string)
            .await?;
        info!("DB CHECKING CONNECTION ... [done]");
        Ok(Self {
            reminders: Arc::new(PostgresReminderRepo::new(pool.clone())),
            guild_groups: Arc::new(PostgresGuildGroupRepo::new(pool.clone())),
            dispatch_records: Arc::new(PostgresDispatchRecordRepo::new(pool)),
        })
    }

    pub fn create_inmemory() -> Self {
        Self {
            reminders: Arc::new(InMemoryReminderRepo::new()),
            guild_groups: Arc::new(InMemoryGuildGroupRepo::new()),
            dispatch_records: Arc::new(InMemoryDispatchRecordRepo::new()),
        }
    }
}
