use super::IReminderRepo;
use crate::repos::shared::inmemory_repo::*;
use warden_domain::{GuildId, Reminder, ID};

pub struct InMemoryReminderRepo {
    reminders: std::sync::Mutex<Vec<Reminder>>,
}

impl InMemoryReminderRepo {
    pub fn new() -> Self {
        Self {
            reminders: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IReminderRepo for InMemoryReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        insert(reminder, &self.reminders);
        Ok(())
    }

    async fn save(&self, reminder: &Reminder) -> anyhow::Result<()> {
        save(reminder, &self.reminders);
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        find(reminder_id, &self.reminders)
    }

    async fn find_by_guild(&self, guild_id: &GuildId) -> Vec<Reminder> {
        find_by(&self.reminders, |r| r.guild_id == *guild_id)
    }

    async fn find_due(&self, before_ts: i64) -> anyhow::Result<Vec<Reminder>> {
        let mut due = find_by(&self.reminders, |r| r.next_fire_at <= before_ts);
        due.sort_by_key(|r| r.next_fire_at);
        Ok(due)
    }

    async fn delete(&self, reminder_id: &ID) -> Option<Reminder> {
        delete(reminder_id, &self.reminders)
    }
}
