use super::IGuildGroupRepo;
use crate::repos::shared::inmemory_repo::*;
use warden_domain::{GroupRef, GuildGroupLink, GuildId};

pub struct InMemoryGuildGroupRepo {
    links: std::sync::Mutex<Vec<GuildGroupLink>>,
}

impl InMemoryGuildGroupRepo {
    pub fn new() -> Self {
        Self {
            links: std::sync::Mutex::new(Vec::new()),
        }
    }
}

#[async_trait::async_trait]
impl IGuildGroupRepo for InMemoryGuildGroupRepo {
    async fn link(&self, link: &GuildGroupLink) -> anyhow::Result<()> {
        let existing = find_by(&self.links, |l: &GuildGroupLink| l == link);
        if existing.is_empty() {
            insert(link, &self.links);
        }
        Ok(())
    }

    async fn unlink(&self, guild_id: &GuildId, group_ref: &GroupRef) -> anyhow::Result<()> {
        delete_by(&self.links, |l| {
            l.guild_id == *guild_id && l.group_ref == *group_ref
        });
        Ok(())
    }

    async fn find_by_guild(&self, guild_id: &GuildId) -> anyhow::Result<Vec<GuildGroupLink>> {
        Ok(find_by(&self.links, |l| l.guild_id == *guild_id))
    }
}
