use super::IGuildGroupRepo;
use sqlx::{FromRow, PgPool};
use warden_domain::{GroupRef, GuildGroupLink, GuildId};

pub struct PostgresGuildGroupRepo {
    pool: PgPool,
}

impl PostgresGuildGroupRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct GuildGroupRaw {
    guild_id: String,
    group_ref: String,
}

impl From<GuildGroupRaw> for GuildGroupLink {
    fn from(raw: GuildGroupRaw) -> Self {
        Self {
            guild_id: GuildId::new(raw.guild_id),
            group_ref: GroupRef::new(&raw.group_ref),
        }
    }
}

#[async_trait::async_trait]
impl IGuildGroupRepo for PostgresGuildGroupRepo {
    async fn link(&self, link: &GuildGroupLink) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO guild_groups
            (guild_id, group_ref)
            VALUES($1, $2)
            ON CONFLICT (guild_id, group_ref) DO NOTHING
            "#,
        )
        .bind(link.guild_id.as_str())
        .bind(link.group_ref.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn unlink(&self, guild_id: &GuildId, group_ref: &GroupRef) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM guild_groups AS g
            WHERE g.guild_id = $1 AND g.group_ref = $2
            "#,
        )
        .bind(guild_id.as_str())
        .bind(group_ref.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_guild(&self, guild_id: &GuildId) -> anyhow::Result<Vec<GuildGroupLink>> {
        let rows: Vec<GuildGroupRaw> = sqlx::query_as(
            r#"
            SELECT * FROM guild_groups AS g
            WHERE g.guild_id = $1
            "#,
        )
        .bind(guild_id.as_str())
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|raw| raw.into()).collect())
    }
}
