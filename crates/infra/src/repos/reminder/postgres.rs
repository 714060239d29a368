use super::IReminderRepo;
use sqlx::types::Uuid;
use sqlx::{FromRow, PgPool};
use tracing::error;
use warden_domain::{
    ChannelId, EventFamily, GroupRef, GuildId, Reminder, ReminderFilter, ID,
};

pub struct PostgresReminderRepo {
    pool: PgPool,
}

impl PostgresReminderRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ReminderRaw {
    reminder_uid: Uuid,
    guild_id: String,
    channel_id: String,
    event_family: String,
    group_refs: Vec<String>,
    lead_time: i64,
    role_filter: Vec<String>,
    remaining_attacks: Option<Vec<i32>>,
    min_points: Option<i64>,
    participation_scope: String,
    message_template: String,
    next_fire_at: i64,
    created: i64,
    updated: i64,
}

impl ReminderRaw {
    fn into_domain(self) -> anyhow::Result<Reminder> {
        let family: EventFamily = self.event_family.parse()?;
        let filter = match family {
            EventFamily::War => ReminderFilter::War {
                remaining_attacks: to_attack_counts(self.remaining_attacks),
            },
            EventFamily::Raid => ReminderFilter::Raid {
                remaining_attacks: to_attack_counts(self.remaining_attacks),
            },
            EventFamily::PointsEvent => ReminderFilter::PointsEvent {
                min_points: self.min_points,
            },
        };
        let role_filter = self
            .role_filter
            .iter()
            .map(|r| r.parse())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Reminder {
            id: self.reminder_uid.into(),
            guild_id: GuildId::new(self.guild_id),
            channel_id: ChannelId::new(self.channel_id),
            group_refs: self.group_refs.iter().map(|g| GroupRef::new(g)).collect(),
            lead_time: self.lead_time,
            role_filter,
            scope: self.participation_scope.parse()?,
            message_template: self.message_template,
            filter,
            next_fire_at: self.next_fire_at,
            created: self.created,
            updated: self.updated,
        })
    }
}

fn to_attack_counts(raw: Option<Vec<i32>>) -> Vec<u32> {
    raw.unwrap_or_default()
        .into_iter()
        .map(|v| v.max(0) as u32)
        .collect()
}

fn remaining_attacks_column(filter: &ReminderFilter) -> Option<Vec<i32>> {
    match filter {
        ReminderFilter::War { remaining_attacks } | ReminderFilter::Raid { remaining_attacks } => {
            Some(remaining_attacks.iter().map(|v| *v as i32).collect())
        }
        ReminderFilter::PointsEvent { .. } => None,
    }
}

fn min_points_column(filter: &ReminderFilter) -> Option<i64> {
    match filter {
        ReminderFilter::PointsEvent { min_points } => *min_points,
        _ => None,
    }
}

fn rows_into_domain(rows: Vec<ReminderRaw>) -> Vec<Reminder> {
    rows.into_iter()
        .filter_map(|raw| match raw.into_domain() {
            Ok(reminder) => Some(reminder),
            Err(e) => {
                error!("Unable to map reminder row to domain: {:?}", e);
                None
            }
        })
        .collect()
}

#[async_trait::async_trait]
impl IReminderRepo for PostgresReminderRepo {
    async fn insert(&self, reminder: &Reminder) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reminders
            (reminder_uid, guild_id, channel_id, event_family, group_refs, lead_time,
             role_filter, remaining_attacks, min_points, participation_scope,
             message_template, next_fire_at, created, updated)
            VALUES($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.guild_id.as_str())
        .bind(reminder.channel_id.as_str())
        .bind(reminder.family().to_string())
        .bind(
            reminder
                .group_refs
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>(),
        )
        .bind(reminder.lead_time)
        .bind(
            reminder
                .role_filter
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
        )
        .bind(remaining_attacks_column(&reminder.filter))
        .bind(min_points_column(&reminder.filter))
        .bind(reminder.scope.to_string())
        .bind(&reminder.message_template)
        .bind(reminder.next_fire_at)
        .bind(reminder.created)
        .bind(reminder.updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save(&self, reminder: &Reminder) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE reminders SET
                channel_id = $2,
                group_refs = $3,
                lead_time = $4,
                role_filter = $5,
                remaining_attacks = $6,
                min_points = $7,
                participation_scope = $8,
                message_template = $9,
                next_fire_at = $10,
                updated = $11
            WHERE reminder_uid = $1
            "#,
        )
        .bind(reminder.id.inner_ref())
        .bind(reminder.channel_id.as_str())
        .bind(
            reminder
                .group_refs
                .iter()
                .map(|g| g.to_string())
                .collect::<Vec<_>>(),
        )
        .bind(reminder.lead_time)
        .bind(
            reminder
                .role_filter
                .iter()
                .map(|r| r.to_string())
                .collect::<Vec<_>>(),
        )
        .bind(remaining_attacks_column(&reminder.filter))
        .bind(min_points_column(&reminder.filter))
        .bind(reminder.scope.to_string())
        .bind(&reminder.message_template)
        .bind(reminder.next_fire_at)
        .bind(reminder.updated)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find(&self, reminder_id: &ID) -> Option<Reminder> {
        let res: Option<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.reminder_uid = $1
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!("Find reminder with id: {} failed. DB returned error: {:?}", reminder_id, e);
            None
        });
        res.and_then(|raw| raw.into_domain().ok())
    }

    async fn find_by_guild(&self, guild_id: &GuildId) -> Vec<Reminder> {
        let rows: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.guild_id = $1
            "#,
        )
        .bind(guild_id.as_str())
        .fetch_all(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Find reminders for guild: {} failed. DB returned error: {:?}",
                guild_id, e
            );
            Vec::new()
        });
        rows_into_domain(rows)
    }

    async fn find_due(&self, before_ts: i64) -> anyhow::Result<Vec<Reminder>> {
        let rows: Vec<ReminderRaw> = sqlx::query_as(
            r#"
            SELECT * FROM reminders AS r
            WHERE r.next_fire_at <= $1
            ORDER BY r.next_fire_at
            "#,
        )
        .bind(before_ts)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows_into_domain(rows))
    }

    async fn delete(&self, reminder_id: &ID) -> Option<Reminder> {
        let res: Option<ReminderRaw> = sqlx::query_as(
            r#"
            DELETE FROM reminders AS r
            WHERE r.reminder_uid = $1
            RETURNING *
            "#,
        )
        .bind(reminder_id.inner_ref())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Delete reminder with id: {} failed. DB returned error: {:?}",
                reminder_id, e
            );
            None
        });
        res.and_then(|raw| raw.into_domain().ok())
    }
}
