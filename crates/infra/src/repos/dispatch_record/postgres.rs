use super::{ClaimOutcome, IDispatchRecordRepo};
use sqlx::types::Uuid;
use sqlx::{FromRow, PgPool};
use tracing::error;
use warden_domain::{CycleId, DispatchRecord, DispatchStatus, ID};

pub struct PostgresDispatchRecordRepo {
    pool: PgPool,
}

impl PostgresDispatchRecordRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DispatchRecordRaw {
    reminder_uid: Uuid,
    cycle_id: String,
    status: String,
    claimed_at: i64,
    dispatched_at: Option<i64>,
}

impl DispatchRecordRaw {
    fn into_domain(self) -> anyhow::Result<DispatchRecord> {
        let status: DispatchStatus = self.status.parse()?;
        Ok(DispatchRecord {
            reminder_id: self.reminder_uid.into(),
            cycle_id: CycleId::from_string(self.cycle_id),
            status,
            claimed_at: self.claimed_at,
            dispatched_at: self.dispatched_at,
        })
    }
}

#[async_trait::async_trait]
impl IDispatchRecordRepo for PostgresDispatchRecordRepo {
    async fn try_claim(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        now: i64,
    ) -> anyhow::Result<ClaimOutcome> {
        // The composite primary key turns racing claims into a conflict;
        // exactly one insert reports an affected row.
        let res = sqlx::query(
            r#"
            INSERT INTO dispatch_records
            (reminder_uid, cycle_id, status, claimed_at)
            VALUES($1, $2, 'claimed', $3)
            ON CONFLICT (reminder_uid, cycle_id) DO NOTHING
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(cycle_id.as_str())
        .bind(now)
        .execute(&self.pool)
        .await?;

        if res.rows_affected() == 1 {
            Ok(ClaimOutcome::Claimed)
        } else {
            Ok(ClaimOutcome::AlreadyClaimed)
        }
    }

    async fn commit(
        &self,
        reminder_id: &ID,
        cycle_id: &CycleId,
        dispatched_at: i64,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            UPDATE dispatch_records AS d
            SET status = 'dispatched', dispatched_at = $3
            WHERE d.reminder_uid = $1 AND d.cycle_id = $2
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(cycle_id.as_str())
        .bind(dispatched_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release(&self, reminder_id: &ID, cycle_id: &CycleId) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            DELETE FROM dispatch_records AS d
            WHERE d.reminder_uid = $1 AND d.cycle_id = $2 AND d.status = 'claimed'
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(cycle_id.as_str())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn release_abandoned_before(
        &self,
        claimed_before: i64,
    ) -> anyhow::Result<Vec<DispatchRecord>> {
        let rows: Vec<DispatchRecordRaw> = sqlx::query_as(
            r#"
            DELETE FROM dispatch_records AS d
            WHERE d.status = 'claimed' AND d.claimed_at <= $1
            RETURNING *
            "#,
        )
        .bind(claimed_before)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .filter_map(|raw| match raw.into_domain() {
                Ok(record) => Some(record),
                Err(e) => {
                    error!("Unable to map dispatch record row to domain: {:?}", e);
                    None
                }
            })
            .collect())
    }

    async fn find(&self, reminder_id: &ID, cycle_id: &CycleId) -> Option<DispatchRecord> {
        let res: Option<DispatchRecordRaw> = sqlx::query_as(
            r#"
            SELECT * FROM dispatch_records AS d
            WHERE d.reminder_uid = $1 AND d.cycle_id = $2
            "#,
        )
        .bind(reminder_id.inner_ref())
        .bind(cycle_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .unwrap_or_else(|e| {
            error!(
                "Find dispatch record for reminder: {} failed. DB returned error: {:?}",
                reminder_id, e
            );
            None
        });
        res.and_then(|raw| raw.into_domain().ok())
    }

    async fn delete_all_before(&self, dispatched_before: i64) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            DELETE FROM dispatch_records AS d
            WHERE d.status = 'dispatched' AND d.dispatched_at <= $1
            "#,
        )
        .bind(dispatched_before)
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected())
    }
}
