use sqlx::Row;

use kudos_core::domain::grant::{ChannelId, GrantRecord, UserId};

use super::{GrantRepository, RepositoryError};
use crate::{migrations, DbPool};

pub struct SqlGrantRepository {
    pool: DbPool,
}

impl SqlGrantRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl GrantRepository for SqlGrantRepository {
    async fn prepare(&self) -> Result<(), RepositoryError> {
        migrations::run_pending(&self.pool).await?;
        Ok(())
    }

    async fn append(&self, record: GrantRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO grant_record (from_user, to_user, reason, grant_date, ts, channel_id) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.from.0)
        .bind(record.to.0)
        .bind(record.reason)
        .bind(record.date)
        .bind(record.ts)
        .bind(record.channel_id.0)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn load_all(&self) -> Result<Vec<GrantRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT from_user, to_user, reason, grant_date, ts, channel_id \
             FROM grant_record ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<GrantRecord, RepositoryError> {
                Ok(GrantRecord {
                    from: UserId(row.try_get("from_user")?),
                    to: UserId(row.try_get("to_user")?),
                    reason: row.try_get("reason")?,
                    date: row.try_get("grant_date")?,
                    ts: row.try_get("ts")?,
                    channel_id: ChannelId(row.try_get("channel_id")?),
                })
            })
            .collect()
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM grant_record").fetch_one(&self.pool).await?;
        u64::try_from(count)
            .map_err(|_| RepositoryError::Decode(format!("negative grant count {count}")))
    }

    async fn delete_all(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM grant_record").execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use kudos_core::domain::grant::{ChannelId, GrantRecord, UserId};

    use super::SqlGrantRepository;
    use crate::connect_with_settings;
    use crate::repositories::GrantRepository;

    async fn repository() -> SqlGrantRepository {
        let pool = connect_with_settings("sqlite::memory:", 1, 5).await.expect("connect");
        let repo = SqlGrantRepository::new(pool);
        repo.prepare().await.expect("migrate");
        repo
    }

    fn grant(from: &str, to: &str, ts: f64) -> GrantRecord {
        GrantRecord {
            from: UserId::new(from),
            to: UserId::new(to),
            reason: "covered my on-call shift".to_string(),
            date: "2026-10-19".to_string(),
            ts,
            channel_id: ChannelId::new("C-KUDOS"),
        }
    }

    #[tokio::test]
    async fn sql_repo_round_trips_grants_in_insertion_order() {
        let repo = repository().await;
        let first = grant("U1", "U2", 1_790_000_000.25);
        let second = grant("U3", "U2", 1_789_000_000.0);

        repo.append(first.clone()).await.expect("append first");
        repo.append(second.clone()).await.expect("append second");

        assert_eq!(repo.load_all().await.expect("load"), vec![first, second]);
        assert_eq!(repo.count().await.expect("count"), 2);
    }

    #[tokio::test]
    async fn prepare_is_idempotent() {
        let repo = repository().await;
        repo.prepare().await.expect("second prepare");
        assert_eq!(repo.count().await.expect("count"), 0);
    }

    #[tokio::test]
    async fn sql_repo_wipe_removes_everything() {
        let repo = repository().await;
        repo.append(grant("U1", "U2", 1.0)).await.expect("append");
        repo.append(grant("U2", "U1", 2.0)).await.expect("append");

        assert_eq!(repo.delete_all().await.expect("wipe"), 2);
        assert!(repo.load_all().await.expect("load").is_empty());
    }
}
