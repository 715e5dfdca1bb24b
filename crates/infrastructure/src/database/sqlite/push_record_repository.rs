use std::collections::HashSet;

use async_trait::async_trait;
use curator_core::{CuratorResult, PushRecord, PushRecordRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::database::mapping::MappingHelpers;

pub struct SqlitePushRecordRepository {
    pool: SqlitePool,
}

impl SqlitePushRecordRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_record(row: &SqliteRow) -> CuratorResult<PushRecord> {
        Ok(PushRecord {
            id: row.try_get("id")?,
            review_id: row.try_get("review_id")?,
            channel_id: row.try_get("channel_id")?,
            message_id: row.try_get("message_id")?,
            status: row.try_get("status")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, review_id, channel_id, message_id, status, created_by, created_at, \
     updated_by, updated_at FROM push_records";

#[async_trait]
impl PushRecordRepository for SqlitePushRecordRepository {
    async fn get_by_review_id(&self, review_id: i64) -> CuratorResult<Option<PushRecord>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE review_id = ?"))
            .bind(review_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn upsert(&self, record: &PushRecord) -> CuratorResult<PushRecord> {
        sqlx::query(
            r#"
            INSERT INTO push_records (review_id, channel_id, message_id, status, created_by, created_at,
                                      updated_by, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(review_id) DO UPDATE SET
                channel_id = excluded.channel_id,
                message_id = excluded.message_id,
                status = excluded.status,
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(record.review_id)
        .bind(record.channel_id)
        .bind(record.message_id)
        .bind(record.status)
        .bind(record.created_by)
        .bind(record.created_at)
        .bind(record.updated_by)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE review_id = ?"))
            .bind(record.review_id)
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_record(&row)
    }

    async fn delivered_review_ids(&self, review_ids: &[i64]) -> CuratorResult<HashSet<i64>> {
        let mut delivered = HashSet::new();
        // SQLite 默认最多 999 个绑定参数
        for chunk in review_ids.chunks(500) {
            let sql = format!(
                "SELECT review_id FROM push_records WHERE status = 1 AND review_id IN ({})",
                MappingHelpers::placeholders(chunk.len(), 1)
            );
            let mut query = sqlx::query(&sql);
            for id in chunk {
                query = query.bind(*id);
            }
            for row in query.fetch_all(&self.pool).await? {
                delivered.insert(row.try_get::<i64, _>("review_id")?);
            }
        }
        Ok(delivered)
    }
}
