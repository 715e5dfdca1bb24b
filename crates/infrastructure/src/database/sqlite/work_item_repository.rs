use async_trait::async_trait;
use chrono::Utc;
use curator_core::{
    CuratorError, CuratorResult, Page, StatusStatistics, WorkItem, WorkItemRepository,
    WorkItemStatus,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::{debug, instrument};

use crate::database::mapping::MappingHelpers;

pub struct SqliteWorkItemRepository {
    pool: SqlitePool,
}

impl SqliteWorkItemRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_item(row: &SqliteRow) -> CuratorResult<WorkItem> {
        Ok(WorkItem {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            site_key: row.try_get("site_key")?,
            artwork_id: row.try_get("artwork_id")?,
            author_id: row.try_get("author_id")?,
            status: MappingHelpers::parse_enum(row, "status")?,
            auto: row.try_get("auto")?,
            ext: MappingHelpers::parse_json_object(row, "ext")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, workspace_id, site_key, artwork_id, author_id, status, auto, ext, \
     created_by, created_at, updated_by, updated_at FROM work_items";

#[async_trait]
impl WorkItemRepository for SqliteWorkItemRepository {
    #[instrument(skip(self, item), fields(workspace_id = item.workspace_id, artwork_id = item.artwork_id))]
    async fn create(&self, item: &WorkItem) -> CuratorResult<WorkItem> {
        let ext = serde_json::to_string(&item.ext)?;
        let result = sqlx::query(
            r#"
            INSERT INTO work_items (workspace_id, site_key, artwork_id, author_id, status, auto, ext,
                                    created_by, created_at, updated_by, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(item.workspace_id)
        .bind(&item.site_key)
        .bind(item.artwork_id)
        .bind(item.author_id)
        .bind(item.status.as_str())
        .bind(item.auto)
        .bind(ext)
        .bind(item.created_by)
        .bind(item.created_at)
        .bind(item.updated_by)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        let mut created = item.clone();
        created.id = result.last_insert_rowid();
        debug!("创建审核记录: {}", created.id);
        Ok(created)
    }

    #[instrument(skip(self, entries), fields(count = entries.len()))]
    async fn create_pending(
        &self,
        workspace_id: i64,
        site_key: &str,
        entries: &[(i64, Option<i64>)],
        created_by: Option<i64>,
    ) -> CuratorResult<u64> {
        if entries.is_empty() {
            return Ok(0);
        }

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut created = 0;
        for (artwork_id, author_id) in entries {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO work_items (workspace_id, site_key, artwork_id, author_id, status,
                                                  auto, ext, created_by, created_at, updated_by, updated_at)
                VALUES (?, ?, ?, ?, 'WAIT', 0, '{}', ?, ?, ?, ?)
                "#,
            )
            .bind(workspace_id)
            .bind(site_key)
            .bind(artwork_id)
            .bind(author_id)
            .bind(created_by)
            .bind(now)
            .bind(created_by)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            created += result.rows_affected();
        }
        tx.commit().await?;

        debug!("工作空间 {} 站点 {} 新增 {} 条待审核记录", workspace_id, site_key, created);
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<WorkItem>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn find(
        &self,
        workspace_id: i64,
        site_key: &str,
        artwork_id: i64,
    ) -> CuratorResult<Option<WorkItem>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE workspace_id = ? AND site_key = ? AND artwork_id = ?"
        ))
        .bind(workspace_id)
        .bind(site_key)
        .bind(artwork_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_item).transpose()
    }

    async fn list_by_artwork_id(&self, artwork_id: i64) -> CuratorResult<Vec<WorkItem>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE artwork_id = ? ORDER BY id"))
            .bind(artwork_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_item).collect()
    }

    async fn update(&self, item: &WorkItem) -> CuratorResult<()> {
        let ext = serde_json::to_string(&item.ext)?;
        let result = sqlx::query(
            r#"
            UPDATE work_items
            SET author_id = ?, status = ?, auto = ?, ext = ?, updated_by = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(item.author_id)
        .bind(item.status.as_str())
        .bind(item.auto)
        .bind(ext)
        .bind(item.updated_by)
        .bind(item.updated_at)
        .bind(item.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::ReviewNotFound { id: item.id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> CuratorResult<()> {
        let result = sqlx::query("DELETE FROM work_items WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CuratorError::ReviewNotFound { id });
        }
        Ok(())
    }

    async fn list_ids_by_status(
        &self,
        workspace_id: i64,
        status: WorkItemStatus,
        page: Page,
    ) -> CuratorResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT id FROM work_items WHERE workspace_id = ? AND status = ? ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(workspace_id)
        .bind(status.as_str())
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get("id").map_err(CuratorError::from))
            .collect()
    }

    async fn list_artwork_ids(
        &self,
        workspace_id: i64,
        site_key: &str,
        page: Page,
    ) -> CuratorResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT artwork_id FROM work_items WHERE workspace_id = ? AND site_key = ? ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(workspace_id)
        .bind(site_key)
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get("artwork_id").map_err(CuratorError::from))
            .collect()
    }

    async fn status_statistics(
        &self,
        workspace_id: i64,
        site_key: &str,
        author_id: i64,
    ) -> CuratorResult<StatusStatistics> {
        let row = sqlx::query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'PASS' THEN 1 ELSE 0 END), 0) AS pass_count,
                COALESCE(SUM(CASE WHEN status = 'REJECT' THEN 1 ELSE 0 END), 0) AS reject_count
            FROM work_items
            WHERE workspace_id = ? AND site_key = ? AND author_id = ?
            "#,
        )
        .bind(workspace_id)
        .bind(site_key)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await?;

        let pass_count: i64 = row.try_get("pass_count")?;
        let reject_count: i64 = row.try_get("reject_count")?;
        Ok(StatusStatistics {
            pass_count: pass_count.max(0) as u64,
            reject_count: reject_count.max(0) as u64,
        })
    }

    async fn count_by_status(&self, workspace_id: i64, status: WorkItemStatus) -> CuratorResult<u64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM work_items WHERE workspace_id = ? AND status = ?")
                .bind(workspace_id)
                .bind(status.as_str())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.max(0) as u64)
    }
}
