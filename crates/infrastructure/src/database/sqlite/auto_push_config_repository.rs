use async_trait::async_trait;
use curator_core::{
    AutoPushConfig, AutoPushConfigRepository, AutoPushStatus, CuratorError, CuratorResult,
};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use crate::database::mapping::MappingHelpers;

pub struct SqliteAutoPushConfigRepository {
    pool: SqlitePool,
}

impl SqliteAutoPushConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_config(row: &SqliteRow) -> CuratorResult<AutoPushConfig> {
        let review_count: i64 = row.try_get("review_count")?;
        Ok(AutoPushConfig {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            mode: MappingHelpers::parse_enum(row, "mode")?,
            status: MappingHelpers::parse_enum(row, "status")?,
            cron_expression: row.try_get("cron_expression")?,
            review_count: u32::try_from(review_count).unwrap_or(0),
            push_to_owner: row.try_get("push_to_owner")?,
            run_once: row.try_get("run_once")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
            updated_by: row.try_get("updated_by")?,
            updated_at: row.try_get("updated_at")?,
            last_run_time: row.try_get("last_run_time")?,
            next_run_time: row.try_get("next_run_time")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, workspace_id, name, description, mode, status, cron_expression, \
     review_count, push_to_owner, run_once, created_by, created_at, updated_by, updated_at, \
     last_run_time, next_run_time FROM auto_push_configs";

#[async_trait]
impl AutoPushConfigRepository for SqliteAutoPushConfigRepository {
    async fn create(&self, config: &AutoPushConfig) -> CuratorResult<AutoPushConfig> {
        let result = sqlx::query(
            r#"
            INSERT INTO auto_push_configs (workspace_id, name, description, mode, status, cron_expression,
                                           review_count, push_to_owner, run_once, created_by, created_at,
                                           updated_by, updated_at, last_run_time, next_run_time)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(config.workspace_id)
        .bind(&config.name)
        .bind(&config.description)
        .bind(config.mode.as_str())
        .bind(config.status.as_str())
        .bind(&config.cron_expression)
        .bind(i64::from(config.review_count))
        .bind(config.push_to_owner)
        .bind(config.run_once)
        .bind(config.created_by)
        .bind(config.created_at)
        .bind(config.updated_by)
        .bind(config.updated_at)
        .bind(config.last_run_time)
        .bind(config.next_run_time)
        .execute(&self.pool)
        .await?;

        let mut created = config.clone();
        created.id = result.last_insert_rowid();
        debug!("创建自动推送配置: {} ({})", created.name, created.id);
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<AutoPushConfig>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn update(&self, config: &AutoPushConfig) -> CuratorResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE auto_push_configs
            SET name = ?, description = ?, mode = ?, status = ?, cron_expression = ?, review_count = ?,
                push_to_owner = ?, run_once = ?, updated_by = ?, updated_at = ?, last_run_time = ?,
                next_run_time = ?
            WHERE id = ?
            "#,
        )
        .bind(&config.name)
        .bind(&config.description)
        .bind(config.mode.as_str())
        .bind(config.status.as_str())
        .bind(&config.cron_expression)
        .bind(i64::from(config.review_count))
        .bind(config.push_to_owner)
        .bind(config.run_once)
        .bind(config.updated_by)
        .bind(config.updated_at)
        .bind(config.last_run_time)
        .bind(config.next_run_time)
        .bind(config.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::ConfigNotFound { id: config.id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> CuratorResult<bool> {
        let result = sqlx::query("DELETE FROM auto_push_configs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_status(&self, status: AutoPushStatus) -> CuratorResult<Vec<AutoPushConfig>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE status = ? ORDER BY id"))
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_config).collect()
    }

    async fn list_by_workspace(&self, workspace_id: i64) -> CuratorResult<Vec<AutoPushConfig>> {
        let rows = sqlx::query(&format!("{SELECT_COLUMNS} WHERE workspace_id = ? ORDER BY id"))
            .bind(workspace_id)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(Self::row_to_config).collect()
    }
}
