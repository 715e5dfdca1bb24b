use async_trait::async_trait;
use chrono::Utc;
use curator_core::{CuratorError, CuratorResult, TagConfig, TagConfigRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteTagConfigRepository {
    pool: SqlitePool,
}

impl SqliteTagConfigRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_config(row: &SqliteRow) -> CuratorResult<TagConfig> {
        Ok(TagConfig {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            config_key: row.try_get("config_key")?,
            file_path: row.try_get("file_path")?,
            description: row.try_get("description")?,
            priority: row.try_get("priority")?,
            is_active: row.try_get("is_active")?,
            is_global_default: row.try_get("is_global_default")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, workspace_id, config_key, file_path, description, priority, \
     is_active, is_global_default, created_at, updated_at FROM tag_configs";

#[async_trait]
impl TagConfigRepository for SqliteTagConfigRepository {
    async fn create(&self, config: &TagConfig) -> CuratorResult<TagConfig> {
        let result = sqlx::query(
            r#"
            INSERT INTO tag_configs (workspace_id, config_key, file_path, description, priority, is_active,
                                     is_global_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(config.workspace_id)
        .bind(&config.config_key)
        .bind(&config.file_path)
        .bind(&config.description)
        .bind(config.priority)
        .bind(config.is_active)
        .bind(config.is_global_default)
        .bind(config.created_at)
        .bind(config.updated_at)
        .execute(&self.pool)
        .await?;

        let mut created = config.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<TagConfig>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn update(&self, config: &TagConfig) -> CuratorResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE tag_configs
            SET workspace_id = ?, config_key = ?, file_path = ?, description = ?, priority = ?,
                is_active = ?, is_global_default = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(config.workspace_id)
        .bind(&config.config_key)
        .bind(&config.file_path)
        .bind(&config.description)
        .bind(config.priority)
        .bind(config.is_active)
        .bind(config.is_global_default)
        .bind(Utc::now())
        .bind(config.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CuratorError::TagConfigNotFound { id: config.id });
        }
        Ok(())
    }

    async fn delete(&self, id: i64) -> CuratorResult<bool> {
        let result = sqlx::query("DELETE FROM tag_configs WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_by_workspace(&self, workspace_id: Option<i64>) -> CuratorResult<Vec<TagConfig>> {
        let rows = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE workspace_id IS ? ORDER BY priority DESC, id"
        ))
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_config).collect()
    }

    async fn get_active(&self, workspace_id: Option<i64>) -> CuratorResult<Option<TagConfig>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE workspace_id IS ? AND is_active = 1 ORDER BY priority DESC, id LIMIT 1"
        ))
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn get_global_default(&self) -> CuratorResult<Option<TagConfig>> {
        let row = sqlx::query(&format!(
            "{SELECT_COLUMNS} WHERE is_global_default = 1 AND is_active = 1 ORDER BY id LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_config).transpose()
    }

    async fn set_global_default(&self, id: i64) -> CuratorResult<bool> {
        let mut tx = self.pool.begin().await?;
        let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM tag_configs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(false);
        }

        let now = Utc::now();
        sqlx::query("UPDATE tag_configs SET is_global_default = 0, updated_at = ? WHERE is_global_default = 1")
            .bind(now)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE tag_configs SET is_global_default = 1, updated_at = ? WHERE id = ?")
            .bind(now)
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(true)
    }
}
