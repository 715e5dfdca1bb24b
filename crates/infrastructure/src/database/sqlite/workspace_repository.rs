use async_trait::async_trait;
use curator_core::{Channel, CuratorResult, SearchRule, Workspace, WorkspaceRepository};
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

pub struct SqliteWorkspaceRepository {
    pool: SqlitePool,
}

impl SqliteWorkspaceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_rule(row: &SqliteRow) -> CuratorResult<SearchRule> {
        Ok(SearchRule {
            id: row.try_get("id")?,
            workspace_id: row.try_get("workspace_id")?,
            search_text: row.try_get("search_text")?,
            is_pattern: row.try_get("is_pattern")?,
            description: row.try_get("description")?,
        })
    }
}

#[async_trait]
impl WorkspaceRepository for SqliteWorkspaceRepository {
    async fn create(&self, workspace: &Workspace) -> CuratorResult<Workspace> {
        let result = sqlx::query(
            "INSERT INTO workspaces (name, description, created_by, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&workspace.name)
        .bind(&workspace.description)
        .bind(workspace.created_by)
        .bind(workspace.created_at)
        .execute(&self.pool)
        .await?;

        let mut created = workspace.clone();
        created.id = result.last_insert_rowid();
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> CuratorResult<Option<Workspace>> {
        let row = sqlx::query(
            "SELECT id, name, description, created_by, created_at FROM workspaces WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> CuratorResult<Workspace> {
            Ok(Workspace {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                description: row.try_get("description")?,
                created_by: row.try_get("created_by")?,
                created_at: row.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn get_rule(&self, workspace_id: i64) -> CuratorResult<Option<SearchRule>> {
        let row = sqlx::query(
            "SELECT id, workspace_id, search_text, is_pattern, description FROM search_rules WHERE workspace_id = ?",
        )
        .bind(workspace_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(Self::row_to_rule).transpose()
    }

    async fn save_rule(&self, rule: &SearchRule) -> CuratorResult<SearchRule> {
        sqlx::query(
            r#"
            INSERT INTO search_rules (workspace_id, search_text, is_pattern, description)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(workspace_id) DO UPDATE SET
                search_text = excluded.search_text,
                is_pattern = excluded.is_pattern,
                description = excluded.description
            "#,
        )
        .bind(rule.workspace_id)
        .bind(&rule.search_text)
        .bind(rule.is_pattern)
        .bind(&rule.description)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(
            "SELECT id, workspace_id, search_text, is_pattern, description FROM search_rules WHERE workspace_id = ?",
        )
        .bind(rule.workspace_id)
        .fetch_one(&self.pool)
        .await?;
        Self::row_to_rule(&row)
    }

    async fn list_channels(&self, workspace_id: i64) -> CuratorResult<Vec<Channel>> {
        let rows = sqlx::query(
            "SELECT id, workspace_id, channel_id FROM channels WHERE workspace_id = ? ORDER BY id",
        )
        .bind(workspace_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> CuratorResult<Channel> {
                Ok(Channel {
                    id: row.try_get("id")?,
                    workspace_id: row.try_get("workspace_id")?,
                    channel_id: row.try_get("channel_id")?,
                })
            })
            .collect()
    }

    async fn add_channel(&self, workspace_id: i64, channel_id: i64) -> CuratorResult<Channel> {
        sqlx::query("INSERT OR IGNORE INTO channels (workspace_id, channel_id) VALUES (?, ?)")
            .bind(workspace_id)
            .bind(channel_id)
            .execute(&self.pool)
            .await?;

        let id: i64 =
            sqlx::query_scalar("SELECT id FROM channels WHERE workspace_id = ? AND channel_id = ?")
                .bind(workspace_id)
                .bind(channel_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(Channel {
            id,
            workspace_id,
            channel_id,
        })
    }
}
