pub mod mapping;
pub mod sqlite;

pub use sqlite::*;

use std::str::FromStr;
use std::time::Duration;

use curator_core::{config::DatabaseConfig, CuratorResult};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::debug;

pub struct DatabaseManager {
    pool: SqlitePool,
}

impl DatabaseManager {
    pub async fn new(config: &DatabaseConfig) -> CuratorResult<Self> {
        let connect_options = SqliteConnectOptions::from_str(&config.url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .connect_with(connect_options)
            .await?;

        let manager = Self { pool };
        manager.migrate().await?;
        Ok(manager)
    }

    /// 单连接的内存数据库，每个实例相互独立
    pub async fn in_memory() -> CuratorResult<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        let manager = Self { pool };
        manager.migrate().await?;
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn migrate(&self) -> CuratorResult<()> {
        run_migrations(&self.pool).await
    }

    pub async fn health_check(&self) -> CuratorResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> CuratorResult<()> {
    debug!("Running SQLite database migrations");

    let statements = [
        r#"
        CREATE TABLE IF NOT EXISTS workspaces (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            description TEXT,
            created_by INTEGER,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS search_rules (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL UNIQUE,
            search_text TEXT NOT NULL,
            is_pattern INTEGER NOT NULL DEFAULT 0,
            description TEXT
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            channel_id INTEGER NOT NULL,
            UNIQUE (workspace_id, channel_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS work_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            site_key TEXT NOT NULL,
            artwork_id INTEGER NOT NULL,
            author_id INTEGER,
            status TEXT NOT NULL DEFAULT 'WAIT',
            auto INTEGER NOT NULL DEFAULT 0,
            ext TEXT NOT NULL DEFAULT '{}',
            created_by INTEGER,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_by INTEGER,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE (workspace_id, site_key, artwork_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS auto_push_configs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            mode TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'DISABLED',
            cron_expression TEXT NOT NULL,
            review_count INTEGER NOT NULL,
            push_to_owner INTEGER NOT NULL DEFAULT 0,
            run_once INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_by INTEGER,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            last_run_time DATETIME,
            next_run_time DATETIME
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS push_records (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            review_id INTEGER NOT NULL UNIQUE,
            channel_id INTEGER NOT NULL,
            message_id INTEGER,
            status INTEGER NOT NULL DEFAULT 0,
            created_by INTEGER,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_by INTEGER,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS tag_configs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            workspace_id INTEGER,
            config_key TEXT NOT NULL,
            file_path TEXT,
            description TEXT,
            priority INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            is_global_default INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS artworks (
            site_key TEXT NOT NULL,
            artwork_id INTEGER NOT NULL,
            title TEXT NOT NULL DEFAULT '',
            tags TEXT NOT NULL DEFAULT '[]',
            author_id INTEGER NOT NULL,
            author_name TEXT NOT NULL DEFAULT '',
            author_url TEXT NOT NULL DEFAULT '',
            created_at DATETIME,
            media_kind TEXT NOT NULL DEFAULT 'STATIC',
            url TEXT NOT NULL DEFAULT '',
            media_urls TEXT NOT NULL DEFAULT '[]',
            PRIMARY KEY (site_key, artwork_id)
        )
        "#,
    ];

    for statement in statements {
        sqlx::query(statement).execute(pool).await?;
    }

    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_work_items_status ON work_items(workspace_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_work_items_author ON work_items(workspace_id, site_key, author_id)",
        "CREATE INDEX IF NOT EXISTS idx_work_items_artwork ON work_items(artwork_id)",
        "CREATE INDEX IF NOT EXISTS idx_auto_push_configs_status ON auto_push_configs(status)",
        "CREATE INDEX IF NOT EXISTS idx_tag_configs_workspace ON tag_configs(workspace_id)",
    ];

    for index_sql in indexes {
        sqlx::query(index_sql).execute(pool).await?;
    }

    debug!("Successfully completed SQLite database migrations");
    Ok(())
}
