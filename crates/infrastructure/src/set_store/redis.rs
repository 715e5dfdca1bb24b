//! Redis 集合存储实现

use async_trait::async_trait;
use curator_core::{CuratorError, CuratorResult, SetStore};
use redis::aio::ConnectionManager;
use tracing::{debug, error, info, instrument};

/// 基于 Redis SET 命令的集合存储
///
/// 差集使用服务端 SDIFF 计算，取出使用 SPOP，两者在 Redis 中都是原子的。
#[derive(Clone)]
pub struct RedisSetStore {
    conn: ConnectionManager,
    key_prefix: String,
}

impl RedisSetStore {
    pub async fn new(url: &str, key_prefix: impl Into<String>) -> CuratorResult<Self> {
        info!("连接Redis集合存储: {}", url);

        let client = redis::Client::open(url).map_err(|e| CuratorError::Cache(e.to_string()))?;
        let mut conn = client
            .get_connection_manager()
            .await
            .map_err(|e| CuratorError::Cache(e.to_string()))?;

        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CuratorError::Cache(e.to_string()))?;

        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
        })
    }

    fn build_key(&self, key: &str) -> String {
        if self.key_prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    fn map_err(op: &str, key: &str, e: redis::RedisError) -> CuratorError {
        error!("Redis {} 失败, key={}: {}", op, key, e);
        CuratorError::Cache(e.to_string())
    }
}

#[async_trait]
impl SetStore for RedisSetStore {
    #[instrument(skip(self, members), fields(count = members.len()))]
    async fn add(&self, key: &str, members: &[i64]) -> CuratorResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let full_key = self.build_key(key);
        let mut conn = self.conn.clone();
        let added: u64 = redis::cmd("SADD")
            .arg(&full_key)
            .arg(members)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("SADD", &full_key, e))?;
        debug!("SADD {} 新增 {} 个成员", full_key, added);
        Ok(added)
    }

    async fn difference(&self, key: &str, other: &str) -> CuratorResult<Vec<i64>> {
        let full_key = self.build_key(key);
        let other_key = self.build_key(other);
        let mut conn = self.conn.clone();
        redis::cmd("SDIFF")
            .arg(&full_key)
            .arg(&other_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("SDIFF", &full_key, e))
    }

    async fn pop(&self, key: &str) -> CuratorResult<Option<i64>> {
        let full_key = self.build_key(key);
        let mut conn = self.conn.clone();
        redis::cmd("SPOP")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("SPOP", &full_key, e))
    }

    async fn size(&self, key: &str) -> CuratorResult<u64> {
        let full_key = self.build_key(key);
        let mut conn = self.conn.clone();
        redis::cmd("SCARD")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("SCARD", &full_key, e))
    }

    async fn remove(&self, key: &str, members: &[i64]) -> CuratorResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let full_key = self.build_key(key);
        let mut conn = self.conn.clone();
        redis::cmd("SREM")
            .arg(&full_key)
            .arg(members)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("SREM", &full_key, e))
    }

    async fn delete(&self, key: &str) -> CuratorResult<()> {
        let full_key = self.build_key(key);
        let mut conn = self.conn.clone();
        let _: i64 = redis::cmd("DEL")
            .arg(&full_key)
            .query_async(&mut conn)
            .await
            .map_err(|e| Self::map_err("DEL", &full_key, e))?;
        Ok(())
    }
}
