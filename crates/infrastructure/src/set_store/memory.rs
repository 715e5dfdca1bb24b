use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use curator_core::{CuratorResult, SetStore};
use tokio::sync::Mutex;

/// 内存集合存储，用于单进程部署和测试
#[derive(Debug, Clone, Default)]
pub struct InMemorySetStore {
    sets: Arc<Mutex<HashMap<String, HashSet<i64>>>>,
}

impl InMemorySetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 返回集合的快照
    pub async fn members(&self, key: &str) -> HashSet<i64> {
        self.sets.lock().await.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl SetStore for InMemorySetStore {
    async fn add(&self, key: &str, members: &[i64]) -> CuratorResult<u64> {
        if members.is_empty() {
            return Ok(0);
        }
        let mut sets = self.sets.lock().await;
        let set = sets.entry(key.to_string()).or_default();
        Ok(members.iter().filter(|m| set.insert(**m)).count() as u64)
    }

    async fn difference(&self, key: &str, other: &str) -> CuratorResult<Vec<i64>> {
        let sets = self.sets.lock().await;
        let Some(set) = sets.get(key) else {
            return Ok(Vec::new());
        };
        Ok(match sets.get(other) {
            Some(other) => set.difference(other).copied().collect(),
            None => set.iter().copied().collect(),
        })
    }

    async fn pop(&self, key: &str) -> CuratorResult<Option<i64>> {
        let mut sets = self.sets.lock().await;
        let Some(set) = sets.get_mut(key) else {
            return Ok(None);
        };
        let member = set.iter().next().copied();
        if let Some(member) = member {
            set.remove(&member);
        }
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(member)
    }

    async fn size(&self, key: &str) -> CuratorResult<u64> {
        Ok(self
            .sets
            .lock()
            .await
            .get(key)
            .map(|s| s.len() as u64)
            .unwrap_or(0))
    }

    async fn remove(&self, key: &str, members: &[i64]) -> CuratorResult<u64> {
        let mut sets = self.sets.lock().await;
        let Some(set) = sets.get_mut(key) else {
            return Ok(0);
        };
        let removed = members.iter().filter(|m| set.remove(*m)).count() as u64;
        if set.is_empty() {
            sets.remove(key);
        }
        Ok(removed)
    }

    async fn delete(&self, key: &str) -> CuratorResult<()> {
        self.sets.lock().await.remove(key);
        Ok(())
    }
}
