use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

/// 正在执行的配置集合
///
/// 同一配置同时只允许一个执行实例，守卫释放时自动移出集合。
#[derive(Debug, Clone, Default)]
pub struct RunningConfigs {
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl RunningConfigs {
    pub fn new() -> Self {
        Self::default()
    }

    /// 尝试占用配置，已在执行时返回 None
    pub fn try_acquire(&self, config_id: i64) -> Option<RunningGuard> {
        if self.lock().insert(config_id) {
            Some(RunningGuard {
                config_id,
                inner: self.inner.clone(),
            })
        } else {
            None
        }
    }

    pub fn contains(&self, config_id: i64) -> bool {
        self.lock().contains(&config_id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<i64>> {
        // 集合只做插入删除，锁中毒时数据仍然可用
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

pub struct RunningGuard {
    config_id: i64,
    inner: Arc<Mutex<HashSet<i64>>>,
}

impl RunningGuard {
    pub fn config_id(&self) -> i64 {
        self.config_id
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        let mut set = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        set.remove(&self.config_id);
    }
}
