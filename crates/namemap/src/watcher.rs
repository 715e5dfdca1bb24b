use std::path::Path;
use std::sync::Arc;

use curator_core::{CuratorError, CuratorResult};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::factory::NameMapFactory;

/// 监听数据集目录，`.json` 文件变化时清空工厂缓存
pub struct NameMapWatcher {
    watcher: Option<RecommendedWatcher>,
    task: JoinHandle<()>,
}

impl NameMapWatcher {
    /// 开始监听，数据集目录不存在时返回 `None`
    pub fn start(factory: Arc<NameMapFactory>) -> CuratorResult<Option<Self>> {
        let dir = factory.name_map_dir().to_path_buf();
        if !dir.exists() {
            warn!("名称映射目录不存在，跳过监听: {}", dir.display());
            return Ok(None);
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
            match event {
                Ok(event) if is_dataset_change(&event) => {
                    for path in &event.paths {
                        let _ = tx.send(path.display().to_string());
                    }
                }
                Ok(_) => {}
                Err(e) => error!("名称映射目录监听错误: {}", e),
            }
        })
        .map_err(|e| CuratorError::Internal(format!("创建文件监听器失败: {e}")))?;

        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| CuratorError::Internal(format!("监听目录 {} 失败: {e}", dir.display())))?;
        info!("开始监听名称映射目录: {}", dir.display());

        let task = tokio::spawn(async move {
            while let Some(path) = rx.recv().await {
                debug!("检测到名称映射文件变化: {}", path);
                factory.clear_cache().await;
                info!("名称映射缓存已因文件变化清空: {}", path);
            }
        });

        Ok(Some(Self {
            watcher: Some(watcher),
            task,
        }))
    }

    /// 停止监听并等待后台任务退出
    pub async fn stop(mut self) {
        // 释放监听器后通道关闭，后台任务随之结束
        self.watcher.take();
        if let Err(e) = self.task.await {
            warn!("名称映射监听任务异常退出: {}", e);
        }
    }
}

fn is_dataset_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|p| is_json(p))
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, ModifyKind};
    use std::path::PathBuf;

    #[test]
    fn test_only_json_changes_count() {
        let json = Event::new(EventKind::Modify(ModifyKind::Any)).add_path(PathBuf::from("a/genshin.json"));
        let swap = Event::new(EventKind::Create(CreateKind::File)).add_path(PathBuf::from("a/.genshin.json.swp"));
        let access = Event::new(EventKind::Access(notify::event::AccessKind::Any))
            .add_path(PathBuf::from("a/genshin.json"));

        assert!(is_dataset_change(&json));
        assert!(!is_dataset_change(&swap));
        assert!(!is_dataset_change(&access));
    }
}
