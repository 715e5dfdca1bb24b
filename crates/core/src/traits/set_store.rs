use async_trait::async_trait;

use crate::CuratorResult;

/// 整数集合存储接口
///
/// 队列引擎只依赖这组集合操作，不依赖集合存储的具体实现。
/// 所有操作都以键为单位，单个操作必须是原子的：
/// 同一个成员被并发的两次 `pop` 取出时，只有一方能拿到。
#[async_trait]
pub trait SetStore: Send + Sync {
    /// 加入成员，返回新加入的数量
    async fn add(&self, key: &str, members: &[i64]) -> CuratorResult<u64>;

    /// 返回在 `key` 中但不在 `other` 中的成员
    async fn difference(&self, key: &str, other: &str) -> CuratorResult<Vec<i64>>;

    /// 随机取出并移除一个成员
    async fn pop(&self, key: &str) -> CuratorResult<Option<i64>>;

    async fn size(&self, key: &str) -> CuratorResult<u64>;

    /// 移除成员，返回实际移除的数量
    async fn remove(&self, key: &str, members: &[i64]) -> CuratorResult<u64>;

    async fn delete(&self, key: &str) -> CuratorResult<()>;
}
