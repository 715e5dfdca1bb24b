use std::collections::HashMap;

use async_trait::async_trait;

use crate::models::{Artwork, MediaBlob, Page, SearchRule};
use crate::CuratorResult;

/// 内容站点接口
///
/// 同时承担候选来源与内容提供两种职责：按规则搜索作品、
/// 查询作者、获取作品元数据与媒体。
#[async_trait]
pub trait SiteService: Send + Sync {
    fn site_key(&self) -> &str;

    fn site_name(&self) -> &str;

    /// 按规则分页搜索作品ID，返回空列表表示没有更多结果
    async fn search_artwork_ids(&self, rule: &SearchRule, page: Page) -> CuratorResult<Vec<i64>>;

    /// 批量查询作品对应的作者ID
    async fn author_ids(&self, artwork_ids: &[i64]) -> CuratorResult<HashMap<i64, i64>>;

    /// 作品不存在时返回 `CuratorError::ArtworkNotFound`
    async fn get_artwork(&self, artwork_id: i64) -> CuratorResult<Artwork>;

    async fn get_artwork_media(&self, artwork_id: i64) -> CuratorResult<Vec<MediaBlob>>;
}
