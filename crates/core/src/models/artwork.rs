use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// 作品媒体类型，动态作品以动画发送
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaKind {
    Static,
    Dynamic,
}

/// 站点返回的作品元数据
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artwork {
    pub site_key: String,
    pub site_name: String,
    pub artwork_id: i64,
    pub title: String,
    pub tags: Vec<String>,
    pub author: Author,
    pub created_at: Option<DateTime<Utc>>,
    pub media_kind: MediaKind,
    pub url: String,
}

/// 一张已下载的媒体内容
pub type MediaBlob = Vec<u8>;
