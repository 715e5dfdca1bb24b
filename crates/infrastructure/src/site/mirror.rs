//! 本地镜像站点
//!
//! 作品元数据由外部采集程序写入 `artworks` 表，媒体按记录中的地址下载。

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use curator_core::{
    Artwork, Author, CuratorError, CuratorResult, MediaBlob, MediaKind, Page, SearchRule,
    SiteService,
};
use regex::RegexBuilder;
use reqwest::Client;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tracing::debug;

use crate::database::mapping::MappingHelpers;

pub struct MirrorSite {
    key: String,
    name: String,
    pool: SqlitePool,
    client: Client,
}

impl MirrorSite {
    pub fn new(key: impl Into<String>, name: impl Into<String>, pool: SqlitePool) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        Self {
            key: key.into(),
            name: name.into(),
            pool,
            client,
        }
    }

    /// 写入或覆盖一条作品元数据
    pub async fn upsert_artwork(&self, artwork: &Artwork, media_urls: &[String]) -> CuratorResult<()> {
        sqlx::query(
            r#"
            INSERT INTO artworks (site_key, artwork_id, title, tags, author_id, author_name, author_url,
                                  created_at, media_kind, url, media_urls)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(site_key, artwork_id) DO UPDATE SET
                title = excluded.title,
                tags = excluded.tags,
                author_id = excluded.author_id,
                author_name = excluded.author_name,
                author_url = excluded.author_url,
                created_at = excluded.created_at,
                media_kind = excluded.media_kind,
                url = excluded.url,
                media_urls = excluded.media_urls
            "#,
        )
        .bind(&self.key)
        .bind(artwork.artwork_id)
        .bind(&artwork.title)
        .bind(serde_json::to_string(&artwork.tags)?)
        .bind(artwork.author.id)
        .bind(&artwork.author.name)
        .bind(&artwork.author.url)
        .bind(artwork.created_at)
        .bind(media_kind_name(artwork.media_kind))
        .bind(&artwork.url)
        .bind(serde_json::to_string(media_urls)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    fn row_to_artwork(&self, row: &SqliteRow) -> CuratorResult<Artwork> {
        let media_kind: String = row.try_get("media_kind")?;
        Ok(Artwork {
            site_key: self.key.clone(),
            site_name: self.name.clone(),
            artwork_id: row.try_get("artwork_id")?,
            title: row.try_get("title")?,
            tags: MappingHelpers::parse_string_list(row, "tags")?,
            author: Author {
                id: row.try_get("author_id")?,
                name: row.try_get("author_name")?,
                url: row.try_get("author_url")?,
            },
            created_at: row.try_get("created_at")?,
            media_kind: if media_kind == "DYNAMIC" {
                MediaKind::Dynamic
            } else {
                MediaKind::Static
            },
            url: row.try_get("url")?,
        })
    }

    /// 普通规则按空白拆分为标签，全部命中才算匹配
    fn matches_tags(rule_text: &str, tags: &[String]) -> bool {
        rule_text.split_whitespace().all(|wanted| {
            tags.iter()
                .any(|tag| tag.eq_ignore_ascii_case(wanted.trim_start_matches('#')))
        })
    }
}

fn media_kind_name(kind: MediaKind) -> &'static str {
    match kind {
        MediaKind::Static => "STATIC",
        MediaKind::Dynamic => "DYNAMIC",
    }
}

#[async_trait]
impl SiteService for MirrorSite {
    fn site_key(&self) -> &str {
        &self.key
    }

    fn site_name(&self) -> &str {
        &self.name
    }

    async fn search_artwork_ids(&self, rule: &SearchRule, page: Page) -> CuratorResult<Vec<i64>> {
        let rows = sqlx::query(
            "SELECT artwork_id, title, tags FROM artworks WHERE site_key = ? ORDER BY artwork_id",
        )
        .bind(&self.key)
        .fetch_all(&self.pool)
        .await?;

        let pattern = if rule.is_pattern {
            Some(
                RegexBuilder::new(&rule.search_text)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| CuratorError::InvalidRegex {
                        pattern: rule.search_text.clone(),
                        message: e.to_string(),
                    })?,
            )
        } else {
            None
        };

        let mut matched = Vec::new();
        for row in &rows {
            let tags = MappingHelpers::parse_string_list(row, "tags")?;
            let hit = match &pattern {
                Some(regex) => {
                    let title: String = row.try_get("title")?;
                    regex.is_match(&title) || tags.iter().any(|t| regex.is_match(t))
                }
                None => Self::matches_tags(&rule.search_text, &tags),
            };
            if hit {
                matched.push(row.try_get::<i64, _>("artwork_id")?);
            }
        }

        let ids: Vec<i64> = matched
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect();
        debug!("站点 {} 第 {} 页搜索到 {} 个作品", self.key, page.number, ids.len());
        Ok(ids)
    }

    async fn author_ids(&self, artwork_ids: &[i64]) -> CuratorResult<HashMap<i64, i64>> {
        let mut authors = HashMap::with_capacity(artwork_ids.len());
        for chunk in artwork_ids.chunks(500) {
            let sql = format!(
                "SELECT artwork_id, author_id FROM artworks WHERE site_key = ?1 AND artwork_id IN ({})",
                MappingHelpers::placeholders(chunk.len(), 2)
            );
            let mut query = sqlx::query(&sql).bind(&self.key);
            for id in chunk {
                query = query.bind(*id);
            }
            for row in query.fetch_all(&self.pool).await? {
                authors.insert(row.try_get("artwork_id")?, row.try_get("author_id")?);
            }
        }
        Ok(authors)
    }

    async fn get_artwork(&self, artwork_id: i64) -> CuratorResult<Artwork> {
        let row = sqlx::query(
            r#"
            SELECT artwork_id, title, tags, author_id, author_name, author_url, created_at, media_kind, url
            FROM artworks WHERE site_key = ? AND artwork_id = ?
            "#,
        )
        .bind(&self.key)
        .bind(artwork_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => self.row_to_artwork(&row),
            None => Err(CuratorError::ArtworkNotFound {
                site_key: self.key.clone(),
                artwork_id,
            }),
        }
    }

    async fn get_artwork_media(&self, artwork_id: i64) -> CuratorResult<Vec<MediaBlob>> {
        let raw: Option<String> =
            sqlx::query_scalar("SELECT media_urls FROM artworks WHERE site_key = ? AND artwork_id = ?")
                .bind(&self.key)
                .bind(artwork_id)
                .fetch_optional(&self.pool)
                .await?;
        let Some(raw) = raw else {
            return Err(CuratorError::ArtworkNotFound {
                site_key: self.key.clone(),
                artwork_id,
            });
        };
        let urls: Vec<String> = serde_json::from_str(&raw)?;

        let mut media = Vec::with_capacity(urls.len());
        for url in urls {
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| CuratorError::Internal(format!("下载媒体失败 {url}: {e}")))?;
            let bytes = response
                .bytes()
                .await
                .map_err(|e| CuratorError::Internal(format!("读取媒体失败 {url}: {e}")))?;
            media.push(bytes.to_vec());
        }
        Ok(media)
    }
}
