//! 测试数据构造器

use chrono::{DateTime, Utc};
use curator_core::{
    Artwork, Author, AutoPushConfig, AutoPushMode, AutoPushStatus, MediaKind, WorkItem,
    WorkItemStatus,
};

pub struct WorkItemBuilder {
    item: WorkItem,
}

impl WorkItemBuilder {
    pub fn new() -> Self {
        Self {
            item: WorkItem::new(1, "pixiv", 1, None, None),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.item.id = id;
        self
    }

    pub fn with_workspace(mut self, workspace_id: i64) -> Self {
        self.item.workspace_id = workspace_id;
        self
    }

    pub fn with_site(mut self, site_key: &str) -> Self {
        self.item.site_key = site_key.to_string();
        self
    }

    pub fn with_artwork(mut self, artwork_id: i64) -> Self {
        self.item.artwork_id = artwork_id;
        self
    }

    pub fn with_author(mut self, author_id: i64) -> Self {
        self.item.author_id = Some(author_id);
        self
    }

    pub fn with_status(mut self, status: WorkItemStatus) -> Self {
        self.item.status = status;
        self
    }

    pub fn auto(mut self) -> Self {
        self.item.auto = true;
        self
    }

    pub fn build(self) -> WorkItem {
        self.item
    }
}

impl Default for WorkItemBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct AutoPushConfigBuilder {
    config: AutoPushConfig,
}

impl AutoPushConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: AutoPushConfig::new(1, "test_config", AutoPushMode::Batch, "0 * * * *", 10),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.config.id = id;
        self
    }

    pub fn with_workspace(mut self, workspace_id: i64) -> Self {
        self.config.workspace_id = workspace_id;
        self
    }

    pub fn with_mode(mut self, mode: AutoPushMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_status(mut self, status: AutoPushStatus) -> Self {
        self.config.status = status;
        self
    }

    pub fn with_cron(mut self, cron_expression: &str) -> Self {
        self.config.cron_expression = cron_expression.to_string();
        self
    }

    pub fn with_review_count(mut self, review_count: u32) -> Self {
        self.config.review_count = review_count;
        self
    }

    pub fn push_to_owner(mut self) -> Self {
        self.config.push_to_owner = true;
        self
    }

    pub fn run_once(mut self) -> Self {
        self.config.run_once = true;
        self
    }

    pub fn with_next_run_time(mut self, next_run_time: DateTime<Utc>) -> Self {
        self.config.next_run_time = Some(next_run_time);
        self
    }

    pub fn with_last_run_time(mut self, last_run_time: DateTime<Utc>) -> Self {
        self.config.last_run_time = Some(last_run_time);
        self
    }

    pub fn build(self) -> AutoPushConfig {
        self.config
    }
}

impl Default for AutoPushConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ArtworkBuilder {
    artwork: Artwork,
}

impl ArtworkBuilder {
    pub fn new(artwork_id: i64) -> Self {
        Self {
            artwork: Artwork {
                site_key: "pixiv".to_string(),
                site_name: "Pixiv".to_string(),
                artwork_id,
                title: format!("artwork {artwork_id}"),
                tags: Vec::new(),
                author: Author {
                    id: 1,
                    name: "author".to_string(),
                    url: "https://example.com/users/1".to_string(),
                },
                created_at: None,
                media_kind: MediaKind::Static,
                url: format!("https://example.com/artworks/{artwork_id}"),
            },
        }
    }

    pub fn with_site(mut self, site_key: &str) -> Self {
        self.artwork.site_key = site_key.to_string();
        self
    }

    pub fn with_title(mut self, title: &str) -> Self {
        self.artwork.title = title.to_string();
        self
    }

    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.artwork.tags = tags.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_author(mut self, id: i64, name: &str) -> Self {
        self.artwork.author.id = id;
        self.artwork.author.name = name.to_string();
        self.artwork.author.url = format!("https://example.com/users/{id}");
        self
    }

    pub fn dynamic(mut self) -> Self {
        self.artwork.media_kind = MediaKind::Dynamic;
        self
    }

    pub fn build(self) -> Artwork {
        self.artwork
    }
}
