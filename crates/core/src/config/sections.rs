use serde::{Deserialize, Serialize};

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connection_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://curator.db".to_string(),
            max_connections: 5,
            min_connections: 1,
            connection_timeout_seconds: 30,
        }
    }
}

impl DatabaseConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.url.is_empty() {
            return Err(anyhow::anyhow!("数据库URL不能为空"));
        }

        if !self.url.starts_with("sqlite:") {
            return Err(anyhow::anyhow!("数据库URL必须是SQLite格式"));
        }

        if self.max_connections == 0 {
            return Err(anyhow::anyhow!("最大连接数必须大于0"));
        }

        if self.min_connections > self.max_connections {
            return Err(anyhow::anyhow!("最小连接数不能大于最大连接数"));
        }

        Ok(())
    }
}

/// 集合存储后端
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SetStoreBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SetStoreConfig {
    pub backend: SetStoreBackend,
    pub url: String,
    /// 所有集合键的公共前缀
    pub key_prefix: String,
}

impl Default for SetStoreConfig {
    fn default() -> Self {
        Self {
            backend: SetStoreBackend::Redis,
            url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "curator".to_string(),
        }
    }
}

impl SetStoreConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.backend == SetStoreBackend::Redis && !self.url.starts_with("redis") {
            return Err(anyhow::anyhow!("Redis URL格式无效: {}", self.url));
        }
        Ok(())
    }
}

/// 自动推送调度参数，所有等待时间都可以配置为0
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoPushSettings {
    pub enabled: bool,
    pub tick_interval_seconds: u64,
    pub initial_delay_seconds: u64,
    /// 两次自动审核之间的间隔
    pub decision_delay_ms: u64,
    /// 两次推送之间的间隔
    pub item_delay_ms: u64,
    /// 限流等待时间之外额外等待的秒数
    pub rate_limit_padding_seconds: u64,
    pub network_retry_delay_seconds: u64,
    pub max_delivery_retries: u32,
    pub max_rate_limit_retries: u32,
    pub candidate_page_size: u32,
    pub known_page_size: u32,
    pub review_page_size: u32,
    pub shutdown_timeout_seconds: u64,
}

impl Default for AutoPushSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_interval_seconds: 60,
            initial_delay_seconds: 30,
            decision_delay_ms: 2000,
            item_delay_ms: 3000,
            rate_limit_padding_seconds: 1,
            network_retry_delay_seconds: 5,
            max_delivery_retries: 3,
            max_rate_limit_retries: 10,
            candidate_page_size: 10000,
            known_page_size: 10000,
            review_page_size: 1000,
            shutdown_timeout_seconds: 30,
        }
    }
}

impl AutoPushSettings {
    /// 所有等待时间为0的参数，供测试使用
    pub fn without_delays() -> Self {
        Self {
            initial_delay_seconds: 0,
            decision_delay_ms: 0,
            item_delay_ms: 0,
            rate_limit_padding_seconds: 0,
            network_retry_delay_seconds: 0,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_interval_seconds == 0 {
            return Err(anyhow::anyhow!("调度间隔必须大于0"));
        }
        if self.candidate_page_size == 0 || self.known_page_size == 0 || self.review_page_size == 0
        {
            return Err(anyhow::anyhow!("分页大小必须大于0"));
        }
        Ok(())
    }
}

/// 名称映射数据集配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NameMapSettings {
    pub base_path: String,
    pub dir: String,
    pub cache_capacity: usize,
    /// 监听数据集目录，文件变化时清空缓存
    pub watch: bool,
}

impl Default for NameMapSettings {
    fn default() -> Self {
        Self {
            base_path: "metadata".to_string(),
            dir: "name_map".to_string(),
            cache_capacity: 64,
            watch: true,
        }
    }
}

impl NameMapSettings {
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.cache_capacity == 0 {
            return Err(anyhow::anyhow!("名称映射缓存容量必须大于0"));
        }
        Ok(())
    }
}

/// 推送目标配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    pub api_base: String,
    pub bot_token: String,
    /// 所有者会话，开启镜像推送时使用
    pub owner_chat_id: Option<i64>,
    pub request_timeout_seconds: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.telegram.org".to_string(),
            bot_token: String::new(),
            owner_chat_id: None,
            request_timeout_seconds: 30,
        }
    }
}

impl DeliveryConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.api_base.starts_with("http://") && !self.api_base.starts_with("https://") {
            return Err(anyhow::anyhow!("推送接口地址格式无效: {}", self.api_base));
        }
        if self.request_timeout_seconds == 0 {
            return Err(anyhow::anyhow!("推送请求超时时间必须大于0"));
        }
        Ok(())
    }
}

/// 本地镜像站点
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    pub key: String,
    pub name: String,
}

/// 可观测性配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    pub log_level: String,
    /// json 或 pretty
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ObservabilityConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!("无效的日志级别: {}", self.log_level));
        }
        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(anyhow::anyhow!("无效的日志格式: {}", self.log_format));
        }
        Ok(())
    }
}
