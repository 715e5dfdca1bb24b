use anyhow::{Context, Result};
use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::sections::{
    AutoPushSettings, DatabaseConfig, DeliveryConfig, NameMapSettings, ObservabilityConfig,
    SetStoreConfig, SiteConfig,
};

/// 系统配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub set_store: SetStoreConfig,
    pub auto_push: AutoPushSettings,
    pub name_map: NameMapSettings,
    pub delivery: DeliveryConfig,
    pub sites: Vec<SiteConfig>,
    pub observability: ObservabilityConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            set_store: SetStoreConfig::default(),
            auto_push: AutoPushSettings::default(),
            name_map: NameMapSettings::default(),
            delivery: DeliveryConfig::default(),
            sites: vec![SiteConfig {
                key: "pixiv".to_string(),
                name: "Pixiv".to_string(),
            }],
            observability: ObservabilityConfig::default(),
        }
    }
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序：
    /// 1. 默认配置
    /// 2. 配置文件 (TOML)
    /// 3. 环境变量覆盖 (前缀 CURATOR_，层级分隔符 `__`)
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_path {
            if Path::new(path).exists() {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            } else {
                return Err(anyhow::anyhow!("配置文件不存在: {}", path));
            }
        } else {
            let default_paths = ["config/curator.toml", "curator.toml", "/etc/curator/config.toml"];
            if let Some(path) = default_paths.iter().find(|p| Path::new(p).exists()) {
                builder = builder.add_source(File::new(path, FileFormat::Toml));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("CURATOR")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: AppConfig = builder
            .build()
            .context("构建配置失败")?
            .try_deserialize()
            .context("反序列化配置失败")?;

        config.validate()?;

        Ok(config)
    }

    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(toml_str).context("解析TOML配置失败")?;

        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("序列化配置为TOML失败")
    }

    pub fn validate(&self) -> Result<()> {
        self.database.validate().context("数据库配置验证失败")?;
        self.set_store.validate().context("集合存储配置验证失败")?;
        self.auto_push.validate().context("自动推送配置验证失败")?;
        self.name_map.validate().context("名称映射配置验证失败")?;
        self.delivery.validate().context("推送配置验证失败")?;
        self.observability
            .validate()
            .context("可观测性配置验证失败")?;

        let mut keys = std::collections::HashSet::new();
        for site in &self.sites {
            if !keys.insert(site.key.as_str()) {
                return Err(anyhow::anyhow!("站点重复注册: {}", site.key));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SetStoreBackend;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.auto_push.tick_interval_seconds, 60);
        assert_eq!(config.name_map.cache_capacity, 64);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = AppConfig::from_toml(
            r#"
[set_store]
backend = "memory"

[auto_push]
item_delay_ms = 0
"#,
        )
        .unwrap();

        assert_eq!(config.set_store.backend, SetStoreBackend::Memory);
        assert_eq!(config.auto_push.item_delay_ms, 0);
        assert_eq!(config.auto_push.decision_delay_ms, 2000);
        assert_eq!(config.database.url, "sqlite://curator.db");
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(AppConfig::from_toml("[database]\nurl = \"postgres://x\"\n").is_err());
        assert!(AppConfig::from_toml("[observability]\nlog_level = \"loud\"\n").is_err());
        assert!(AppConfig::from_toml("[name_map]\ncache_capacity = 0\n").is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[delivery]\nowner_chat_id = 42").unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.delivery.owner_chat_id, Some(42));

        assert!(AppConfig::load(Some("/nonexistent/curator.toml")).is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = AppConfig::from_toml(&text).unwrap();
        assert_eq!(parsed.sites, config.sites);
    }
}
