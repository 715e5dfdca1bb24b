//! # Curator NameMap
//!
//! 标签引擎：把作品的自由文本标签映射为角色的规范名称。
//!
//! - [`NameMap`]: 数据集加载、精确匹配字典与合并正则
//! - [`NameMapFactory`]: 按工作空间解析配置并缓存实例
//! - [`NameMapWatcher`]: 数据集文件变化时清空实例缓存
//! - [`TagFormatterService`]: 标签格式化与配置管理

pub mod factory;
pub mod name_map;
pub mod service;
pub mod watcher;

pub use factory::{CacheEntryInfo, NameMapFactory};
pub use name_map::{format_hash_tags, NameMap};
pub use service::TagFormatterService;
pub use watcher::NameMapWatcher;
