use std::sync::Arc;

use curator_core::{CuratorError, CuratorResult, SiteService};
use tracing::info;

/// 已注册站点的注册表，按注册顺序遍历
#[derive(Clone, Default)]
pub struct SitesManager {
    sites: Vec<Arc<dyn SiteService>>,
}

impl SitesManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册站点，同名站点会被替换
    pub fn register(&mut self, site: Arc<dyn SiteService>) {
        info!("注册站点: {} ({})", site.site_name(), site.site_key());
        self.sites.retain(|s| s.site_key() != site.site_key());
        self.sites.push(site);
    }

    pub fn with_site(mut self, site: Arc<dyn SiteService>) -> Self {
        self.register(site);
        self
    }

    pub fn get(&self, site_key: &str) -> CuratorResult<Arc<dyn SiteService>> {
        self.sites
            .iter()
            .find(|s| s.site_key() == site_key)
            .cloned()
            .ok_or_else(|| CuratorError::SiteNotFound(site_key.to_string()))
    }

    pub fn all(&self) -> &[Arc<dyn SiteService>] {
        &self.sites
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curator_testing_utils::MockSite;

    #[test]
    fn test_register_and_lookup() {
        let manager = SitesManager::new()
            .with_site(Arc::new(MockSite::new("pixiv")))
            .with_site(Arc::new(MockSite::new("twitter")))
            .with_site(Arc::new(MockSite::new("pixiv")));

        assert_eq!(manager.all().len(), 2);
        assert_eq!(manager.get("twitter").unwrap().site_key(), "twitter");
        assert!(matches!(
            manager.get("unknown"),
            Err(CuratorError::SiteNotFound(_))
        ));
    }
}
