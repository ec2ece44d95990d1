//! Shared widget configuration.
//!
//! Uses `arc-swap` for lock-free reads and atomic replacement. The host
//! hands a clone of the handle to every controller it constructs, so a
//! later `init` is visible to existing instances the next time they read
//! their fallback text.

use crate::config::WidgetConfig;
use arc_swap::ArcSwap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct ConfigHandle(Arc<ArcSwap<WidgetConfig>>);

impl Default for ConfigHandle {
    fn default() -> Self {
        Self::new(WidgetConfig::default())
    }
}

impl ConfigHandle {
    pub fn new(config: WidgetConfig) -> Self {
        Self(Arc::new(ArcSwap::from_pointee(config)))
    }

    #[inline]
    pub fn load(&self) -> Arc<WidgetConfig> {
        self.0.load_full()
    }

    pub fn store(&self, config: WidgetConfig) {
        self.0.store(Arc::new(config));
    }

    /// Fallback label used when an instance has no `alt`.
    pub fn default_text(&self) -> String {
        self.0.load().default_text.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_updates() {
        let handle = ConfigHandle::default();
        let shared = handle.clone();

        handle.store(WidgetConfig {
            default_text: "image missing".into(),
            ..WidgetConfig::default()
        });

        assert_eq!(shared.default_text(), "image missing");
    }

    #[test]
    fn test_load_snapshot_survives_store() {
        let handle = ConfigHandle::default();
        let before = handle.load();
        handle.store(WidgetConfig {
            auto_convert: false,
            ..WidgetConfig::default()
        });

        assert!(before.auto_convert);
        assert!(!handle.load().auto_convert);
    }
}
