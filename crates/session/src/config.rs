use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

/// Configuration for a browsing session. Every field falls back to a
/// default when left empty.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub refresh_interval_ms: Option<u64>,
    pub filter_debounce_ms: Option<u64>,
    pub hover_throttle_ms: Option<u64>,
    /// How many catalog threads get their replies fetched for previews.
    pub preview_threads: Option<usize>,
    /// How many replies are shown under a catalog entry.
    pub recent_replies: Option<usize>,
    /// How many boards the post cache keeps.
    pub cached_boards: Option<usize>,
    pub settings_path: Option<PathBuf>,
    /// Whether media urls use https.
    pub use_https: Option<bool>,
}

impl Config {
    const DEFAULT_REFRESH_INTERVAL_MS: u64 = 30_000;
    const DEFAULT_FILTER_DEBOUNCE_MS: u64 = 300;
    const DEFAULT_HOVER_THROTTLE_MS: u64 = 50;
    const DEFAULT_PREVIEW_THREADS: usize = 10;
    const DEFAULT_RECENT_REPLIES: usize = 2;
    const DEFAULT_CACHED_BOARDS: usize = 3;
    const DEFAULT_USE_HTTPS: bool = true;
    const SETTINGS_DIR: &'static str = "chanview";
    const SETTINGS_FILE: &'static str = "settings.json";

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(
            self.refresh_interval_ms
                .unwrap_or(Self::DEFAULT_REFRESH_INTERVAL_MS),
        )
    }

    pub fn filter_debounce(&self) -> Duration {
        Duration::from_millis(
            self.filter_debounce_ms
                .unwrap_or(Self::DEFAULT_FILTER_DEBOUNCE_MS),
        )
    }

    pub fn hover_throttle(&self) -> Duration {
        Duration::from_millis(
            self.hover_throttle_ms
                .unwrap_or(Self::DEFAULT_HOVER_THROTTLE_MS),
        )
    }

    pub fn preview_threads(&self) -> usize {
        self.preview_threads.unwrap_or(Self::DEFAULT_PREVIEW_THREADS)
    }

    pub fn recent_replies(&self) -> usize {
        self.recent_replies.unwrap_or(Self::DEFAULT_RECENT_REPLIES)
    }

    pub fn cached_boards(&self) -> NonZeroUsize {
        self.cached_boards
            .and_then(NonZeroUsize::new)
            .or_else(|| NonZeroUsize::new(Self::DEFAULT_CACHED_BOARDS))
            .unwrap_or(NonZeroUsize::MIN)
    }

    pub fn use_https(&self) -> bool {
        self.use_https.unwrap_or(Self::DEFAULT_USE_HTTPS)
    }

    /// Explicit path, or `<config dir>/chanview/settings.json`.
    pub fn settings_path(&self) -> Option<PathBuf> {
        self.settings_path.clone().or_else(|| {
            dirs::config_dir().map(|dir| dir.join(Self::SETTINGS_DIR).join(Self::SETTINGS_FILE))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(30));
        assert_eq!(cfg.filter_debounce(), Duration::from_millis(300));
        assert_eq!(cfg.preview_threads(), 10);
        assert_eq!(cfg.recent_replies(), 2);
        assert_eq!(cfg.cached_boards().get(), 3);
        assert!(cfg.use_https());
    }

    #[test]
    fn test_zero_cache_size_uses_default() {
        let cfg = Config {
            cached_boards: Some(0),
            settings_path: Some(PathBuf::from("/tmp/x.json")),
            ..Default::default()
        };
        assert_eq!(cfg.cached_boards().get(), 3);
        assert_eq!(cfg.settings_path(), Some(PathBuf::from("/tmp/x.json")));
    }
}
