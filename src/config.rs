use crate::level::Tier;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:5000";
pub const DEFAULT_DETECTOR_URL: &str = "http://127.0.0.1:5001";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Config {
    pub backend_url: String,
    /// Local hand-landmark detector sidecar.
    pub detector_url: String,
    /// Single per-tier confidence table for the camera flow; the source
    /// of truth for what the classifier must reach before a sign passes.
    pub expert_threshold: f64,
    pub pro_threshold: f64,
    /// Bounded wait for camera/video metadata before giving up.
    pub camera_metadata_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            detector_url: DEFAULT_DETECTOR_URL.to_string(),
            expert_threshold: 0.85,
            pro_threshold: 0.70,
            camera_metadata_timeout_secs: 5,
        }
    }
}

impl Config {
    /// Minimum classifier confidence for a sign to pass at this tier.
    /// Boundary inclusive: a result at exactly the threshold passes.
    pub fn confidence_threshold(&self, tier: Tier) -> f64 {
        match tier {
            Tier::Expert => self.expert_threshold,
            _ => self.pro_threshold,
        }
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "signik") {
            pd.config_dir().join("config.json")
        } else {
            PathBuf::from("signik_config.json")
        };
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        if let Ok(bytes) = fs::read(&self.path) {
            if let Ok(cfg) = serde_json::from_slice::<Config>(&bytes) {
                return cfg;
            }
        }
        Config::default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg).unwrap_or_default();
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        let cfg = Config {
            backend_url: "http://10.0.0.2:8000".into(),
            detector_url: "https://detector.local".into(),
            expert_threshold: 0.9,
            pro_threshold: 0.75,
            camera_metadata_timeout_secs: 10,
        };
        store.save(&cfg).unwrap();
        let loaded = store.load();
        assert_eq!(cfg, loaded);
    }

    #[test]
    fn threshold_table_is_keyed_by_tier() {
        let cfg = Config::default();
        assert_eq!(cfg.confidence_threshold(Tier::Expert), 0.85);
        assert_eq!(cfg.confidence_threshold(Tier::Pro), 0.70);
        // Non-camera tiers fall back to the lenient threshold
        assert_eq!(cfg.confidence_threshold(Tier::Beginner), 0.70);
    }

    #[test]
    fn missing_file_yields_default() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        assert_eq!(store.load(), Config::default());
    }
}
