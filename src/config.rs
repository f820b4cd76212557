use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub forum: ForumConfig,
    pub rate: RateConfig,
    pub discovery: DiscoveryConfig,
    pub storage: StorageConfig,
    pub dispatch: DispatchConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForumConfig {
    /// Base URL of the forum, no trailing slash
    pub base_url: String,
    /// Path template for a single post; `{id}` is replaced with the post id
    pub post_path_template: String,
    /// Substring whose presence in a 200 body means the post does not exist
    pub missing_marker: String,
    /// Per-request network timeout
    pub fetch_timeout_ms: u64,
}

impl Default for ForumConfig {
    fn default() -> Self {
        Self {
            base_url: "https://osu.ppy.sh".to_string(),
            post_path_template: "/community/forums/posts/{id}".to_string(),
            missing_marker: "Page Missing".to_string(),
            fetch_timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    /// Lower bound on the inter-probe delay, seconds
    pub post_min_secs: f64,
    /// Upper bound on the inter-probe delay, seconds
    pub post_max_secs: f64,
    /// Amount the delay moves per adjustment, seconds
    pub step_secs: f64,
    /// The delay may only shrink once `grace_multiplier * interval` seconds
    /// have passed since the last rate-limit response
    pub grace_multiplier: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            post_min_secs: 2.0,
            post_max_secs: 30.0,
            step_secs: 1.0,
            grace_multiplier: 3.0,
        }
    }
}

impl RateConfig {
    /// Starting interval on (re)start: the midpoint of the bounds
    pub fn midpoint_secs(&self) -> f64 {
        (self.post_min_secs + self.post_max_secs) / 2.0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Cursor value used on first-ever run, before any post is confirmed
    pub bootstrap_post_id: i64,
    /// Deadline for one full discovery cycle, including retries
    pub cycle_timeout_ms: u64,
    /// Re-probe earlier frontier ids after a find, to catch posts that were
    /// transiently unavailable on the previous pass
    pub recheck: bool,
    /// Pause before retrying after a cycle-level failure
    pub retry_pause_ms: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            bootstrap_post_id: 0,
            cycle_timeout_ms: 60_000,
            recheck: true,
            retry_pause_ms: 5_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("postwatch")
                .join("postwatch.db"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Capacity of the discovery queue between the two loops
    pub queue_capacity: usize,
    /// How long the dispatch loop blocks on an empty queue before re-checking
    /// the stop signal
    pub pop_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            pop_timeout_ms: 1_000,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            forum: ForumConfig::default(),
            rate: RateConfig::default(),
            discovery: DiscoveryConfig::default(),
            storage: StorageConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
