//! Configuration management for mikan-relay.
//!
//! Configuration is read from `~/.config/mikan-relay/config.toml` unless a
//! path is given on the command line. If the default file doesn't exist, a
//! commented template is written there.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rss: RssConfig,
    pub filters: FilterConfig,
    pub scraper: ScraperConfig,
    pub network: NetworkConfig,
    pub alist: AlistConfig,
    pub dispatch: DispatchConfig,
    pub tracker: TrackerConfig,
    pub database: DatabaseConfig,
    pub notification: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RssConfig {
    /// Subscription feed URLs, token included. A single `url` string is
    /// accepted as well.
    #[serde(alias = "url", deserialize_with = "one_or_many")]
    pub urls: Vec<String>,
    /// Poll interval; "0" runs a single cycle
    pub interval: String,
}

impl Default for RssConfig {
    fn default() -> Self {
        Self {
            urls: Vec::new(),
            interval: "5m".to_string(),
        }
    }
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(url) => vec![url],
        OneOrMany::Many(urls) => urls,
    })
}

impl RssConfig {
    /// `None` means single-run mode.
    pub fn poll_interval(&self) -> Result<Option<Duration>, ConfigError> {
        let interval = parse_interval(&self.interval).map_err(ConfigError::Invalid)?;
        Ok((!interval.is_zero()).then_some(interval))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Named regex patterns. A leading `!` negates a pattern.
    pub patterns: BTreeMap<String, String>,
    /// Names of the patterns to enforce
    pub active: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        let patterns = [
            ("简体", "(简体)|(简中)|(简日)|(CHS)"),
            ("繁体", "(繁体)|(繁中)|(繁日)|(CHT)"),
            ("1080", "(1080[pP])"),
            ("非合集", "!合集"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self {
            patterns,
            active: vec!["1080".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// CSS selector of the element holding the anime name
    pub title_selector: String,
    /// Minimum delay between homepage requests in milliseconds
    pub delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            title_selector: "p.bangumi-title".to_string(),
            delay_ms: 1000,
        }
    }
}

impl ScraperConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Proxy URL applied to every request, e.g. "http://127.0.0.1:7890"
    pub proxy: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            timeout_secs: 10,
            user_agent: concat!("mikan-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlistConfig {
    pub base_url: String,
    pub username: String,
    pub password: String,
    /// Download root on the Alist filesystem
    pub download_path: String,
    /// Offline download tool configured in Alist
    pub tool: String,
    pub delete_policy: String,
}

impl Default for AlistConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            download_path: "/Anime".to_string(),
            tool: "aria2".to_string(),
            delete_policy: "delete_on_upload_succeed".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Delay between drains of the new-resource queue
    pub interval: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval: "10s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub enabled: bool,
    /// Delay between backend task list queries
    pub interval: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: "30s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Ledger location; defaults to the user data directory
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub telegram: TelegramConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
}

impl Config {
    /// Load configuration from `path`, or from the default path.
    ///
    /// A missing default config is created from the template; a missing
    /// explicit path is an error. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(ConfigError::NotFound(p.to_path_buf()));
                }
                p.to_path_buf()
            }
            None => {
                let p = Self::default_config_path()?;
                if !p.exists() {
                    Self::create_default_config(&p)?;
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&config_path).map_err(|e| ConfigError::Io {
            path: config_path.clone(),
            source: e,
        })?;

        Self::from_toml(&content).map_err(|e| ConfigError::Parse {
            path: config_path,
            source: e,
        })
    }

    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get the default config file path: `~/.config/mikan-relay/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("mikan-relay").join("config.toml"))
    }

    /// Ledger path: configured, or `<data_dir>/mikan-relay/ledger.db`.
    pub fn ledger_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(data_dir.join("mikan-relay").join("ledger.db"))
    }

    /// Check settings that deserialization alone cannot.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rss.urls.is_empty() {
            return Err(ConfigError::Invalid("rss.urls is not set".into()));
        }
        if self.rss.urls.iter().any(|url| url.trim().is_empty()) {
            return Err(ConfigError::Invalid("rss.urls has an empty entry".into()));
        }
        if self.alist.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("alist.base_url is not set".into()));
        }
        for name in &self.filters.active {
            if !self.filters.patterns.contains_key(name) {
                return Err(ConfigError::Invalid(format!(
                    "Active filter {:?} has no pattern",
                    name
                )));
            }
        }
        self.rss.poll_interval()?;
        for interval in [&self.dispatch.interval, &self.tracker.interval] {
            let parsed = parse_interval(interval).map_err(ConfigError::Invalid)?;
            if parsed.is_zero() {
                return Err(ConfigError::Invalid(format!(
                    "Interval {:?} must be positive",
                    interval
                )));
            }
        }
        Ok(())
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })?;

        Ok(())
    }

    /// Generate the default config file content with comments.
    pub fn default_config_content() -> &'static str {
        r##"# mikan-relay configuration
#
# Intervals accept "30s", "5m", "1h", "1d" or a plain number of seconds.

[rss]
# Mikan subscription feeds, token included
urls = []
# How often to poll the feed; "0" runs a single cycle and exits
interval = "5m"

[filters]
# Every active pattern must match a title for it to be downloaded.
# A leading "!" turns a pattern into "must not match".
active = ["1080"]

[filters.patterns]
"简体" = "(简体)|(简中)|(简日)|(CHS)"
"繁体" = "(繁体)|(繁中)|(繁日)|(CHT)"
"1080" = "(1080[pP])"
"非合集" = "!合集"

[scraper]
# Element on the episode page holding the anime name
title_selector = "p.bangumi-title"
# Minimum delay between episode page requests (milliseconds)
delay_ms = 1000

[network]
# proxy = "http://127.0.0.1:7890"
timeout_secs = 10

[alist]
base_url = ""
username = ""
password = ""
# Download root, relative to the Alist root
download_path = "/Anime"
tool = "aria2"
delete_policy = "delete_on_upload_succeed"

[dispatch]
interval = "10s"

[tracker]
enabled = true
interval = "30s"

[database]
# path = "/var/lib/mikan-relay/ledger.db"

[notification.telegram]
enabled = false
bot_token = ""
chat_id = ""
"##
    }
}

/// Parse interval string like "30s", "5m", "1h", "1d" or raw seconds.
pub fn parse_interval(s: &str) -> Result<Duration, String> {
    let s = s.trim().to_lowercase();

    let (digits, unit) = match s.char_indices().last() {
        Some((i, c)) if c.is_ascii_alphabetic() => (&s[..i], c),
        _ => (s.as_str(), 's'),
    };
    let multiplier = match unit {
        's' => 1,
        'm' => 60,
        'h' => 3600,
        'd' => 86400,
        _ => {
            return Err(format!(
                "Invalid interval: {}. Use format like '30s', '5m', '1h'",
                s
            ))
        }
    };

    digits
        .trim()
        .parse::<u64>()
        .ok()
        .and_then(|n| n.checked_mul(multiplier))
        .map(Duration::from_secs)
        .ok_or_else(|| format!("Invalid interval: {}. Use format like '30s', '5m', '1h'", s))
}

/// Format interval for display
pub fn format_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 86400 && secs % 86400 == 0 {
        format!("{}d", secs / 86400)
    } else if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
