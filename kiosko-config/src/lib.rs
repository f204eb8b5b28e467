//! Loader for workspace configuration with YAML + environment overlays.
//!
//! A `kiosko.yaml` file is merged with `KIOSKO__`-prefixed environment
//! variables, and `${VAR}` placeholders inside string values are expanded
//! recursively (with a depth cap) before deserialising into typed sections.
//! Credentials are expected to arrive through `${...}` references rather
//! than being committed to the file.

use config::{Config, ConfigError, Environment, File};
use kiosko_common::{CapabilityDescriptor, ProviderFlags};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Deserialize)]
pub struct KioskoConfig {
    pub version: Option<String>,
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub scrape: ScrapeConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub sessions: Vec<SessionEntry>,
}

/// Cloud grid endpoints and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub username: Option<String>,
    pub access_key: Option<String>,
    #[serde(default = "default_hub_url")]
    pub hub_url: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            username: None,
            access_key: None,
            hub_url: default_hub_url(),
            api_url: default_api_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ProviderConfig {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.access_key.is_some()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Target site and extraction tuning.
#[derive(Debug, Clone, Deserialize)]
pub struct ScrapeConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_listing_url")]
    pub listing_url: String,
    #[serde(default = "default_max_articles")]
    pub max_articles: usize,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_implicit_wait_secs")]
    pub implicit_wait_secs: u64,
    /// Total attempt budget per article, including the first try.
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_url: default_listing_url(),
            max_articles: default_max_articles(),
            request_timeout_secs: default_request_timeout_secs(),
            implicit_wait_secs: default_implicit_wait_secs(),
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

impl ScrapeConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Translation chain settings. Translation is best-effort; leaving
/// `target_lang` empty disables it.
#[derive(Debug, Clone, Deserialize)]
pub struct TranslateConfig {
    #[serde(default = "default_target_lang")]
    pub target_lang: String,
    #[serde(default = "default_source_lang")]
    pub source_lang: String,
    pub rapid_api_key: Option<String>,
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            target_lang: default_target_lang(),
            source_lang: default_source_lang(),
            rapid_api_key: None,
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl TranslateConfig {
    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_images_dir")]
    pub images_dir: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            images_dir: default_images_dir(),
            data_dir: default_data_dir(),
        }
    }
}

/// Orchestration mode and limits.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(default)]
    pub mode: RunModeConfig,
    /// Cloud plans cap concurrent sessions, so parallel fan-out is bounded.
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
    /// Optional global deadline across all sessions, in seconds.
    pub deadline_secs: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            mode: RunModeConfig::default(),
            max_parallel: default_max_parallel(),
            deadline_secs: None,
        }
    }
}

impl RunConfig {
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunModeConfig {
    Sequential,
    #[default]
    Parallel,
}

/// One requested browser/OS combination.
///
/// Unknown keys are rejected here rather than forwarded to the provider
/// untyped, which keeps descriptor construction itself total.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SessionEntry {
    pub browser: String,
    #[serde(default = "default_browser_version")]
    pub browser_version: String,
    pub os: String,
    pub os_version: String,
    pub device: Option<String>,
    pub real_mobile: Option<bool>,
    pub resolution: Option<String>,
    pub session_name: Option<String>,
}

impl SessionEntry {
    /// Build the immutable capability descriptor for this entry.
    ///
    /// Pure and total: absent optional fields fall back to provider
    /// defaults.
    pub fn to_descriptor(&self) -> CapabilityDescriptor {
        let session_name = self.session_name.clone().unwrap_or_else(|| {
            format!("Kiosko - {} {}", self.browser, self.browser_version)
        });
        CapabilityDescriptor {
            browser: self.browser.clone(),
            browser_version: self.browser_version.clone(),
            os: self.os.clone(),
            os_version: self.os_version.clone(),
            flags: ProviderFlags {
                session_name,
                device: self.device.clone(),
                real_mobile: self.real_mobile,
                resolution: self.resolution.clone(),
                ..ProviderFlags::default()
            },
        }
    }
}

fn default_hub_url() -> String {
    "https://hub-cloud.browserstack.com/wd/hub".into()
}
fn default_api_url() -> String {
    "https://api.browserstack.com/automate/".into()
}
fn default_connect_timeout_secs() -> u64 {
    30
}
fn default_base_url() -> String {
    "https://elpais.com".into()
}
fn default_listing_url() -> String {
    "https://elpais.com/opinion/".into()
}
fn default_max_articles() -> usize {
    5
}
fn default_request_timeout_secs() -> u64 {
    30
}
fn default_implicit_wait_secs() -> u64 {
    10
}
fn default_retry_attempts() -> u32 {
    2
}
fn default_retry_backoff_ms() -> u64 {
    1000
}
fn default_target_lang() -> String {
    "en".into()
}
fn default_source_lang() -> String {
    "es".into()
}
fn default_attempt_timeout_secs() -> u64 {
    30
}
fn default_images_dir() -> String {
    "scraped_images".into()
}
fn default_data_dir() -> String {
    "scraped_data".into()
}
fn default_max_parallel() -> usize {
    5
}
fn default_browser_version() -> String {
    "latest".into()
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct KioskoConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for KioskoConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl KioskoConfigLoader {
    /// Start with the defaults: `KIOSKO__` env overrides, nothing else.
    ///
    /// ```
    /// use kiosko_config::KioskoConfigLoader;
    ///
    /// let config = KioskoConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nsessions: []")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert!(config.sessions.is_empty());
    /// assert_eq!(config.scrape.max_articles, 5);
    /// ```
    pub fn new() -> Self {
        let builder =
            Config::builder().add_source(Environment::with_prefix("KIOSKO").separator("__"));
        Self { builder }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers the format.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet (tests, CLI overrides).
    ///
    /// ```
    /// use kiosko_config::KioskoConfigLoader;
    ///
    /// let cfg = KioskoConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// sessions:
    ///   - browser: "Chrome"
    ///     os: "Windows"
    ///     os_version: "10"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// let desc = cfg.sessions[0].to_descriptor();
    /// assert_eq!(desc.browser, "Chrome");
    /// assert_eq!(desc.browser_version, "latest");
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources.
    ///
    /// `${VAR}` placeholders are expanded before materialising the typed
    /// sections, so secrets can be referenced from the environment.
    pub fn load(self) -> Result<KioskoConfig, ConfigError> {
        let cfg = self.builder.build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: KioskoConfig =
            serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("RIVER", Some("duero"), || {
            let mut v = json!("prefix-${RIVER}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-duero-suffix"));
        });
    }

    #[test]
    fn expands_recursively_with_depth_cap() {
        temp_env::with_vars(
            [
                ("INNER", Some("qux")),
                ("MID", Some("mid-${INNER}")),
                ("OUTER", Some("start-${MID}-end")),
            ],
            || {
                let mut v = json!("X=${OUTER}");
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("X=start-mid-qux-end"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${KIOSKO_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${KIOSKO_DOES_NOT_EXIST}"));
    }

    #[test]
    fn session_entry_rejects_unknown_flags() {
        let err = KioskoConfigLoader::new()
            .with_yaml_str(
                r#"
sessions:
  - browser: "Chrome"
    os: "Windows"
    os_version: "10"
    geo_location: "ES"
"#,
            )
            .load();
        assert!(err.is_err());
    }

    #[test]
    fn descriptor_carries_device_flags() {
        let cfg = KioskoConfigLoader::new()
            .with_yaml_str(
                r#"
sessions:
  - browser: "Safari"
    os: "ios"
    os_version: "15"
    device: "iPhone 13"
    real_mobile: true
"#,
            )
            .load()
            .unwrap();

        let desc = cfg.sessions[0].to_descriptor();
        assert_eq!(desc.flags.device.as_deref(), Some("iPhone 13"));
        assert_eq!(desc.flags.real_mobile, Some(true));
        assert_eq!(desc.flags.resolution, None);
        assert!(desc.flags.session_name.contains("Safari"));
    }
}
