use kiosko_config::{KioskoConfigLoader, RunModeConfig};
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn test_config_load() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
version: "0.1"
provider:
  username: "${KIOSKO_TEST_BS_USER}"
  access_key: "${KIOSKO_TEST_BS_KEY}"
run:
  mode: sequential
  max_parallel: 2
  deadline_secs: 120
scrape:
  max_articles: 3
sessions:
  - browser: "Chrome"
    os: "Windows"
    os_version: "10"
    resolution: "1920x1080"
  - browser: "Firefox"
    os: "Windows"
    os_version: "10"
  - browser: "Safari"
    os: "OS X"
    os_version: "Big Sur"
"#;
    let p = write_yaml(&tmp, "kiosko.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("KIOSKO_TEST_BS_USER", Some("someuser")),
            ("KIOSKO_TEST_BS_KEY", Some("somekey")),
        ],
        || {
            let config = KioskoConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.sessions.len(), 3);
            assert_eq!(config.provider.username.as_deref(), Some("someuser"));
            assert!(config.provider.has_credentials());
            assert_eq!(config.run.mode, RunModeConfig::Sequential);
            assert_eq!(config.run.deadline_secs, Some(120));
            assert_eq!(config.scrape.max_articles, 3);
            // untouched defaults
            assert_eq!(config.scrape.retry_attempts, 2);
            assert!(config.scrape.listing_url.contains("elpais.com"));
        },
    );
}
