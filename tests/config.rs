// tests/config.rs
use std::env;
use std::io::Write;

use serial_test::serial;
use video_watch::config::watch::{WatchConfig, ENV_CONFIG_PATH};

const OVERRIDES: [&str; 6] = [
    "WATCH_POLL_INTERVAL_SECS",
    "WATCH_MIN_CHECK_INTERVAL_SECS",
    "WATCH_NOTIFICATIONS_ENABLED",
    "WATCH_ITEMS_PER_SOURCE",
    "WATCH_FETCH_TIMEOUT_SECS",
    "WATCH_LISTEN_ADDR",
];

fn clear_env() {
    env::remove_var(ENV_CONFIG_PATH);
    for key in OVERRIDES {
        env::remove_var(key);
    }
}

fn write_config(body: &str) -> tempfile::NamedTempFile {
    let mut f = tempfile::NamedTempFile::new().unwrap();
    f.write_all(body.as_bytes()).unwrap();
    f
}

#[test]
#[serial]
fn explicit_path_is_loaded() {
    clear_env();
    let f = write_config("poll_interval_secs = 900\nregistry_path = \"/tmp/x/sources.json\"\n");
    env::set_var(ENV_CONFIG_PATH, f.path());

    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.poll_interval_secs, 900);
    assert_eq!(cfg.registry_path.to_str(), Some("/tmp/x/sources.json"));
    assert_eq!(cfg.items_per_source_limit, 5);
    clear_env();
}

#[test]
#[serial]
fn missing_explicit_path_is_an_error() {
    clear_env();
    env::set_var(ENV_CONFIG_PATH, "/definitely/not/here/watch.toml");
    assert!(WatchConfig::load_default().is_err());
    clear_env();
}

#[test]
#[serial]
fn env_overrides_win_over_file() {
    clear_env();
    let f = write_config("poll_interval_secs = 900\nnotifications_enabled = true\n");
    env::set_var(ENV_CONFIG_PATH, f.path());
    env::set_var("WATCH_POLL_INTERVAL_SECS", "120");
    env::set_var("WATCH_NOTIFICATIONS_ENABLED", "false");
    env::set_var("WATCH_MIN_CHECK_INTERVAL_SECS", "0");
    env::set_var("WATCH_LISTEN_ADDR", " 0.0.0.0:9000 ");

    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.poll_interval_secs, 120);
    assert!(!cfg.notifications_enabled);
    assert_eq!(cfg.min_check_interval_secs, 0);
    assert_eq!(cfg.listen_addr, "0.0.0.0:9000");
    clear_env();
}

#[test]
#[serial]
fn unparsable_override_is_an_error() {
    clear_env();
    env::set_var("WATCH_ITEMS_PER_SOURCE", "lots");
    let err = WatchConfig::load_default().unwrap_err();
    assert!(err.to_string().contains("WATCH_ITEMS_PER_SOURCE"));
    clear_env();
}

#[test]
#[serial]
fn zero_override_falls_back_to_default() {
    clear_env();
    env::set_var("WATCH_FETCH_TIMEOUT_SECS", "0");
    let cfg = WatchConfig::load_default().unwrap();
    assert_eq!(cfg.fetch_timeout_secs, 30);
    clear_env();
}
