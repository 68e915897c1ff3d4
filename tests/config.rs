use std::fs;

use weekboard::config::{Config, CONFIG_FILE};
use weekboard::error::Error;

#[test]
fn config_defaults_when_missing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let explicit = dir.path().join("defaults.toml");
    fs::write(&explicit, "").expect("write empty config");

    let config = Config::resolve(Some(&explicit), dir.path()).expect("resolve");
    assert_eq!(config.backend.base_url, "http://localhost:3000/api");
    assert_eq!(config.backend.timeout_ms, 10_000);
    assert_eq!(config.sync.debounce_ms, 1000);
    assert_eq!(config.board.position_step, 1000);
}

#[test]
fn config_overrides_from_toml() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config_path = dir.path().join(CONFIG_FILE);
    let toml = r#"
[backend]
base_url = "https://planner.internal/api"
timeout_ms = 3000

[sync]
debounce_ms = 0
"#;
    fs::write(&config_path, toml.trim())?;

    let config = Config::resolve(None, dir.path())?;
    assert_eq!(config.backend.base_url, "https://planner.internal/api");
    assert_eq!(config.backend.timeout_ms, 3000);
    assert!(config.backend.token.is_none());
    assert_eq!(config.sync.debounce_ms, 0);
    assert_eq!(config.board.position_step, 1000);
    Ok(())
}

#[test]
fn malformed_toml_is_a_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[sync]\ndebounce_ms = \"soon\"").expect("write invalid config");

    let err = Config::load(&path).expect_err("invalid config");
    assert!(matches!(err, Error::TomlParse(_)));
    assert_eq!(err.exit_code(), 4);
}

#[test]
fn oversized_debounce_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[sync]\ndebounce_ms = 600000").expect("write config");

    assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn zero_timeout_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);
    fs::write(&path, "[backend]\ntimeout_ms = 0").expect("write config");

    assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
}

#[test]
fn position_step_is_bounded() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE);

    fs::write(&path, "[board]\nposition_step = 1000000").expect("write config");
    assert_eq!(Config::load(&path).expect("at the cap").board.position_step, 1_000_000);

    fs::write(&path, "[board]\nposition_step = 1000001").expect("write config");
    let err = Config::load(&path).expect_err("above the cap");
    assert!(matches!(err, Error::InvalidConfig(ref message) if message.contains("<= 1000000")));
}
