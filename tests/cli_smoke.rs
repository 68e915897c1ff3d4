use assert_cmd::Command;
use predicates::str::contains;

fn weekboard(dir: &tempfile::TempDir) -> Command {
    let mut cmd = Command::cargo_bin("weekboard").expect("binary");
    cmd.current_dir(dir.path())
        .env_remove("WEEKBOARD_URL")
        .env_remove("WEEKBOARD_TOKEN")
        .env("RUST_LOG", "off");
    cmd
}

#[test]
fn weekboard_help_works() {
    Command::cargo_bin("weekboard")
        .expect("binary")
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("week planner board"));
}

#[test]
fn subcommand_help_works() {
    let subcommands = [
        "tasks",
        "archived",
        "categories",
        "move",
        "archive",
        "unarchive",
        "create",
        "update",
        "delete",
    ];

    for cmd in subcommands {
        Command::cargo_bin("weekboard")
            .expect("binary")
            .arg(cmd)
            .arg("--help")
            .assert()
            .success();
    }
}

#[test]
fn invalid_day_is_a_user_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    weekboard(&dir)
        .args(["move", "t1", "--week", "w1", "--day", "9"])
        .assert()
        .code(2)
        .stderr(contains("day must be between 1 and 7"));
}

#[test]
fn invalid_url_reports_json_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    weekboard(&dir)
        .args(["--json", "--url", "ftp://planner", "archived"])
        .assert()
        .code(2)
        .stdout(contains("\"status\": \"error\""))
        .stdout(contains("\"kind\": \"user_error\""))
        .stdout(contains("weekboard.v1"));
}

#[test]
fn missing_explicit_config_fails() {
    let dir = tempfile::tempdir().expect("tempdir");
    weekboard(&dir)
        .args(["--config", "nope.toml", "archived"])
        .assert()
        .code(2)
        .stderr(contains("Config file not found"));
}
