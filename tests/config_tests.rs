
use std::fs;
use test_env::TestEnv;

#[test]
fn test_default_data_location() {
    let env = TestEnv::new();
    env.cmd().args(["start", "a"]).assert().success();
    assert!(env.db_path().exists());
}

#[test]
fn test_rc_data_location() {
    let env = TestEnv::new();
    let config_dir = env.home.path().join(".timetrack");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(config_dir.join("rc"), "data.location=./elsewhere/custom.db\n").unwrap();

    env.cmd().args(["start", "a"]).assert().success();
    assert!(config_dir.join("elsewhere").join("custom.db").exists());
    assert!(!env.db_path().exists());
}

#[test]
fn test_env_data_location() {
    let env = TestEnv::new();
    let db_path = env.home.path().join("from-env.db");
    env.cmd()
        .env("TIMETRACK_DATA_PATH", &db_path)
        .args(["start", "a"])
        .assert()
        .success();
    assert!(db_path.exists());
    assert!(!env.db_path().exists());
}

#[test]
fn test_log_location() {
    let env = TestEnv::new();
    let log_path = env.home.path().join("logs").join("timetrack.log");
    env.cmd()
        .env("TIMETRACK_LOG_PATH", &log_path)
        .env("RUST_LOG", "debug")
        .args(["start", "a"])
        .assert()
        .success();
    let log = fs::read_to_string(&log_path).unwrap();
    assert!(log.contains("using data location"));
    assert!(log.contains("start 'a'"));
}
