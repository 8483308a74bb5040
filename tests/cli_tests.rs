use std::process::Command;
use tablegate::cli::start_server;
use tablegate::config::AppConfig;

mod common;
use common::fixture::TestDb;
use common::http::get;
use common::test_server::{free_addr, setup_may_runtime};

#[test]
fn test_cli_inspect_prints_tables_and_routes() {
    let db = TestDb::new();
    let exe = env!("CARGO_BIN_EXE_tablegate");
    let output = Command::new(exe)
        .args(["inspect", "--database"])
        .arg(&db.path)
        .args(["--base-path", "/api"])
        .env("TABLEGATE_LOG_LEVEL", "error")
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[table] PlaylistTrack -> /playlisttrack key=PlaylistId,TrackId"));
    assert!(stdout.contains("[table] Note -> /note key=(body,score) synthetic"));
    assert!(stdout.contains("[fk] ArtistId -> Artist.ArtistId"));
    assert!(stdout.contains("[routes] count=40"));
    assert!(stdout.contains("/api/album/{id} -> read_album (Album)"));
}

#[test]
fn test_cli_serve_missing_database_fails() {
    let dir = tempfile::tempdir().unwrap();
    let exe = env!("CARGO_BIN_EXE_tablegate");
    let output = Command::new(exe)
        .args(["serve", "--database"])
        .arg(dir.path().join("absent.db"))
        .env("TABLEGATE_LOG_LEVEL", "error")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("failed to open database"));
}

#[test]
fn test_cli_serve_requires_database() {
    let exe = env!("CARGO_BIN_EXE_tablegate");
    let output = Command::new(exe)
        .arg("serve")
        .env_remove("TABLEGATE_DATABASE")
        .env("TABLEGATE_LOG_LEVEL", "error")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("--database"));
}

#[test]
fn test_start_server_from_config_file() {
    setup_may_runtime();
    let db = TestDb::new();
    let addr = free_addr();
    let config_path = db.dir.path().join("tablegate.yaml");
    std::fs::write(
        &config_path,
        format!(
            "database: {}\naddr: {addr}\nbase_path: /api\npage_size: 2\nwatch: true\n",
            db.path.display()
        ),
    )
    .unwrap();

    let config = AppConfig::load(&config_path).unwrap();
    let handle = start_server(&config).unwrap();
    handle.wait_ready().unwrap();

    let page = get(&addr, "/api/artist?page=0").json();
    assert_eq!(page["resources"].as_array().unwrap().len(), 2);
    handle.stop();
}
