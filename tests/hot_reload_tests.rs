use std::time::Duration;
use tablegate::hot_reload::{reload_if_changed, watch_schema};

mod common;
use common::http::get;
use common::test_server::TestServer;

#[test]
fn test_reload_after_create_table() {
    let server = TestServer::start();
    assert_eq!(get(&server.addr(), "/genre").status, 404);

    server
        .db
        .connect()
        .execute_batch(
            "CREATE TABLE Genre (GenreId INTEGER PRIMARY KEY, Name TEXT);
             INSERT INTO Genre (Name) VALUES ('Rock');",
        )
        .unwrap();

    assert!(reload_if_changed(&server.service).unwrap());
    let resp = get(&server.addr(), "/genre/1");
    assert_eq!(resp.status, 200);
    assert_eq!(resp.json()["Name"], "Rock");

    // Existing resources keep working on the new handlers.
    assert_eq!(get(&server.addr(), "/artist/1").status, 200);
    assert!(!reload_if_changed(&server.service).unwrap());
}

#[test]
fn test_data_writes_do_not_reload() {
    let server = TestServer::start();
    let before = server.service.current_schema().unwrap().version;

    server
        .db
        .connect()
        .execute("INSERT INTO Artist (Name) VALUES ('Audioslave')", [])
        .unwrap();

    assert!(!reload_if_changed(&server.service).unwrap());
    assert_eq!(server.service.current_schema().unwrap().version, before);
}

#[test]
fn test_reload_after_alter_table() {
    let server = TestServer::start();
    server
        .db
        .connect()
        .execute_batch("ALTER TABLE Playlist ADD COLUMN Owner TEXT")
        .unwrap();

    assert!(reload_if_changed(&server.service).unwrap());
    let playlist = get(&server.addr(), "/playlist/1").json();
    assert!(playlist.as_object().unwrap().contains_key("Owner"));

    let metrics = get(&server.addr(), "/metrics").body;
    assert!(metrics.contains("tablegate_schema_reloads_total 1"));
}

#[test]
fn test_watch_schema_reload() {
    let server = TestServer::start();
    let watcher = watch_schema(&server.db.path, server.service.clone()).expect("watch_schema");

    // allow watcher thread to start
    std::thread::sleep(Duration::from_millis(100));

    server
        .db
        .connect()
        .execute_batch("CREATE TABLE MediaType (MediaTypeId INTEGER PRIMARY KEY, Name TEXT)")
        .unwrap();

    let mut status = 0;
    for _ in 0..40 {
        status = get(&server.addr(), "/mediatype").status;
        if status == 200 {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(status, 200);

    drop(watcher);
}
