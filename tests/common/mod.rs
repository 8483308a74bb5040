#![allow(dead_code)]

pub mod fixture {
    use rusqlite::Connection;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Chinook-shaped schema: single, composite and missing primary keys plus
    /// a foreign key chain.
    pub const SCHEMA: &str = "
        CREATE TABLE Artist (
            ArtistId INTEGER PRIMARY KEY AUTOINCREMENT,
            Name NVARCHAR(120) NOT NULL
        );
        CREATE TABLE Album (
            AlbumId INTEGER PRIMARY KEY AUTOINCREMENT,
            Title NVARCHAR(160) NOT NULL,
            ArtistId INTEGER NOT NULL REFERENCES Artist (ArtistId)
        );
        CREATE TABLE Playlist (
            PlaylistId INTEGER PRIMARY KEY,
            Name NVARCHAR(120)
        );
        CREATE TABLE PlaylistTrack (
            PlaylistId INTEGER NOT NULL,
            TrackId INTEGER NOT NULL,
            PRIMARY KEY (PlaylistId, TrackId)
        );
        CREATE TABLE Note (body TEXT, score REAL);
    ";

    /// A database file in its own temporary directory
    pub struct TestDb {
        pub dir: TempDir,
        pub path: PathBuf,
    }

    impl TestDb {
        pub fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("chinook.db");
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(SCHEMA).unwrap();
            conn.execute_batch(
                "INSERT INTO Artist (Name) VALUES ('AC/DC'), ('Accept'), ('Aerosmith'),
                    ('Alanis Morissette'), ('Alice In Chains'), ('Black Sabbath');
                 INSERT INTO Album (Title, ArtistId) VALUES
                    ('For Those About To Rock We Salute You', 1), ('Balls to the Wall', 2),
                    ('Restless and Wild', 2), ('Let There Be Rock', 1);
                 INSERT INTO Playlist (Name) VALUES ('Music'), ('Movies');
                 INSERT INTO PlaylistTrack VALUES (1, 3402), (1, 3389), (2, 3402);
                 INSERT INTO Note VALUES ('first', 1.5);",
            )
            .unwrap();
            for n in 0..20 {
                conn.execute("INSERT INTO Artist (Name) VALUES (?1)", [format!("Band {n:02}")])
                    .unwrap();
            }
            Self { dir, path }
        }

        /// A second connection for changing the database under a running server
        pub fn connect(&self) -> Connection {
            Connection::open(&self.path).unwrap()
        }
    }
}

pub mod test_server {
    use super::fixture::TestDb;
    use std::net::{SocketAddr, TcpListener};
    use std::sync::{Arc, Once};
    use std::time::Duration;
    use tablegate::server::{AppService, HttpServer, ServerHandle};
    use tablegate::store::Store;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x10000);
        });
    }

    pub fn free_addr() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr
    }

    /// Running server over a fresh fixture database, stopped on drop
    pub struct TestServer {
        pub db: TestDb,
        pub service: AppService,
        handle: Option<ServerHandle>,
        addr: SocketAddr,
    }

    impl TestServer {
        pub fn start() -> Self {
            Self::with_base_path("")
        }

        pub fn with_base_path(base_path: &str) -> Self {
            setup_may_runtime();
            let db = TestDb::new();
            let store = Store::open(&db.path, Duration::from_secs(2), 20).unwrap();
            let service = AppService::new(Arc::new(store), base_path, None).unwrap();

            let addr = free_addr();
            let handle = HttpServer(service.clone()).start(addr).unwrap();
            handle.wait_ready().unwrap();
            Self {
                db,
                service,
                handle: Some(handle),
                addr,
            }
        }

        pub fn addr(&self) -> SocketAddr {
            self.addr
        }
    }

    impl Drop for TestServer {
        fn drop(&mut self) {
            if let Some(handle) = self.handle.take() {
                handle.stop();
            }
        }
    }
}

pub mod http {
    use serde_json::Value;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpStream};
    use std::time::Duration;

    #[derive(Debug)]
    pub struct TestResponse {
        pub status: u16,
        pub headers: Vec<(String, String)>,
        pub body: String,
    }

    impl TestResponse {
        pub fn header(&self, name: &str) -> Option<&str> {
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str())
        }

        pub fn json(&self) -> Value {
            serde_json::from_str(&self.body).unwrap_or(Value::Null)
        }
    }

    fn content_length(head: &str) -> Option<usize> {
        head.lines()
            .filter_map(|l| l.split_once(':'))
            .find(|(k, _)| k.trim().eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse().ok())
    }

    /// Write a raw request and read one response; stops at `Content-Length`
    /// or after a short read timeout.
    pub fn send_raw(addr: &SocketAddr, raw: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(raw.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let head = String::from_utf8_lossy(&buf[..end]).to_string();
                if let Some(len) = content_length(&head) {
                    if buf.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            let mut tmp = [0u8; 4096];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    pub fn parse_response(resp: &str) -> TestResponse {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|l| l.split_whitespace().nth(1))
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|l| l.split_once(':'))
            .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
            .collect();
        TestResponse {
            status,
            headers,
            body: body.to_string(),
        }
    }

    /// Send `method path` with optional extra header lines and body
    pub fn request(
        addr: &SocketAddr,
        method: &str,
        path: &str,
        headers: &[&str],
        body: Option<&str>,
    ) -> TestResponse {
        let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
        for h in headers {
            raw.push_str(h);
            raw.push_str("\r\n");
        }
        if let Some(body) = body {
            raw.push_str(&format!("Content-Length: {}\r\n\r\n{body}", body.len()));
        } else {
            raw.push_str("\r\n");
        }
        parse_response(&send_raw(addr, &raw))
    }

    pub fn get(addr: &SocketAddr, path: &str) -> TestResponse {
        request(addr, "GET", path, &[], None)
    }

    pub fn send_json(addr: &SocketAddr, method: &str, path: &str, body: &str) -> TestResponse {
        request(addr, method, path, &["Content-Type: application/json"], Some(body))
    }
}
