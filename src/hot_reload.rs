//! # Hot Reload Module
//!
//! Live schema reloading. The database file (and its `-wal` / `-journal`
//! companions) is watched with `notify`; on every change `PRAGMA
//! schema_version` is read and, only when it differs from the version being
//! served, the schema is reflected again and new routes and handlers are
//! swapped into the running [`AppService`].
//!
//! Data writes, including the service's own, also touch the file; they cost a
//! single pragma read and change nothing.
//!
//! If reflection fails the error is logged and the previous schema stays active.

use crate::error::ApiError;
use crate::server::AppService;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Re-reflect and install the schema if its version moved.
///
/// Returns whether a new schema was installed.
pub fn reload_if_changed(service: &AppService) -> Result<bool, ApiError> {
    let served = service.current_schema()?.version;
    let on_disk = service.store.schema_version()?;
    if on_disk == served {
        debug!(schema_version = served, "Schema unchanged");
        return Ok(false);
    }

    info!(from = served, to = on_disk, "Schema version changed; reloading");
    let schema = service.store.reflect()?;
    service.install_schema(schema)?;
    Ok(true)
}

fn is_database_file(event_path: &Path, db_names: &[OsString]) -> bool {
    event_path
        .file_name()
        .is_some_and(|name| db_names.iter().any(|n| n == name))
}

/// Watch `db_path` and reload `service` on schema changes.
///
/// The returned watcher must be kept alive; dropping it stops watching.
pub fn watch_schema<P: AsRef<Path>>(db_path: P, service: AppService) -> notify::Result<RecommendedWatcher> {
    let path: PathBuf = db_path.as_ref().to_path_buf();
    let file_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| notify::Error::generic("database path has no file name"))?;
    let mut wal = file_name.clone();
    wal.push("-wal");
    let mut journal = file_name.clone();
    journal.push("-journal");
    let db_names = vec![file_name, wal, journal];

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    return;
                }
                if !event.paths.iter().any(|p| is_database_file(p, &db_names)) {
                    return;
                }
                if let Err(e) = reload_if_changed(&service) {
                    error!(error = %e, "Schema reload failed; keeping previous schema");
                }
            }
            Err(e) => error!(error = %e, "Database watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    info!(path = %path.display(), "Watching database for schema changes");
    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::is_database_file;
    use std::ffi::OsString;
    use std::path::Path;

    #[test]
    fn test_companion_files_count_as_database() {
        let names = vec![
            OsString::from("chinook.db"),
            OsString::from("chinook.db-wal"),
            OsString::from("chinook.db-journal"),
        ];
        assert!(is_database_file(Path::new("/tmp/x/chinook.db-wal"), &names));
        assert!(is_database_file(Path::new("chinook.db"), &names));
        assert!(!is_database_file(Path::new("/tmp/x/other.db"), &names));
    }
}
