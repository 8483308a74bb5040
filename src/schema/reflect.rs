use super::types::{ColumnMeta, ColumnType, ForeignKey, Schema, TableMeta};
use rusqlite::Connection;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Read `PRAGMA schema_version`; it changes whenever the catalog changes.
pub fn schema_version(conn: &Connection) -> rusqlite::Result<i64> {
    conn.pragma_query_value(None, "schema_version", |row| row.get(0))
}

/// Reflect every user table of the database.
///
/// Tables come back ordered by name. A table without a declared primary key
/// gets all of its columns as a synthetic key so it can still be addressed.
pub fn reflect(conn: &Connection) -> rusqlite::Result<Schema> {
    let version = schema_version(conn)?;

    let names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\' \
             ORDER BY name",
        )?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<_>>()?
    };

    let mut tables = Vec::with_capacity(names.len());
    for name in &names {
        tables.push(reflect_table(conn, name)?);
    }

    // Foreign keys may omit the referenced column; it then means the parent's key.
    for i in 0..tables.len() {
        for j in 0..tables[i].foreign_keys.len() {
            if !tables[i].foreign_keys[j].ref_column.is_empty() {
                continue;
            }
            let parent = tables[i].foreign_keys[j].ref_table.clone();
            let resolved = tables
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(&parent))
                .and_then(|t| t.primary_key.first().cloned());
            match resolved {
                Some(col) => tables[i].foreign_keys[j].ref_column = col,
                None => warn!(
                    table = %tables[i].name,
                    ref_table = %parent,
                    "Foreign key references a table with no resolvable key"
                ),
            }
        }
    }

    info!(
        tables_count = tables.len(),
        schema_version = version,
        tables = ?names,
        "Schema reflected"
    );

    Ok(Schema {
        tables: tables.into_iter().map(Arc::new).collect(),
        version,
    })
}

fn reflect_table(conn: &Connection, name: &str) -> rusqlite::Result<TableMeta> {
    let mut columns = {
        let mut stmt = conn.prepare(
            "SELECT name, type, \"notnull\", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid",
        )?;
        let rows = stmt.query_map([name], |row| {
            let declared_type: String = row.get::<_, Option<String>>(1)?.unwrap_or_default();
            let pk: i64 = row.get(4)?;
            Ok(ColumnMeta {
                name: row.get(0)?,
                column_type: ColumnType::from_declared(&declared_type),
                declared_type,
                not_null: row.get::<_, i64>(2)? != 0,
                default_value: row.get(3)?,
                primary_key_position: u32::try_from(pk).ok().filter(|p| *p > 0),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    let mut keyed: Vec<&ColumnMeta> = columns
        .iter()
        .filter(|c| c.primary_key_position.is_some())
        .collect();
    keyed.sort_by_key(|c| c.primary_key_position);
    let mut primary_key: Vec<String> = keyed.iter().map(|c| c.name.clone()).collect();

    let synthetic_key = primary_key.is_empty();
    if synthetic_key {
        warn!(
            table = %name,
            columns_count = columns.len(),
            "Table has no primary key; using all columns as its key"
        );
        for (idx, column) in columns.iter_mut().enumerate() {
            column.primary_key_position = u32::try_from(idx + 1).ok();
        }
        primary_key = columns.iter().map(|c| c.name.clone()).collect();
    }

    let foreign_keys = {
        let mut stmt =
            conn.prepare("SELECT \"table\", \"from\", \"to\" FROM pragma_foreign_key_list(?1) ORDER BY id, seq")?;
        let rows = stmt.query_map([name], |row| {
            Ok(ForeignKey {
                ref_table: row.get(0)?,
                column: row.get(1)?,
                ref_column: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()?
    };

    debug!(
        table = %name,
        columns_count = columns.len(),
        primary_key = ?primary_key,
        foreign_keys_count = foreign_keys.len(),
        "Table reflected"
    );

    Ok(TableMeta {
        name: name.to_string(),
        resource_name: name.to_lowercase(),
        columns,
        primary_key,
        foreign_keys,
        synthetic_key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name NVARCHAR(120));
            CREATE TABLE Album (
                AlbumId INTEGER PRIMARY KEY,
                Title NVARCHAR(160) NOT NULL,
                ArtistId INTEGER NOT NULL REFERENCES Artist
            );
            CREATE TABLE PlaylistTrack (
                PlaylistId INTEGER, TrackId INTEGER,
                PRIMARY KEY (TrackId, PlaylistId)
            );
            CREATE TABLE Testing (a TEXT, b);
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_reflect_tables_sorted() {
        let schema = reflect(&fixture()).unwrap();
        let names: Vec<_> = schema.tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Album", "Artist", "PlaylistTrack", "Testing"]);
        assert!(schema.version > 0);
    }

    #[test]
    fn test_reflect_columns_and_keys() {
        let schema = reflect(&fixture()).unwrap();
        let album = schema.table_by_resource("album").unwrap();
        assert_eq!(album.primary_key, vec!["AlbumId"]);
        let title = album.column("Title").unwrap();
        assert!(title.not_null);
        assert_eq!(title.column_type, ColumnType::Text);
        assert!(!album.synthetic_key);
    }

    #[test]
    fn test_composite_key_order_follows_declaration() {
        let schema = reflect(&fixture()).unwrap();
        let pt = schema.table("PlaylistTrack").unwrap();
        assert_eq!(pt.primary_key, vec!["TrackId", "PlaylistId"]);
    }

    #[test]
    fn test_foreign_key_without_column_resolves_to_parent_key() {
        let schema = reflect(&fixture()).unwrap();
        let album = schema.table("Album").unwrap();
        let fk = album.foreign_key("ArtistId").unwrap();
        assert_eq!(fk.ref_table, "Artist");
        assert_eq!(fk.ref_column, "ArtistId");
    }

    #[test]
    fn test_table_without_key_gets_synthetic_key() {
        let schema = reflect(&fixture()).unwrap();
        let testing = schema.table("Testing").unwrap();
        assert!(testing.synthetic_key);
        assert_eq!(testing.primary_key, vec!["a", "b"]);
        assert_eq!(testing.column("b").unwrap().column_type, ColumnType::Blob);
    }

    #[test]
    fn test_schema_version_changes_with_ddl() {
        let conn = fixture();
        let before = schema_version(&conn).unwrap();
        conn.execute_batch("CREATE TABLE Genre (GenreId INTEGER PRIMARY KEY, Name TEXT)")
            .unwrap();
        assert!(schema_version(&conn).unwrap() > before);
    }
}
