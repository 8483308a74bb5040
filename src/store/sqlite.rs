use super::query::{quote_ident, FilterOp, ListQuery};
use super::values::{sql_to_json, Fields, Row};
use crate::error::ApiError;
use crate::schema::{self, Schema, TableMeta};
use may::sync::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default number of rows per page when `page` is given
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// CRUD access to the reflected database.
///
/// A single connection is shared by every handler coroutine behind a
/// coroutine-aware mutex. Identifiers are always quoted and values always bound.
pub struct Store {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
    page_size: u32,
}

impl Store {
    /// Open an existing database file. Fails if the file does not exist.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>, busy_timeout: Duration, page_size: u32) -> rusqlite::Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        conn.busy_timeout(busy_timeout)?;
        let mut store = Self::from_connection(conn, page_size)?;
        store.path = Some(path.to_path_buf());
        info!(page_size, busy_timeout_ms = busy_timeout.as_millis() as u64, "Database opened");
        Ok(store)
    }

    /// Wrap an already open connection (in-memory databases, tests).
    pub fn from_connection(conn: Connection, page_size: u32) -> rusqlite::Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
            page_size: page_size.max(1),
        })
    }

    /// Database file this store was opened from
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    #[must_use]
    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, ApiError> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ApiError::ServerError("database connection lock poisoned".to_string()))?;
        f(&conn).map_err(ApiError::from)
    }

    pub fn reflect(&self) -> Result<Schema, ApiError> {
        self.with_conn(schema::reflect)
    }

    pub fn schema_version(&self) -> Result<i64, ApiError> {
        self.with_conn(schema::schema_version)
    }

    /// Rows of `table` matching `query`
    #[instrument(skip_all, fields(table = %table.name))]
    pub fn list(&self, table: &TableMeta, query: &ListQuery) -> Result<Vec<Row>, ApiError> {
        let mut sql = format!("SELECT * FROM {}", quote_ident(&table.name));
        let mut values: Vec<SqlValue> = Vec::with_capacity(query.filters.len());

        if !query.filters.is_empty() {
            let terms: Vec<String> = query
                .filters
                .iter()
                .map(|f| {
                    values.push(f.value.clone());
                    let n = values.len();
                    match f.op {
                        FilterOp::Eq => format!("{} = ?{n}", quote_ident(&f.column)),
                        FilterOp::Like => format!("{} LIKE ?{n} ESCAPE '/'", quote_ident(&f.column)),
                    }
                })
                .collect();
            sql.push_str(" WHERE ");
            sql.push_str(&terms.join(" AND "));
        }
        if !query.sort.is_empty() {
            let order: Vec<String> = query.sort.iter().map(|c| quote_ident(c)).collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }
        if let Some(page) = query.page {
            let limit = i64::from(self.page_size);
            let offset = i64::try_from(page)
                .ok()
                .and_then(|p| p.checked_mul(limit))
                .ok_or_else(|| ApiError::BadRequest(format!("page number [{page}] is out of range")))?;
            values.push(SqlValue::Integer(limit));
            values.push(SqlValue::Integer(offset));
            let n = values.len();
            sql.push_str(&format!(" LIMIT ?{} OFFSET ?{n}", n - 1));
        }

        debug!(sql = %sql, params = values.len(), "List query");
        self.with_conn(|conn| query_rows(conn, &sql, &values))
    }

    /// Row addressed by `key` (as produced by [`TableMeta::parse_key`])
    pub fn get(&self, table: &TableMeta, key: &[(String, SqlValue)]) -> Result<Option<Row>, ApiError> {
        self.find_matching(table, key)
    }

    /// First row whose columns equal every given field (NULL matches NULL)
    pub fn find_matching(
        &self,
        table: &TableMeta,
        fields: &[(String, SqlValue)],
    ) -> Result<Option<Row>, ApiError> {
        let (where_sql, values) = where_clause(fields, 0);
        let sql = format!("SELECT * FROM {}{where_sql} LIMIT 1", quote_ident(&table.name));
        debug!(sql = %sql, "Lookup query");
        let mut rows = self.with_conn(|conn| query_rows(conn, &sql, &values))?;
        Ok(rows.pop())
    }

    /// Insert a row and return it as stored (defaults and generated keys included)
    #[instrument(skip_all, fields(table = %table.name))]
    pub fn insert(&self, table: &TableMeta, fields: &[(String, SqlValue)]) -> Result<Row, ApiError> {
        let sql = if fields.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES RETURNING *", quote_ident(&table.name))
        } else {
            let columns: Vec<String> = fields.iter().map(|(c, _)| quote_ident(c)).collect();
            let placeholders: Vec<String> = (1..=fields.len()).map(|i| format!("?{i}")).collect();
            format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING *",
                quote_ident(&table.name),
                columns.join(", "),
                placeholders.join(", ")
            )
        };
        let values: Vec<SqlValue> = fields.iter().map(|(_, v)| v.clone()).collect();
        let mut rows = self.with_conn(|conn| query_rows(conn, &sql, &values))?;
        let row = rows
            .pop()
            .ok_or_else(|| ApiError::ServerError("insert returned no row".to_string()))?;
        info!(table = %table.name, "Row inserted");
        Ok(row)
    }

    /// Overwrite every non-key column of the addressed row; columns absent
    /// from `fields` become NULL. Returns the number of rows changed.
    pub fn replace(
        &self,
        table: &TableMeta,
        key: &[(String, SqlValue)],
        fields: &[(String, SqlValue)],
    ) -> Result<usize, ApiError> {
        let full: Fields = table
            .columns
            .iter()
            .filter(|c| !table.is_key_column(&c.name))
            .map(|c| {
                let value = fields
                    .iter()
                    .find(|(name, _)| *name == c.name)
                    .map(|(_, v)| v.clone())
                    .unwrap_or(SqlValue::Null);
                (c.name.clone(), value)
            })
            .collect();
        self.update(table, key, &full)
    }

    /// Set the given columns on the addressed row. Returns the number of rows changed.
    #[instrument(skip_all, fields(table = %table.name))]
    pub fn update(
        &self,
        table: &TableMeta,
        key: &[(String, SqlValue)],
        fields: &[(String, SqlValue)],
    ) -> Result<usize, ApiError> {
        if fields.is_empty() {
            return Ok(0);
        }
        let assignments: Vec<String> = fields
            .iter()
            .enumerate()
            .map(|(i, (c, _))| format!("{} = ?{}", quote_ident(c), i + 1))
            .collect();
        let (where_sql, key_values) = where_clause(key, fields.len());
        let sql = format!(
            "UPDATE {} SET {}{where_sql}",
            quote_ident(&table.name),
            assignments.join(", ")
        );
        let values: Vec<SqlValue> = fields
            .iter()
            .map(|(_, v)| v.clone())
            .chain(key_values)
            .collect();
        debug!(sql = %sql, "Update statement");
        let changed = self.with_conn(|conn| conn.execute(&sql, params_from_iter(values.iter())))?;
        info!(table = %table.name, changed, "Row updated");
        Ok(changed)
    }

    /// Delete the addressed row; `false` when nothing matched
    #[instrument(skip_all, fields(table = %table.name))]
    pub fn delete(&self, table: &TableMeta, key: &[(String, SqlValue)]) -> Result<bool, ApiError> {
        let (where_sql, values) = where_clause(key, 0);
        let sql = format!("DELETE FROM {}{where_sql}", quote_ident(&table.name));
        let deleted = self.with_conn(|conn| conn.execute(&sql, params_from_iter(values.iter())))?;
        info!(table = %table.name, deleted, "Row delete");
        Ok(deleted > 0)
    }

    pub fn count(&self, table: &TableMeta) -> Result<u64, ApiError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&table.name));
        let n: i64 = self.with_conn(|conn| conn.query_row(&sql, [], |row| row.get(0)))?;
        Ok(u64::try_from(n).unwrap_or(0))
    }
}

/// ` WHERE "a" IS ?n AND ...` with placeholders numbered after `offset`
fn where_clause(fields: &[(String, SqlValue)], offset: usize) -> (String, Vec<SqlValue>) {
    if fields.is_empty() {
        return (String::new(), Vec::new());
    }
    let terms: Vec<String> = fields
        .iter()
        .enumerate()
        .map(|(i, (c, _))| format!("{} IS ?{}", quote_ident(c), offset + i + 1))
        .collect();
    let values = fields.iter().map(|(_, v)| v.clone()).collect();
    (format!(" WHERE {}", terms.join(" AND ")), values)
}

fn query_rows(conn: &Connection, sql: &str, values: &[SqlValue]) -> rusqlite::Result<Vec<Row>> {
    let mut stmt = conn.prepare(sql)?;
    let col_names: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| {
        let mut map = Row::new();
        for (i, name) in col_names.iter().enumerate() {
            map.insert(name.clone(), sql_to_json(row.get_ref(i)?));
        }
        Ok(map)
    })?;
    rows.collect()
}
