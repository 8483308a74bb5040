//! Admin home page: every reflected table with its columns, keys, foreign keys
//! and row count, rendered with minijinja.

use crate::error::ApiError;
use crate::routes::collection_href;
use crate::schema::Schema;
use crate::store::Store;
use minijinja::Environment;
use serde::Serialize;
use tracing::warn;

const ADMIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>tablegate admin</title>
  <style>
    body { font-family: sans-serif; margin: 2em; }
    table { border-collapse: collapse; margin-bottom: 1.5em; }
    th, td { border: 1px solid #ccc; padding: 0.3em 0.6em; text-align: left; }
    .key { font-weight: bold; }
  </style>
</head>
<body>
  <h1>tablegate admin</h1>
  <p>schema version {{ schema_version }}, {{ tables | length }} tables</p>
{% for table in tables %}
  <h2><a href="{{ table.href }}">{{ table.name }}</a> <small>({{ table.rows }} rows)</small></h2>
{% if table.synthetic_key %}
  <p>No primary key declared; every column is part of the resource id.</p>
{% endif %}
  <table>
    <tr><th>column</th><th>type</th><th>not null</th><th>default</th><th>references</th></tr>
{% for column in table.columns %}
    <tr>
      <td{% if column.key %} class="key"{% endif %}>{{ column.name }}{% if column.key %} (key){% endif %}</td>
      <td>{{ column.declared_type }}</td>
      <td>{% if column.not_null %}yes{% endif %}</td>
      <td>{{ column.default_value or "" }}</td>
      <td>{% if column.references %}<a href="{{ column.references_href }}">{{ column.references }}</a>{% endif %}</td>
    </tr>
{% endfor %}
  </table>
{% endfor %}
</body>
</html>
"#;

#[derive(Debug, Serialize)]
struct AdminColumn<'a> {
    name: &'a str,
    declared_type: &'a str,
    not_null: bool,
    default_value: Option<&'a str>,
    key: bool,
    references: Option<String>,
    references_href: Option<String>,
}

#[derive(Debug, Serialize)]
struct AdminTable<'a> {
    name: &'a str,
    href: String,
    rows: u64,
    synthetic_key: bool,
    columns: Vec<AdminColumn<'a>>,
}

/// Render the admin page. A failing row count is logged and shown as 0.
pub fn render_admin(schema: &Schema, store: &Store, base_path: &str) -> Result<String, ApiError> {
    let tables: Vec<AdminTable<'_>> = schema
        .tables
        .iter()
        .map(|table| {
            let rows = store.count(table).unwrap_or_else(|e| {
                warn!(table = %table.name, error = %e, "Row count failed");
                0
            });
            let columns = table
                .columns
                .iter()
                .map(|c| {
                    let fk = table.foreign_key(&c.name);
                    AdminColumn {
                        name: &c.name,
                        declared_type: &c.declared_type,
                        not_null: c.not_null,
                        default_value: c.default_value.as_deref(),
                        key: table.is_key_column(&c.name),
                        references: fk.map(|fk| format!("{}.{}", fk.ref_table, fk.ref_column)),
                        references_href: fk
                            .map(|fk| collection_href(base_path, &fk.ref_table.to_lowercase())),
                    }
                })
                .collect();
            AdminTable {
                name: &table.name,
                href: collection_href(base_path, &table.resource_name),
                rows,
                synthetic_key: table.synthetic_key,
                columns,
            }
        })
        .collect();

    let mut env = Environment::new();
    env.add_template("admin.html", ADMIN_TEMPLATE)
        .map_err(|e| ApiError::ServerError(e.to_string()))?;
    let tmpl = env
        .get_template("admin.html")
        .map_err(|e| ApiError::ServerError(e.to_string()))?;
    tmpl.render(minijinja::context! {
        tables => tables,
        schema_version => schema.version,
    })
    .map_err(|e| ApiError::ServerError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn test_admin_lists_tables_keys_and_counts() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Artist (ArtistId INTEGER PRIMARY KEY, Name TEXT);
             CREATE TABLE Album (AlbumId INTEGER PRIMARY KEY, Title TEXT,
                 ArtistId INTEGER REFERENCES Artist(ArtistId));
             CREATE TABLE Log (line TEXT);
             INSERT INTO Artist (Name) VALUES ('a'), ('b');",
        )
        .unwrap();
        let store = Store::from_connection(conn, 20).unwrap();
        let schema = store.reflect().unwrap();

        let html = render_admin(&schema, &store, "").unwrap();
        assert!(html.contains(">Artist</a> <small>(2 rows)</small>"));
        assert!(html.contains("ArtistId (key)"));
        assert!(html.contains(">Artist.ArtistId</a>"));
        assert!(html.contains("No primary key declared"));
    }
}
