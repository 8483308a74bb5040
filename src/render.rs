//! HTML representation of rows, collections, the resource index and errors.
//!
//! Templates live in `templates/` and are compiled in by askama. Values are
//! escaped by askama; links are built here so the templates stay dumb.

use crate::routes::{collection_href, RouteMeta};
use crate::schema::{Schema, TableMeta};
use crate::server::status_reason;
use crate::store::Row;
use askama::Template;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct HtmlCell {
    pub name: String,
    pub text: String,
    pub link: String,
    pub has_link: bool,
}

#[derive(Debug, Clone)]
pub struct HtmlRow {
    pub link: String,
    pub cells: Vec<HtmlCell>,
}

#[derive(Debug, Clone)]
pub struct IndexLink {
    pub name: String,
    pub href: String,
}

#[derive(Template)]
#[template(path = "collection.html")]
struct CollectionTemplate<'a> {
    home_url: &'a str,
    title: &'a str,
    collection_url: String,
    columns: Vec<&'a str>,
    rows: Vec<HtmlRow>,
    form_fields: Vec<&'a str>,
}

#[derive(Template)]
#[template(path = "resource.html")]
struct ResourceTemplate<'a> {
    home_url: &'a str,
    title: String,
    table_name: &'a str,
    collection_url: String,
    cells: Vec<HtmlCell>,
}

#[derive(Template)]
#[template(path = "error.html")]
struct ErrorTemplate<'a> {
    home_url: &'a str,
    status: u16,
    reason: &'static str,
    message: &'a str,
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    home_url: &'a str,
    admin_url: &'a str,
    links: Vec<IndexLink>,
}

/// URL of the index page for a base path (`""` → `/`)
#[must_use]
pub fn home_url(base_path: &str) -> &str {
    if base_path.is_empty() {
        "/"
    } else {
        base_path
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Path segment addressing `row`: key values comma-joined, each percent-encoded
#[must_use]
pub fn resource_id(table: &TableMeta, row: &Map<String, Value>) -> String {
    table
        .primary_key
        .iter()
        .map(|k| urlencoding::encode(&cell_text(row.get(k).unwrap_or(&Value::Null))).into_owned())
        .collect::<Vec<_>>()
        .join(",")
}

fn cells(table: &TableMeta, row: &Row, base_path: &str) -> Vec<HtmlCell> {
    table
        .columns
        .iter()
        .map(|column| {
            let value = row.get(&column.name).unwrap_or(&Value::Null);
            let text = cell_text(value);
            let link = match (table.foreign_key(&column.name), value.is_null()) {
                (Some(fk), false) => format!(
                    "{}/{}",
                    collection_href(base_path, &fk.ref_table.to_lowercase()),
                    urlencoding::encode(&text)
                ),
                _ => String::new(),
            };
            HtmlCell {
                name: column.name.clone(),
                has_link: !link.is_empty(),
                link,
                text,
            }
        })
        .collect()
}

fn collection_html(route: &RouteMeta, body: &Value) -> askama::Result<String> {
    let table = &route.table;
    let collection_url = route.collection_url();
    let rows = body
        .get("resources")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_object)
        .map(|row| HtmlRow {
            link: format!("{collection_url}/{}", resource_id(table, row)),
            cells: cells(table, row, &route.base_path),
        })
        .collect();

    CollectionTemplate {
        home_url: home_url(&route.base_path),
        title: &table.name,
        columns: table.columns.iter().map(|c| c.name.as_str()).collect(),
        form_fields: table.required_columns().map(|c| c.name.as_str()).collect(),
        collection_url,
        rows,
    }
    .render()
}

fn resource_html(route: &RouteMeta, row: &Row) -> askama::Result<String> {
    let table = &route.table;
    ResourceTemplate {
        home_url: home_url(&route.base_path),
        title: format!("{} {}", table.name, resource_id(table, row)),
        table_name: &table.name,
        collection_url: route.collection_url(),
        cells: cells(table, row, &route.base_path),
    }
    .render()
}

/// Error page; the message is the `error` field of an error body
pub fn error_html(status: u16, body: &Value, base_path: &str) -> askama::Result<String> {
    let message = body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default();
    ErrorTemplate {
        home_url: home_url(base_path),
        status,
        reason: status_reason(status),
        message,
    }
    .render()
}

/// Index of every exposed resource
pub fn index_html(schema: &Schema, base_path: &str) -> askama::Result<String> {
    IndexTemplate {
        home_url: home_url(base_path),
        admin_url: "/admin",
        links: index_links(schema, base_path),
    }
    .render()
}

/// `(name, href)` for every table, in schema order
#[must_use]
pub fn index_links(schema: &Schema, base_path: &str) -> Vec<IndexLink> {
    schema
        .tables
        .iter()
        .filter(|t| !crate::routes::RESERVED_RESOURCES.contains(&t.resource_name.as_str()))
        .map(|t| IndexLink {
            name: t.name.clone(),
            href: collection_href(base_path, &t.resource_name),
        })
        .collect()
}

/// Render a handler response body for `route` as HTML.
///
/// Error statuses use the error page; item routes render the row; collection
/// routes render the `resources` table.
pub fn render_html(status: u16, body: &Value, route: &RouteMeta) -> askama::Result<String> {
    if status >= 400 {
        return error_html(status, body, &route.base_path);
    }
    match body {
        Value::Object(row) if !row.contains_key("resources") => resource_html(route, row),
        _ => collection_html(route, body),
    }
}
