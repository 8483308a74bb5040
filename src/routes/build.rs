use super::types::{Action, RouteMeta};
use crate::schema::Schema;
use http::Method;
use tracing::{info, warn};

/// Paths served by the HTTP service itself; tables with these names are not exposed.
pub const RESERVED_RESOURCES: &[&str] = &["health", "metrics", "admin"];

/// Normalize a configured base path: `""`, `"/"` → `""`; `"api/"` → `"/api"`.
#[must_use]
pub fn normalize_base_path(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

/// Build the route table for every reflected table.
///
/// Each table `T` with resource name `t` gets:
///
/// | Method  | Path       | Action  |
/// |---------|------------|---------|
/// | GET     | `/t`       | List    |
/// | POST    | `/t`       | Create  |
/// | OPTIONS | `/t`       | Options |
/// | GET     | `/t/{id}`  | Read    |
/// | PUT     | `/t/{id}`  | Replace |
/// | PATCH   | `/t/{id}`  | Update  |
/// | DELETE  | `/t/{id}`  | Delete  |
/// | OPTIONS | `/t/{id}`  | Options |
#[must_use]
pub fn build_routes(schema: &Schema, base_path: &str) -> Vec<RouteMeta> {
    let base_path = normalize_base_path(base_path);
    let mut routes = Vec::with_capacity(schema.tables.len() * 8);

    for table in &schema.tables {
        let resource = table.resource_name.as_str();
        if RESERVED_RESOURCES.contains(&resource) {
            warn!(
                table = %table.name,
                resource = %resource,
                "Table name collides with a built-in endpoint; not exposed"
            );
            continue;
        }
        if resource.contains('/') || resource.contains('{') {
            warn!(table = %table.name, "Table name is not usable as a path segment; not exposed");
            continue;
        }

        let collection = format!("/{resource}");
        let item = format!("/{resource}/{{id}}");
        let table_routes = [
            (Method::GET, &collection, Action::List),
            (Method::POST, &collection, Action::Create),
            (Method::OPTIONS, &collection, Action::Options),
            (Method::GET, &item, Action::Read),
            (Method::PUT, &item, Action::Replace),
            (Method::PATCH, &item, Action::Update),
            (Method::DELETE, &item, Action::Delete),
            (Method::OPTIONS, &item, Action::Options),
        ];
        for (method, path, action) in table_routes {
            routes.push(RouteMeta {
                method,
                path_pattern: path.clone(),
                handler_name: format!("{action}_{resource}"),
                table: table.clone(),
                action,
                base_path: base_path.clone(),
            });
        }
    }

    info!(
        routes_count = routes.len(),
        base_path = %base_path,
        "Routes built from schema"
    );
    routes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnMeta, ColumnType, TableMeta};
    use std::sync::Arc;

    fn table(name: &str) -> Arc<TableMeta> {
        Arc::new(TableMeta {
            name: name.to_string(),
            resource_name: name.to_lowercase(),
            columns: vec![ColumnMeta {
                name: "id".to_string(),
                declared_type: "INTEGER".to_string(),
                column_type: ColumnType::Integer,
                not_null: false,
                default_value: None,
                primary_key_position: Some(1),
            }],
            primary_key: vec!["id".to_string()],
            foreign_keys: Vec::new(),
            synthetic_key: false,
        })
    }

    #[test]
    fn test_normalize_base_path() {
        assert_eq!(normalize_base_path(""), "");
        assert_eq!(normalize_base_path("/"), "");
        assert_eq!(normalize_base_path("api/"), "/api");
        assert_eq!(normalize_base_path("/api/v1"), "/api/v1");
    }

    #[test]
    fn test_eight_routes_per_table() {
        let schema = Schema {
            tables: vec![table("Artist"), table("Album")],
            version: 1,
        };
        let routes = build_routes(&schema, "/api");
        assert_eq!(routes.len(), 16);
        let read = routes
            .iter()
            .find(|r| r.handler_name == "read_artist")
            .unwrap();
        assert_eq!(read.method, Method::GET);
        assert_eq!(read.path_pattern, "/artist/{id}");
        assert_eq!(read.base_path, "/api");
        assert!(read.is_item());
        assert_eq!(read.collection_url(), "/api/artist");
    }

    #[test]
    fn test_reserved_names_skipped() {
        let schema = Schema {
            tables: vec![table("Metrics"), table("Genre")],
            version: 1,
        };
        let routes = build_routes(&schema, "");
        assert!(routes.iter().all(|r| r.table.name == "Genre"));
    }
}
