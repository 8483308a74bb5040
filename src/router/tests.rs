use super::Router;
use crate::routes::build_routes;
use crate::schema::{ColumnMeta, ColumnType, Schema, TableMeta};
use http::Method;
use std::sync::Arc;

fn table(name: &str) -> Arc<TableMeta> {
    Arc::new(TableMeta {
        name: name.to_string(),
        resource_name: name.to_lowercase(),
        columns: vec![ColumnMeta {
            name: format!("{name}Id"),
            declared_type: "INTEGER".to_string(),
            column_type: ColumnType::Integer,
            not_null: true,
            default_value: None,
            primary_key_position: Some(1),
        }],
        primary_key: vec![format!("{name}Id")],
        foreign_keys: Vec::new(),
        synthetic_key: false,
    })
}

fn schema() -> Schema {
    Schema {
        tables: vec![table("Album"), table("Artist")],
        version: 7,
    }
}

#[test]
fn test_every_generated_route_matches() {
    let router = Router::new(build_routes(&schema(), ""));
    let cases = [
        (Method::GET, "/artist", "list_artist"),
        (Method::POST, "/artist", "create_artist"),
        (Method::OPTIONS, "/artist", "options_artist"),
        (Method::GET, "/artist/1", "read_artist"),
        (Method::PUT, "/artist/1", "replace_artist"),
        (Method::PATCH, "/artist/1", "update_artist"),
        (Method::DELETE, "/artist/1", "delete_artist"),
        (Method::GET, "/album/9", "read_album"),
    ];
    for (method, path, handler) in cases {
        let m = router
            .route(method.clone(), path)
            .unwrap_or_else(|| panic!("{method} {path} should match"));
        assert_eq!(m.handler_name, handler);
    }
}

#[test]
fn test_id_param_extracted() {
    let router = Router::new(build_routes(&schema(), "/api"));
    let m = router.route(Method::GET, "/api/album/12").unwrap();
    assert_eq!(m.get_path_param("id"), Some("12"));
    assert_eq!(m.route.table.name, "Album");
}

#[test]
fn test_unknown_and_nested_paths_do_not_match() {
    let router = Router::new(build_routes(&schema(), ""));
    assert!(router.route(Method::GET, "/genre").is_none());
    assert!(router.route(Method::GET, "/artist/1/albums").is_none());
    assert!(router.route(Method::POST, "/artist/1").is_none());
    assert_eq!(router.routes_for_path("/artist/1").len(), 5);
    assert_eq!(router.routes_for_path("/artist").len(), 3);
}

#[test]
fn test_trailing_slash_is_ignored() {
    let router = Router::new(build_routes(&schema(), ""));
    assert!(router.route(Method::GET, "/artist/").is_some());
}

#[test]
fn test_table_name_with_space_is_reachable_encoded() {
    let schema = Schema {
        tables: vec![table("Invoice Line")],
        version: 1,
    };
    let router = Router::new(build_routes(&schema, "/api"));
    let m = router.route(Method::GET, "/api/invoice%20line").unwrap();
    assert_eq!(m.handler_name, "list_invoice line");
    let m = router.route(Method::DELETE, "/api/invoice%20line/5").unwrap();
    assert_eq!(m.get_path_param("id"), Some("5"));
    assert_eq!(m.route.collection_url(), "/api/invoice%20line");
}
