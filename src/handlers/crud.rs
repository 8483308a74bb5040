use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::ApiError;
use crate::routes::{Action, COLLECTION_ALLOW, ITEM_ALLOW};
use crate::schema::TableMeta;
use crate::store::{fields_from_object, Fields, ListQuery, Store};
use rusqlite::types::Value as SqlValue;
use serde_json::{json, Map, Value};
use tracing::debug;

/// Run `action` on `table` for one request.
pub fn handle(
    store: &Store,
    table: &TableMeta,
    action: Action,
    req: &HandlerRequest,
) -> Result<HandlerResponse, ApiError> {
    match action {
        Action::List => list(store, table, req),
        Action::Read => read(store, table, req),
        Action::Create => create(store, table, req),
        Action::Replace => replace(store, table, req),
        Action::Update => update(store, table, req),
        Action::Delete => delete(store, table, req),
        Action::Options => Ok(options(req)),
    }
}

fn list(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let query = ListQuery::from_params(table, req.query_params.as_slice())?;
    let rows = store.list(table, &query)?;
    debug!(table = %table.name, rows = rows.len(), "Collection listed");
    let resources: Vec<Value> = rows.into_iter().map(Value::Object).collect();
    Ok(HandlerResponse::json(200, json!({ "resources": resources })))
}

fn read(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let key = resource_key(table, req)?;
    match store.get(table, &key)? {
        Some(row) => Ok(HandlerResponse::json(200, Value::Object(row))),
        None => Err(ApiError::not_found()),
    }
}

fn create(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let body = body_object(req)?;
    require_columns(table, body)?;
    let fields = fields_from_object(table, body)?;
    if store.find_matching(table, &fields)?.is_some() {
        return Err(ApiError::BadRequest("resource already exists".to_string()));
    }
    let row = store.insert(table, &fields)?;
    Ok(HandlerResponse::json(201, Value::Object(row)))
}

fn replace(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let body = body_object(req)?;
    require_columns(table, body)?;
    let key = resource_key(table, req)?;
    let fields = fields_from_object(table, body)?;
    check_body_key(table, &key, &fields)?;
    let fields = non_key_fields(table, fields);

    if store.get(table, &key)?.is_some() {
        store.replace(table, &key, &fields)?;
        return Ok(HandlerResponse::no_content());
    }
    let row = store.insert(table, &with_key(key, fields))?;
    Ok(HandlerResponse::json(201, Value::Object(row)))
}

fn update(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let body = body_object(req)?;
    let key = resource_key(table, req)?;
    let fields = fields_from_object(table, body)?;
    check_body_key(table, &key, &fields)?;
    let fields = non_key_fields(table, fields);

    if store.get(table, &key)?.is_some() {
        store.update(table, &key, &fields)?;
        return Ok(HandlerResponse::no_content());
    }
    let row = store.insert(table, &with_key(key, fields))?;
    Ok(HandlerResponse::json(201, Value::Object(row)))
}

fn delete(store: &Store, table: &TableMeta, req: &HandlerRequest) -> Result<HandlerResponse, ApiError> {
    let key = resource_key(table, req)?;
    if store.delete(table, &key)? {
        Ok(HandlerResponse::no_content())
    } else {
        Err(ApiError::not_found())
    }
}

fn options(req: &HandlerRequest) -> HandlerResponse {
    let allow = if req.get_path_param("id").is_some() {
        ITEM_ALLOW
    } else {
        COLLECTION_ALLOW
    };
    HandlerResponse::no_content().with_header(allow)
}

fn resource_key(table: &TableMeta, req: &HandlerRequest) -> Result<Vec<(String, SqlValue)>, ApiError> {
    let raw = req
        .get_path_param("id")
        .ok_or_else(|| ApiError::BadRequest("missing resource id".to_string()))?;
    table.parse_key(raw)
}

/// The request body as a non-empty JSON object
fn body_object(req: &HandlerRequest) -> Result<&Map<String, Value>, ApiError> {
    let no_data = || ApiError::BadRequest("No data received from request".to_string());
    match req.body.as_ref() {
        None | Some(Value::Null) => Err(no_data()),
        Some(Value::Object(map)) if map.is_empty() => Err(no_data()),
        Some(Value::Object(map)) => Ok(map),
        Some(Value::Array(items)) if items.is_empty() => Err(no_data()),
        Some(Value::String(s)) if s.is_empty() => Err(no_data()),
        Some(_) => Err(ApiError::BadRequest(
            "request body must be a JSON object".to_string(),
        )),
    }
}

/// Every non-key column must be present in the body
fn require_columns(table: &TableMeta, body: &Map<String, Value>) -> Result<(), ApiError> {
    match table.required_columns().find(|c| !body.contains_key(&c.name)) {
        Some(missing) => Err(ApiError::Forbidden(format!(
            "{}.{} required",
            table.name, missing.name
        ))),
        None => Ok(()),
    }
}

/// Key columns sent in the body must name the same row as the path id
fn check_body_key(table: &TableMeta, key: &[(String, SqlValue)], fields: &Fields) -> Result<(), ApiError> {
    for (name, value) in fields {
        let Some((_, expected)) = key.iter().find(|(k, _)| k == name) else {
            continue;
        };
        if !same_value(value, expected) {
            return Err(ApiError::BadRequest(format!(
                "{}.{} in the body does not match the resource id",
                table.name, name
            )));
        }
    }
    Ok(())
}

fn same_value(a: &SqlValue, b: &SqlValue) -> bool {
    match (a, b) {
        (SqlValue::Integer(i), SqlValue::Real(f)) | (SqlValue::Real(f), SqlValue::Integer(i)) => {
            *i as f64 == *f
        }
        _ => a == b,
    }
}

fn non_key_fields(table: &TableMeta, fields: Fields) -> Fields {
    fields
        .into_iter()
        .filter(|(name, _)| !table.is_key_column(name))
        .collect()
}

fn with_key(key: Vec<(String, SqlValue)>, fields: Fields) -> Fields {
    key.into_iter().chain(fields).collect()
}
