use crate::schema::TableMeta;
use http::Method;
use std::fmt;
use std::sync::Arc;

/// `Allow` header sent for collection paths (`/artist`)
pub const COLLECTION_ALLOW: &str = "Allow: GET, POST, OPTIONS";
/// `Allow` header sent for item paths (`/artist/{id}`)
pub const ITEM_ALLOW: &str = "Allow: GET, PUT, PATCH, DELETE, OPTIONS";

/// The CRUD operation a route performs on its table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    List,
    Create,
    Read,
    Replace,
    Update,
    Delete,
    Options,
}

impl Action {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::List => "list",
            Action::Create => "create",
            Action::Read => "read",
            Action::Replace => "replace",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Options => "options",
        }
    }

    /// Whether the action carries a body that is validated against the table
    #[must_use]
    pub fn writes(&self) -> bool {
        matches!(self, Action::Create | Action::Replace | Action::Update)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single registered endpoint: one method on one path of one table
#[derive(Debug, Clone)]
pub struct RouteMeta {
    pub method: Method,
    /// Pattern relative to `base_path`, e.g. `/artist/{id}`
    pub path_pattern: String,
    pub handler_name: String,
    pub table: Arc<TableMeta>,
    pub action: Action,
    pub base_path: String,
}

impl RouteMeta {
    /// Whether the route addresses a single resource (`/{resource}/{id}`)
    #[must_use]
    pub fn is_item(&self) -> bool {
        self.path_pattern.ends_with("/{id}")
    }

    /// Static `Allow` header line for this route's path
    #[must_use]
    pub fn allow_header(&self) -> &'static str {
        if self.is_item() {
            ITEM_ALLOW
        } else {
            COLLECTION_ALLOW
        }
    }

    /// Collection URL including the base path, e.g. `/api/artist`
    #[must_use]
    pub fn collection_url(&self) -> String {
        collection_href(&self.base_path, &self.table.resource_name)
    }
}

/// Link to a resource collection with the resource name percent-encoded
/// (`Invoice Line` → `/api/invoice%20line`)
#[must_use]
pub fn collection_href(base_path: &str, resource_name: &str) -> String {
    format!("{base_path}/{}", urlencoding::encode(resource_name))
}
