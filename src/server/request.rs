use crate::dispatcher::HeaderVec;
use crate::error::ApiError;
use crate::router::ParamVec;
use may_minihttp::Request;
use serde_json::{Map, Value};
use std::io::Read;
use std::sync::Arc;
use tracing::debug;

/// Request body after content-type dispatch
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    /// `application/x-www-form-urlencoded`, as an object of strings
    Form(Value),
    /// Body that claimed (or defaulted to) JSON but did not parse
    Malformed(String),
    /// Body with a content type we cannot read
    Unsupported(String),
}

impl RequestBody {
    /// The body as a JSON value for a handler; unreadable bodies are client errors.
    pub fn into_value(self) -> Result<Option<Value>, ApiError> {
        match self {
            RequestBody::Empty => Ok(None),
            RequestBody::Json(v) | RequestBody::Form(v) => Ok(Some(v)),
            RequestBody::Malformed(e) => Err(ApiError::BadRequest(format!("invalid JSON body: {e}"))),
            RequestBody::Unsupported(ct) => Err(ApiError::UnsupportedMediaType(format!(
                "Content-type [{ct}] not supported."
            ))),
        }
    }
}

/// Parsed HTTP request data used by `AppService`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    pub method: String,
    /// Path without the query string
    pub path: String,
    /// Headers with lower-cased names
    pub headers: HeaderVec,
    /// Query parameters in order of appearance
    pub query_params: ParamVec,
    pub body: RequestBody,
}

impl ParsedRequest {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Decode the query string of `raw_path`, keeping repeated keys in order.
#[must_use]
pub fn parse_query_params(raw_path: &str) -> ParamVec {
    match raw_path.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => ParamVec::new(),
    }
}

/// Interpret raw body bytes according to `content_type`.
#[must_use]
pub fn parse_body(content_type: Option<&str>, bytes: &[u8]) -> RequestBody {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return RequestBody::Empty;
    }
    let media_type = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match media_type.as_str() {
        "application/x-www-form-urlencoded" => {
            let mut form = Map::new();
            for (k, v) in url::form_urlencoded::parse(bytes) {
                form.insert(k.into_owned(), Value::String(v.into_owned()));
            }
            RequestBody::Form(Value::Object(form))
        }
        "" | "application/json" => match serde_json::from_slice(bytes) {
            Ok(v) => RequestBody::Json(v),
            Err(e) => RequestBody::Malformed(e.to_string()),
        },
        ct if ct.ends_with("+json") => match serde_json::from_slice(bytes) {
            Ok(v) => RequestBody::Json(v),
            Err(e) => RequestBody::Malformed(e.to_string()),
        },
        other => RequestBody::Unsupported(other.to_string()),
    }
}

/// Extract method, path, headers, query and body from a `may_minihttp::Request`.
pub fn parse_request(req: Request) -> ParsedRequest {
    let method = req.method().to_string();
    let raw_path = req.path().to_string();
    let path = raw_path.split('?').next().unwrap_or("/").to_string();

    let headers: HeaderVec = req
        .headers()
        .iter()
        .map(|h| {
            (
                Arc::from(h.name.to_ascii_lowercase().as_str()),
                String::from_utf8_lossy(h.value).to_string(),
            )
        })
        .collect();

    let query_params = parse_query_params(&raw_path);

    let mut bytes = Vec::new();
    let body = match req.body().read_to_end(&mut bytes) {
        Ok(_) => {
            let content_type = headers
                .iter()
                .find(|(k, _)| k.as_ref() == "content-type")
                .map(|(_, v)| v.as_str());
            parse_body(content_type, &bytes)
        }
        Err(e) => RequestBody::Malformed(e.to_string()),
    };

    debug!(
        method = %method,
        path = %path,
        headers_count = headers.len(),
        query_params = ?query_params,
        body_bytes = bytes.len(),
        "HTTP request parsed"
    );

    ParsedRequest {
        method,
        path,
        headers,
        query_params,
        body,
    }
}
