//! Content negotiation between the JSON and HTML representations.

use crate::error::ApiError;

/// Media types answered with HTML. Form posts come from the HTML pages, so
/// they get HTML back.
pub const HTML_TYPES: &[&str] = &["text/html", "application/x-www-form-urlencoded"];
pub const JSON_TYPES: &[&str] = &["application/json"];
pub const ANY_TYPE: &str = "*/*";

/// Which representation a response is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Json,
    Html,
}

impl Representation {
    /// `Content-Type` header line for this representation
    #[must_use]
    pub fn content_type_header(&self) -> &'static str {
        match self {
            Representation::Json => "Content-Type: application/json",
            Representation::Html => "Content-Type: text/html; charset=utf-8",
        }
    }
}

/// Pick a representation from the `Accept` header.
///
/// A missing header or exactly `*/*` means JSON. Otherwise HTML wins over
/// JSON when both are listed; media-type parameters (`;q=0.8`) are ignored.
pub fn negotiate(accept: Option<&str>) -> Result<Representation, ApiError> {
    let accept = match accept.map(str::trim) {
        None | Some("") | Some(ANY_TYPE) => return Ok(Representation::Json),
        Some(a) => a,
    };

    let media_types: Vec<String> = accept
        .split(',')
        .map(|item| {
            item.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        })
        .filter(|m| !m.is_empty())
        .collect();

    if media_types.iter().any(|m| HTML_TYPES.contains(&m.as_str())) {
        Ok(Representation::Html)
    } else if media_types
        .iter()
        .any(|m| JSON_TYPES.contains(&m.as_str()) || m == ANY_TYPE)
    {
        Ok(Representation::Json)
    } else {
        Err(ApiError::NotAcceptable(format!(
            "none of [{accept}] can be produced; acceptable: application/json, text/html"
        )))
    }
}
