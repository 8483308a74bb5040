use crate::negotiation::Representation;
use may_minihttp::Response;
use serde_json::Value;

/// Reason phrase for the status codes the service emits
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        406 => "Not Acceptable",
        409 => "Conflict",
        415 => "Unsupported Media Type",
        500 => "Internal Server Error",
        501 => "Not Implemented",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

/// Write status, static headers and an already rendered body.
///
/// `204` never carries a body or content type.
pub fn write_raw(
    res: &mut Response,
    status: u16,
    content_type: &'static str,
    headers: &[&'static str],
    body: Vec<u8>,
) {
    res.status_code(status as usize, status_reason(status));
    for &line in headers {
        res.header(line);
    }
    if status == 204 {
        return;
    }
    res.header(content_type);
    res.body_vec(body);
}

/// Write a JSON body
pub fn write_json(res: &mut Response, status: u16, headers: &[&'static str], body: &Value) {
    let bytes = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    write_raw(
        res,
        status,
        Representation::Json.content_type_header(),
        headers,
        bytes,
    );
}

/// Write an HTML page
pub fn write_html(res: &mut Response, status: u16, headers: &[&'static str], html: String) {
    write_raw(
        res,
        status,
        Representation::Html.content_type_header(),
        headers,
        html.into_bytes(),
    );
}
