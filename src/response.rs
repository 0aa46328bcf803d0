use axum::{
    body::Body,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

pub const ALLOW_ORIGIN: &str = "*";
pub const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const ALLOW_HEADERS: &str = "Authorization, Content-Type";

/// Plain-text error with only the allow-origin header set. `None` yields an empty body.
pub fn error_response(status: StatusCode, message: Option<String>) -> Response {
    let body = match message {
        Some(message) => Body::from(message),
        None => Body::empty(),
    };
    (
        status,
        [(header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN)],
        body,
    )
        .into_response()
}

pub fn preflight_response() -> Response {
    (
        StatusCode::OK,
        [
            (header::ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW_ORIGIN),
            (header::ACCESS_CONTROL_ALLOW_METHODS, ALLOW_METHODS),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, ALLOW_HEADERS),
        ],
        Body::empty(),
    )
        .into_response()
}

pub fn usage_response(service_name: &str, origin: &str) -> Response {
    let body = format!("{service_name}\n\nUsage:\n{origin}/token");
    (StatusCode::OK, body).into_response()
}

/// Sets the allow-origin header, replacing whatever the upstream sent.
pub(crate) fn allow_any_origin(response: &mut Response) {
    response.headers_mut().insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(ALLOW_ORIGIN),
    );
}
