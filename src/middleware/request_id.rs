use axum::{
    body::Body,
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Header carrying the request id on requests and responses
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Per-request correlation id, stored in request extensions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Creates a fresh random request id
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Reads a request id from the inbound headers, if one was sent
    ///
    /// Only a well-formed UUID is honored; anything else is treated as
    /// absent so a caller cannot inject arbitrary text into logs.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        let raw = headers.get(REQUEST_ID_HEADER)?.to_str().ok()?;
        Uuid::parse_str(raw).ok().map(Self)
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Middleware assigning each request a correlation id
///
/// An inbound `x-request-id` header is honored when it parses as a UUID;
/// otherwise a new one is generated. The id is placed in request extensions
/// for handlers and echoed on the response.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = RequestId::from_headers(request.headers()).unwrap_or_default();
    request.extensions_mut().insert(request_id);

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Builds the per-request tracing span, tagged with the correlation id
pub fn make_span_with_request_id(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(ToString::to_string)
        .unwrap_or_else(|| "none".to_string());

    tracing::info_span!(
        "http_request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}
