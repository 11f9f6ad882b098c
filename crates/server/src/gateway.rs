//! Request-time gateway policy: transport enforcement, forwarded-header
//! trust, and the cross-origin allow-list.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};

use crate::routes::auth::ServerState;

pub const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
pub const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Value a single reverse-proxy hop reported for `name`.
///
/// Proxies append to forwarding headers, so only the last element of a
/// comma-separated chain was written by the proxy we actually sit behind.
/// Anything earlier is client-controlled and ignored.
pub fn forwarded_one_hop<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    let raw = headers.get(name)?.to_str().ok()?;
    let last = raw.rsplit(',').next()?.trim();
    if last.is_empty() {
        None
    } else {
        Some(last)
    }
}

/// Rebuild the request URL with an `https` scheme. The authority comes from
/// the one-hop forwarded host, falling back to `Host`; path and query are
/// carried over untouched.
pub fn https_location(headers: &HeaderMap, uri: &Uri) -> Option<Uri> {
    let authority = forwarded_one_hop(headers, X_FORWARDED_HOST)
        .or_else(|| headers.get(header::HOST).and_then(|v| v.to_str().ok()))
        .or_else(|| uri.authority().map(|a| a.as_str()))?;
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    Uri::builder()
        .scheme("https")
        .authority(authority)
        .path_and_query(path_and_query)
        .build()
        .ok()
}

/// Redirect plaintext requests to their `https` equivalent in production.
/// Runs ahead of routing for every request; everything else passes through.
pub async fn enforce_https(State(state): State<ServerState>, req: Request, next: Next) -> Response {
    if state.env.is_production()
        && forwarded_one_hop(req.headers(), X_FORWARDED_PROTO) == Some("http")
    {
        if let Some(location) = https_location(req.headers(), req.uri()) {
            return (
                StatusCode::MOVED_PERMANENTLY,
                [(header::LOCATION, location.to_string())],
            )
                .into_response();
        }
    }
    next.run(req).await
}

/// True when `origin` matches an allow-list entry. Entries ending in `:*`
/// match any port on that host, including the portless form.
pub fn origin_allowed(origin: &str, allowlist: &[String]) -> bool {
    allowlist.iter().any(|entry| match entry.strip_suffix(":*") {
        Some(base) => origin
            .strip_prefix(base)
            .map_or(false, |rest| rest.is_empty() || rest.starts_with(':')),
        None => origin == entry,
    })
}

/// Cross-origin policy for the whole app: allow-listed origins only, with
/// credentials. Credentialed CORS cannot use wildcards, so methods are an
/// explicit list and request headers are mirrored back.
pub fn build_cors(allowed_origins: &[String]) -> CorsLayer {
    let allowlist = allowed_origins.to_vec();
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
                origin
                    .to_str()
                    .map(|o| origin_allowed(o, &allowlist))
                    .unwrap_or(false)
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(AllowHeaders::mirror_request())
}
