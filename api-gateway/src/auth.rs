//! HTTP Basic authentication middleware.
//!
//! When the configured user table is non-empty, every request must carry
//! an `Authorization: Basic ...` header whose credentials match a table
//! entry exactly; anything else is answered with `401`. An absent or
//! empty table leaves the gateway open.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::routes::ApiEnvelope;
use crate::state::SharedState;

/// Gate applied in front of every route.
pub async fn require_basic_auth(
    State(state): State<SharedState>,
    req: Request,
    next: Next,
) -> Response {
    if state.authorized_users.is_empty() {
        return next.run(req).await;
    }

    let presented = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_basic_credentials);

    if let Some((user, password)) = presented
        && state
            .authorized_users
            .get(&user)
            .is_some_and(|expected| expected.as_bytes() == password.as_bytes())
    {
        return next.run(req).await;
    }

    unauthorized()
}

/// Extracts `(user, password)` from a `Basic` authorization header value.
fn parse_basic_credentials(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn unauthorized() -> Response {
    let envelope = ApiEnvelope::fail(401, "unauthorized", None);
    let mut response = (StatusCode::UNAUTHORIZED, Json(envelope)).into_response();
    response.headers_mut().insert(
        header::WWW_AUTHENTICATE,
        HeaderValue::from_static("Basic realm=\"ledger\""),
    );
    response
}
