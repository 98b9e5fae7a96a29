// Copyright 2025 RustFS Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use axum::extract::{FromRequestParts, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::request::Parts;
use http::{HeaderValue, header};
use tracing::debug;

use crate::console::error::{Error, ErrorKind};
use crate::console::session::{self, Claims, SESSION_COOKIE};
use crate::console::state::AppState;

/// Decodes the session cookie. A valid session attaches its [`Claims`] to
/// the request and a bearer header carrying the decrypted cluster session
/// token; anything else is left for the handlers to reject.
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    if let Some(token) = session::read_cookie(request.headers(), SESSION_COOKIE) {
        match state.codec.decode(&token) {
            Ok(claims) => {
                if let Ok(bearer) = HeaderValue::from_str(&format!("Bearer {}", claims.sts_session_token)) {
                    request.headers_mut().insert(header::AUTHORIZATION, bearer);
                }
                request.extensions_mut().insert(claims);
            }
            Err(e) => debug!("ignoring session cookie: {}", e),
        }
    }

    next.run(request).await
}

/// The authenticated principal of a request.
#[derive(Clone, Debug)]
pub struct Principal(pub Claims);

impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(Principal)
            .ok_or_else(|| Error::new(ErrorKind::InvalidSession))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::cluster::MemoryCluster;
    use crate::console::state::testing;
    use axum::Router;
    use axum::body::Body;
    use axum::routing::get;
    use tower::ServiceExt;

    async fn whoami(Principal(claims): Principal, headers: http::HeaderMap) -> String {
        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        format!("{}|{}", claims.sts_session_token, bearer)
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/api/v1/whoami", get(whoami))
            .layer(axum::middleware::from_fn_with_state(state.clone(), auth_middleware))
            .with_state(state)
    }

    fn request(cookie: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/api/v1/whoami");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let state = testing::state(MemoryCluster::new());
        let cookie = testing::session_cookie(&state, "sa-token");

        let response = app(state).oneshot(request(Some(&cookie))).await.unwrap();
        assert_eq!(response.status(), http::StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"sa-token|Bearer sa-token");
    }

    #[tokio::test]
    async fn test_missing_or_tampered_session_is_rejected_by_handler() {
        let state = testing::state(MemoryCluster::new());
        let app = app(state);

        let missing = app.clone().oneshot(request(None)).await.unwrap();
        assert_eq!(missing.status(), http::StatusCode::UNAUTHORIZED);

        let tampered = app.oneshot(request(Some("token=AAAA"))).await.unwrap();
        assert_eq!(tampered.status(), http::StatusCode::UNAUTHORIZED);
    }
}
