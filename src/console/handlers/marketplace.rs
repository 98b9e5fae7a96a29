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
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use snafu::ResultExt;

use crate::console::error::{MarketplaceSnafu, Result};
use crate::console::marketplace::Marketplace;
use crate::console::middleware::auth::Principal;
use crate::console::models::marketplace::*;
use crate::console::state::AppState;

use super::{cluster_clients, http_client};

pub async fn get_mp_integration(State(state): State<AppState>, principal: Principal) -> Result<Json<MpIntegration>> {
    let clients = cluster_clients(&state, &principal).await?;
    let marketplace = Marketplace::new(http_client(&state, &state.config.mp_host)?, &state.config);

    let is_email_set = marketplace
        .is_email_set(clients.core.as_ref())
        .await
        .context(MarketplaceSnafu)?;
    Ok(Json(MpIntegration { is_email_set }))
}

pub async fn post_mp_integration(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<MpIntegrationRequest>,
) -> Result<StatusCode> {
    let host = if req.is_in_eu {
        &state.config.mp_eu_host
    } else {
        &state.config.mp_host
    };
    let marketplace = Marketplace::new(http_client(&state, host)?, &state.config);
    let clients = cluster_clients(&state, &principal).await?;

    marketplace
        .register_email(clients.core.as_ref(), &req.email, req.is_in_eu)
        .await
        .context(MarketplaceSnafu)?;
    Ok(StatusCode::CREATED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::admin::MemoryAdminConnector;
    use crate::console::cluster::MemoryCluster;
    use crate::console::error::ErrorResponse;
    use crate::console::server;
    use crate::console::state::testing;
    use axum::body::Body;
    use axum::http::header;
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn call(state: &AppState, request: http::request::Builder, body: Body) -> (StatusCode, bytes::Bytes) {
        let request = request
            .uri("/api/v1/mp-integration")
            .header(header::COOKIE, testing::session_cookie(state, "admin"))
            .body(body)
            .unwrap();
        let response = server::router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        (status, axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    fn post(email: &str) -> (http::request::Builder, Body) {
        (
            http::Request::builder()
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json"),
            Body::from(json!({"email": email, "isInEU": false}).to_string()),
        )
    }

    #[tokio::test]
    async fn test_email_registration() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/mp-email"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mut config = testing::config();
        config.mp_host = server.uri();
        let state = testing::state_with(config, MemoryCluster::new().with_token("admin"), MemoryAdminConnector::new());

        let (status, _) = call(&state, http::Request::builder(), Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (builder, body) = post("");
        let (status, body) = call(&state, builder, body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.detailed_message, "Email was not sent in request");

        let (builder, body) = post("ops@example.com");
        let (status, _) = call(&state, builder, body).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(&state, http::Request::builder(), Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<MpIntegration>(&body).unwrap(),
            MpIntegration { is_email_set: true }
        );
    }
}
