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
use axum::extract::{Query, State};
use snafu::ResultExt;

use crate::console::error::{Result, SubnetSnafu};
use crate::console::middleware::auth::Principal;
use crate::console::models::subnet::*;
use crate::console::state::AppState;
use crate::console::subnet::{self, LoginResponse, SubnetClient};

use super::{cluster_clients, http_client};

fn subnet_client(state: &AppState) -> Result<SubnetClient> {
    let base_url = &state.config.subnet_base_url;
    Ok(SubnetClient::new(http_client(state, base_url)?, base_url.as_str()))
}

pub async fn login(
    State(state): State<AppState>,
    _principal: Principal,
    Json(req): Json<SubnetLoginRequest>,
) -> Result<Json<LoginResponse>> {
    let response = subnet_client(&state)?
        .login(&req.username, &req.password)
        .await
        .context(SubnetSnafu)?;
    Ok(Json(response))
}

pub async fn login_mfa(
    State(state): State<AppState>,
    _principal: Principal,
    Json(req): Json<SubnetMfaRequest>,
) -> Result<Json<LoginResponse>> {
    let response = subnet_client(&state)?
        .login_mfa(&req.username, &req.mfa_token, &req.otp)
        .await
        .context(SubnetSnafu)?;
    Ok(Json(response))
}

/// Exchanges a licensing access token for the account's api key.
pub async fn api_key(
    State(state): State<AppState>,
    _principal: Principal,
    Query(query): Query<ApiKeyQuery>,
) -> Result<Json<ApiKey>> {
    let api_key = subnet_client(&state)?
        .api_key(&query.token)
        .await
        .context(SubnetSnafu)?;
    Ok(Json(ApiKey { api_key }))
}

/// Registers every tenant, then records the fleet as registered.
pub async fn register(
    State(state): State<AppState>,
    principal: Principal,
    Json(req): Json<ApiKey>,
) -> Result<Json<ApiKeyInfo>> {
    let subnet = subnet_client(&state)?;
    let clients = cluster_clients(&state, &principal).await?;

    subnet::register_tenants(
        &subnet,
        &clients,
        state.admins.as_ref(),
        &req.api_key,
        &state.config.api_key_secret_name,
    )
    .await
    .context(SubnetSnafu)?;

    Ok(Json(ApiKeyInfo { registered: true }))
}

pub async fn api_key_info(State(state): State<AppState>, principal: Principal) -> Result<Json<ApiKeyInfo>> {
    let clients = cluster_clients(&state, &principal).await?;
    let registered = subnet::api_key_registered(clients.core.as_ref(), &state.config.api_key_secret_name)
        .await
        .context(SubnetSnafu)?;
    Ok(Json(ApiKeyInfo { registered }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::admin::types::{InfoMessage, ServerProperties};
    use crate::console::admin::{MemoryAdmin, MemoryAdminConnector};
    use crate::console::cluster::MemoryCluster;
    use crate::console::config::ConsoleConfig;
    use crate::console::error::ErrorResponse;
    use crate::console::server;
    use crate::console::state::testing;
    use crate::tests::create_test_tenant;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use serde_json::json;
    use tower::ServiceExt;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ConsoleConfig {
        let mut config = testing::config();
        config.subnet_base_url = server.uri();
        config
    }

    async fn call(state: &AppState, method: &str, uri: &str, body: Option<serde_json::Value>) -> (StatusCode, bytes::Bytes) {
        let mut builder = http::Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, testing::session_cookie(state, "admin"));
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        let response = server::router(state.clone())
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        (status, axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    #[tokio::test]
    async fn test_login_with_mfa() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "mfa_required": true,
                "mfa_token": "m"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/auth/mfa-login"))
            .and(body_json(json!({"username": "ops", "otp": "123456", "token": "m"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "token_info": {"access_token": "t"}
            })))
            .mount(&server)
            .await;

        let state = testing::state_with(config(&server), MemoryCluster::new(), MemoryAdminConnector::new());

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/subnet/login",
            Some(json!({"username": "ops", "password": "pw"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let first: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(first, json!({"accessToken": "", "mfaToken": "m"}));

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/subnet/login/mfa",
            Some(json!({"username": "ops", "mfa_token": "m", "otp": "123456"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let second: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(second, json!({"accessToken": "t", "mfaToken": ""}));
    }

    #[tokio::test]
    async fn test_empty_credentials() {
        let server = MockServer::start().await;
        let state = testing::state_with(config(&server), MemoryCluster::new(), MemoryAdminConnector::new());

        let (status, body) = call(&state, "POST", "/api/v1/subnet/login", Some(json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.detailed_message, "empty credentials");
    }

    #[tokio::test]
    async fn test_api_key_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/auth/api-key"))
            .and(wiremock::matchers::header("authorization", "Bearer t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"api_key": "key"})))
            .mount(&server)
            .await;
        let state = testing::state_with(config(&server), MemoryCluster::new(), MemoryAdminConnector::new());

        let (status, body) = call(&state, "GET", "/api/v1/subnet/apikey?token=t", None).await;
        assert_eq!(status, StatusCode::OK);
        let key: ApiKey = serde_json::from_slice(&body).unwrap();
        assert_eq!(key.api_key, "key");
    }

    #[tokio::test]
    async fn test_register_then_info() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cluster/register"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api_key": "key",
                "license": "lic"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let admin = MemoryAdmin::new().with_info(InfoMessage {
            deployment_id: "dep".to_string(),
            servers: vec![ServerProperties {
                version: "RELEASE.2024".to_string(),
                pool_number: 1,
                ..Default::default()
            }],
            ..Default::default()
        });
        let cluster = MemoryCluster::new()
            .with_token("admin")
            .with_tenant(create_test_tenant("t1", "ns"));
        let state = testing::state_with(
            config(&server),
            cluster,
            MemoryAdminConnector::new().with_tenant("ns", "t1", admin.clone()),
        );

        let (status, _) = call(&state, "GET", "/api/v1/subnet/apikey/info", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = call(
            &state,
            "POST",
            "/api/v1/subnet/apikey/register",
            Some(json!({"apiKey": "key"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            serde_json::from_slice::<ApiKeyInfo>(&body).unwrap(),
            ApiKeyInfo { registered: true }
        );
        assert!(admin.config("subnet").unwrap().contains("license=lic"));

        let (status, body) = call(&state, "GET", "/api/v1/subnet/apikey/info", None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(serde_json::from_slice::<ApiKeyInfo>(&body).unwrap().registered);
    }
}
