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
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{AppendHeaders, IntoResponse};
use axum::{Extension, Json};
use snafu::ResultExt;

use crate::console::error::{Error, ErrorKind, IdpSnafu, Result};
use crate::console::idp::{self, IdentityProvider, LoginUrlParams};
use crate::console::login;
use crate::console::middleware::ConnectionInfo;
use crate::console::middleware::auth::Principal;
use crate::console::models::auth::*;
use crate::console::session::{self, IDP_REFRESH_COOKIE, SESSION_COOKIE};
use crate::console::state::AppState;

use super::http_client;

const SSO_DISPLAY_NAME: &str = "Login with SSO";
const MP_MODE_FEATURE: &str = "mp-mode";

/// Login strategy, with the identity provider's authorization URL when one
/// is configured.
pub async fn login_detail(
    State(state): State<AppState>,
    headers: HeaderMap,
    connection: Option<Extension<ConnectionInfo>>,
) -> Result<Json<LoginDetails>> {
    let is_k8s = state.config.in_cluster;
    if !state.config.idp_enabled() {
        return Ok(Json(LoginDetails {
            login_strategy: LoginStrategy::ServiceAccount,
            redirect_rules: Vec::new(),
            is_k8s,
        }));
    }

    let provider = identity_provider(&state, &headers, connection.map(|Extension(c)| c)).await?;
    let redirect = provider.login_url().context(IdpSnafu)?;

    Ok(Json(LoginDetails {
        login_strategy: LoginStrategy::RedirectServiceAccount,
        redirect_rules: vec![RedirectRule {
            redirect,
            display_name: SSO_DISPLAY_NAME.to_string(),
        }],
        is_k8s,
    }))
}

/// Service account login: the bearer is verified against the cluster and
/// sealed into the session cookie.
pub async fn login(State(state): State<AppState>, Json(req): Json<LoginRequest>) -> Result<impl IntoResponse> {
    let token = login::login_with_token(state.clusters.as_ref(), &state.codec, &req.jwt).await?;
    tracing::info!("service account login succeeded");

    let cookie = session::session_cookie(&token, state.config.session_duration, state.secure_cookies());
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, cookie)]))
}

/// Identity provider callback. Once the code is exchanged the console logs
/// in with its own service account.
pub async fn login_oauth2(
    State(state): State<AppState>,
    headers: HeaderMap,
    connection: Option<Extension<ConnectionInfo>>,
    Json(req): Json<Oauth2Request>,
) -> Result<impl IntoResponse> {
    if !state.config.idp_enabled() {
        return Err(Error::with_detail(ErrorKind::Default, "identity provider is not configured"));
    }

    let params = LoginUrlParams::decode(&req.state).context(IdpSnafu)?;
    let provider = identity_provider(&state, &headers, connection.map(|Extension(c)| c)).await?;
    let idp_token = provider.exchange(&req.code, &params.state).await.context(IdpSnafu)?;

    let sa_token = login::service_account_token(&state.config).await?;
    let token = login::login_with_token(state.clusters.as_ref(), &state.codec, &sa_token).await?;
    tracing::info!("identity provider login succeeded");

    let secure = state.secure_cookies();
    let mut cookies = vec![(
        header::SET_COOKIE,
        session::session_cookie(&token, state.config.session_duration, secure),
    )];
    if let Some(refresh) = idp_token.refresh_token.filter(|t| !t.is_empty()) {
        cookies.push((header::SET_COOKIE, session::idp_refresh_cookie(&refresh, secure)));
    }

    Ok((StatusCode::NO_CONTENT, AppendHeaders(cookies)))
}

pub async fn logout(State(state): State<AppState>) -> impl IntoResponse {
    let secure = state.secure_cookies();
    (
        StatusCode::OK,
        AppendHeaders([
            (header::SET_COOKIE, session::expired_cookie(SESSION_COOKIE, secure)),
            (header::SET_COOKIE, session::expired_cookie(IDP_REFRESH_COOKIE, secure)),
        ]),
    )
}

pub async fn session(State(state): State<AppState>, _principal: Principal) -> Json<SessionResponse> {
    let mut features = Vec::new();
    if state.config.marketplace.is_some() {
        features.push(MP_MODE_FEATURE.to_string());
    }

    Json(SessionResponse {
        status: "ok".to_string(),
        operator: true,
        features,
    })
}

async fn identity_provider(
    state: &AppState,
    headers: &HeaderMap,
    connection: Option<ConnectionInfo>,
) -> Result<IdentityProvider> {
    let config = state
        .config
        .idp
        .as_ref()
        .ok_or_else(|| Error::with_detail(ErrorKind::Default, "identity provider is not configured"))?;

    let text = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let host = text(header::HOST.as_str()).unwrap_or_default();
    let redirect_url = idp::callback_url(
        config,
        host,
        text("x-forwarded-proto"),
        connection.is_some_and(|c| c.tls),
    );

    let client = http_client(state, &config.url)?;
    IdentityProvider::discover(client, config, redirect_url)
        .await
        .context(IdpSnafu)
}
