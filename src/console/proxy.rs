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

//! Reverse proxy from the operator console into each tenant's own console.
//!
//! Requests under `/api/{proxy|hop}/{namespace}/{tenant}/{api|ws}/...` are
//! authorized with the console session, logged into the tenant with the
//! tenant's root credentials and then forwarded, either as a single
//! request/response or as a WebSocket bridge.

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use http::{HeaderValue, StatusCode, header};
use serde_json::json;
use snafu::{ResultExt, Snafu};
use tracing::{debug, warn};
use url::Url;

use crate::console::admin::{self, Credentials};
use crate::console::cluster::CoreClient;
use crate::console::session::{self, SESSION_COOKIE};
use crate::console::state::AppState;
use crate::context::{self, Context};
use crate::types::v2::tenant::Tenant;
use crate::utils::tls;

mod http_forward;
mod ws;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unable to resolve tenant credentials: {}", source))]
    Credentials { source: admin::Error },

    #[snafu(display("unable to build tenant client: {}", source))]
    Client { source: context::Error },

    #[snafu(display("invalid tenant url '{}': {}", url, source))]
    TenantUrl { url: String, source: url::ParseError },

    #[snafu(display("tenant login failed: {}", source))]
    Login { source: reqwest::Error },

    #[snafu(display("tenant login returned status {}", status))]
    LoginStatus { status: u16 },

    #[snafu(display("tenant request failed: {}", source))]
    Forward { source: reqwest::Error },

    #[snafu(display("websocket handshake with tenant failed: {}", source))]
    Handshake {
        source: tokio_tungstenite::tungstenite::Error,
    },

    #[snafu(display("websocket handshake with tenant timed out"))]
    HandshakeTimeout,

    #[snafu(display("cannot open a websocket to '{}'", url))]
    WebSocketUrl { url: String },

    #[snafu(display("{}", source))]
    Tls { source: tls::Error },
}

/// How the tenant console is embedded in the operator console.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Mode {
    /// Embedded in a frame, the tenant renders without its menu.
    Proxy,
    /// The browser navigates to the tenant console.
    Hop,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Api,
    Ws,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyTarget {
    pub mode: Mode,
    pub namespace: String,
    pub tenant: String,
    pub channel: Channel,
}

impl ProxyTarget {
    /// Parses `/api/{mode}/{namespace}/{tenant}/{channel}/...`. Anything
    /// after the tenant that is not `ws` is forwarded as a plain request.
    pub fn parse(path: &str) -> Option<Self> {
        let mut segments = path.trim_start_matches('/').split('/');
        if segments.next()? != "api" {
            return None;
        }
        let mode = segments.next()?.parse().ok()?;
        let namespace = segments.next().filter(|s| !s.is_empty())?.to_string();
        let tenant = segments.next().filter(|s| !s.is_empty())?.to_string();
        let channel = match segments.next() {
            Some("ws") => Channel::Ws,
            _ => Channel::Api,
        };

        Some(Self {
            mode,
            namespace,
            tenant,
            channel,
        })
    }

    /// Prefix stripped from the browser path before it reaches the tenant.
    pub fn tenant_base(&self) -> String {
        format!("/api/{}/{}/{}", self.mode, self.namespace, self.tenant)
    }
}

pub fn is_proxy_path(path: &str) -> bool {
    path.starts_with("/api/proxy") || path.starts_with("/api/hop")
}

/// Name of the browser cookie holding the tenant session of one principal
/// for one tenant.
pub fn tenant_cookie_name(mode: Mode, account_access_key: &str, namespace: &str, tenant: &str) -> String {
    let digest = ring::digest::digest(
        &ring::digest::SHA1_FOR_LEGACY_USE_ONLY,
        format!("{}/{}", namespace, tenant).as_bytes(),
    );
    let hash: String = digest.as_ref().iter().map(|b| format!("{:02x}", b)).collect();
    format!("token-{}-{}-{}", mode, account_access_key, hash)
}

/// The tenant's own `token` cookie, with the attributes carried over to the
/// browser.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TenantCookie {
    pub value: String,
    pub path: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub http_only: bool,
}

impl From<reqwest::cookie::Cookie<'_>> for TenantCookie {
    fn from(cookie: reqwest::cookie::Cookie<'_>) -> Self {
        Self {
            value: cookie.value().to_string(),
            path: cookie.path().map(str::to_string),
            expires: cookie.expires().map(DateTime::<Utc>::from),
            http_only: cookie.http_only(),
        }
    }
}

impl TenantCookie {
    pub fn to_set_cookie(&self, name: &str) -> String {
        let mut cookie = format!("{}={}", name, self.value);
        if let Some(path) = &self.path {
            cookie.push_str(&format!("; Path={}", path));
        }
        if let Some(expires) = &self.expires {
            cookie.push_str(&format!("; Expires={}", expires.format("%a, %d %b %Y %H:%M:%S GMT")));
        }
        if self.http_only {
            cookie.push_str("; HttpOnly");
        }
        cookie
    }
}

/// Logs into the tenant console. `None` means the tenant answered without
/// issuing a session cookie.
pub async fn login_to_tenant(
    client: &reqwest::Client,
    tenant_url: &Url,
    credentials: &Credentials,
    mode: Mode,
) -> Result<Option<TenantCookie>, Error> {
    let mut body = json!({
        "accessKey": credentials.access_key,
        "secretKey": credentials.secret_key,
    });
    if mode == Mode::Proxy {
        body["features"] = json!({ "hide_menu": true });
    }

    let mut login_url = tenant_url.clone();
    login_url.set_path("/api/v1/login");
    let response = client
        .post(login_url)
        .json(&body)
        .send()
        .await
        .context(LoginSnafu)?;

    let status = response.status();
    if !status.is_success() {
        return LoginStatusSnafu {
            status: status.as_u16(),
        }
        .fail();
    }

    Ok(response
        .cookies()
        .find(|cookie| cookie.name() == SESSION_COOKIE)
        .map(TenantCookie::from))
}

/// Entry point of the proxy layer.
pub async fn serve(state: &AppState, request: Request) -> Response {
    let Some(target) = ProxyTarget::parse(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    let claims = match session::read_cookie(request.headers(), SESSION_COOKIE)
        .map(|token| state.codec.decode(&token))
    {
        Some(Ok(claims)) => claims,
        _ => return StatusCode::UNAUTHORIZED.into_response(),
    };

    let clients = match state.clusters.for_token(&claims.sts_session_token).await {
        Ok(clients) => clients,
        Err(e) => {
            warn!("proxy: unable to build cluster clients: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let tenant = match clients
        .operator
        .get_tenant(&target.namespace, &target.tenant)
        .await
    {
        Ok(tenant) => tenant,
        Err(e) if e.is_not_found() => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            warn!("proxy: unable to load tenant {}/{}: {}", target.namespace, target.tenant, e);
            return StatusCode::BAD_GATEWAY.into_response();
        }
    };

    let tenant_url = match tenant
        .console_service_url(&state.config.cluster_domain)
        .map_err(|e| e.to_string())
        .and_then(|url| Url::parse(&url).map_err(|e| e.to_string()))
    {
        Ok(url) => url,
        Err(e) => {
            warn!("proxy: invalid tenant service url: {}", e);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    proxy_to_tenant(
        &state.context,
        clients.core.as_ref(),
        &tenant,
        &target,
        tenant_url,
        &claims.account_access_key,
        request,
    )
    .await
}

async fn proxy_to_tenant(
    context: &Context,
    core: &dyn CoreClient,
    tenant: &Tenant,
    target: &ProxyTarget,
    tenant_url: Url,
    account_access_key: &str,
    request: Request,
) -> Response {
    let cookie_name = tenant_cookie_name(target.mode, account_access_key, &target.namespace, &target.tenant);

    let (token, set_cookie) = match session::read_cookie(request.headers(), &cookie_name) {
        Some(token) => (token, None),
        None => match mint_tenant_session(context, core, tenant, &tenant_url, target.mode).await {
            Ok(Some(cookie)) => {
                debug!("proxy: logged into tenant {}/{}", target.namespace, target.tenant);
                let set_cookie = cookie.to_set_cookie(&cookie_name);
                (cookie.value, Some(set_cookie))
            }
            Ok(None) => {
                warn!("proxy: tenant {}/{} issued no session cookie", target.namespace, target.tenant);
                return StatusCode::FORBIDDEN.into_response();
            }
            Err(e) => {
                warn!("proxy: {}", e);
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        },
    };

    let mut destination = tenant_url;
    let base = target.tenant_base();
    let path = request.uri().path();
    destination.set_path(path.strip_prefix(base.as_str()).unwrap_or(path));

    let mut response = match target.channel {
        Channel::Api => match context.tenant_http_client(false) {
            Ok(client) => http_forward::forward(&client, request, destination, &base, &token).await,
            Err(e) => {
                warn!("proxy: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        },
        Channel::Ws => ws::bridge(request, destination, token).await,
    };

    if let Some(set_cookie) = set_cookie.and_then(|c| HeaderValue::from_str(&c).ok()) {
        response.headers_mut().append(header::SET_COOKIE, set_cookie);
    }
    response
}

async fn mint_tenant_session(
    context: &Context,
    core: &dyn CoreClient,
    tenant: &Tenant,
    tenant_url: &Url,
    mode: Mode,
) -> Result<Option<TenantCookie>, Error> {
    let credentials = admin::credentials::tenant_credentials(core, tenant)
        .await
        .context(CredentialsSnafu)?;
    let client = context.tenant_http_client(true).context(ClientSnafu)?;
    login_to_tenant(&client, tenant_url, &credentials, mode).await
}
