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

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use http::{HeaderValue, header};
use reqwest::cookie::{CookieStore, Jar};
use snafu::{OptionExt, ResultExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as TenantMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::{Connector, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};
use url::Url;

use super::{Error, HandshakeSnafu, HandshakeTimeoutSnafu, TlsSnafu, WebSocketUrlSnafu};
use crate::console::session::SESSION_COOKIE;
use crate::utils::tls;

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(45);

type TenantSocket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Upgrades the browser connection and bridges it to the tenant.
pub(super) async fn bridge(request: Request, destination: Url, token: String) -> Response {
    let (mut parts, _body) = request.into_parts();
    let upgrade = match WebSocketUpgrade::from_request_parts(&mut parts, &()).await {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };

    upgrade.on_upgrade(move |browser| async move {
        if let Err(e) = run(browser, destination, token).await {
            warn!("proxy: {}", e);
        }
    })
}

async fn run(browser: WebSocket, destination: Url, token: String) -> Result<(), Error> {
    let tenant = dial(destination, &token).await?;

    let (mut tenant_tx, mut tenant_rx) = tenant.split();
    let (mut browser_tx, mut browser_rx) = browser.split();

    tokio::select! {
        _ = tenant_to_browser(&mut tenant_rx, &mut browser_tx) => debug!("proxy: tenant stream ended"),
        _ = browser_to_tenant(&mut browser_rx, &mut tenant_tx) => debug!("proxy: browser stream ended"),
    }

    if let Err(e) = browser_tx.close().await {
        debug!("proxy: closing browser socket: {}", e);
    }
    if let Err(e) = tenant_tx.close().await {
        debug!("proxy: closing tenant socket: {}", e);
    }
    Ok(())
}

async fn dial(destination: Url, token: &str) -> Result<TenantSocket, Error> {
    connect(destination, token, HANDSHAKE_TIMEOUT).await
}

/// The tenant session travels as a cookie scoped to the tenant service.
fn session_cookie(destination: &Url, token: &str) -> Option<HeaderValue> {
    let jar = Jar::default();
    jar.add_cookie_str(&format!("{}={}; Path=/", SESSION_COOKIE, token), destination);
    jar.cookies(destination)
}

async fn connect(
    mut destination: Url,
    token: &str,
    timeout: Duration,
) -> Result<TenantSocket, Error> {
    let cookie = session_cookie(&destination, token).context(WebSocketUrlSnafu {
        url: destination.to_string(),
    })?;

    let scheme = if destination.scheme() == "https" { "wss" } else { "ws" };
    destination.set_scheme(scheme).ok().context(WebSocketUrlSnafu {
        url: destination.to_string(),
    })?;

    let mut request = destination.as_str().into_client_request().context(HandshakeSnafu)?;
    request.headers_mut().insert(header::COOKIE, cookie);

    let connector = Connector::Rustls(Arc::new(tls::insecure_client_config().context(TlsSnafu)?));
    let (socket, _) = tokio::time::timeout(
        timeout,
        tokio_tungstenite::connect_async_tls_with_config(request, None, false, Some(connector)),
    )
    .await
    .ok()
    .context(HandshakeTimeoutSnafu)?
    .context(HandshakeSnafu)?;
    Ok(socket)
}

async fn tenant_to_browser(
    tenant: &mut SplitStream<TenantSocket>,
    browser: &mut SplitSink<WebSocket, Message>,
) {
    while let Some(Ok(message)) = tenant.next().await {
        let message = match message {
            TenantMessage::Text(text) => Message::Text(text.as_str().to_owned().into()),
            TenantMessage::Binary(data) => Message::Binary(data),
            TenantMessage::Close(_) => return,
            _ => continue,
        };
        if browser.send(message).await.is_err() {
            return;
        }
    }
}

async fn browser_to_tenant(
    browser: &mut SplitStream<WebSocket>,
    tenant: &mut SplitSink<TenantSocket, TenantMessage>,
) {
    while let Some(Ok(message)) = browser.next().await {
        let message = match message {
            Message::Text(text) => TenantMessage::Text(text.as_str().to_owned().into()),
            Message::Binary(data) => TenantMessage::Binary(data),
            Message::Close(_) => return,
            _ => continue,
        };
        if tenant.send(message).await.is_err() {
            return;
        }
    }
}
