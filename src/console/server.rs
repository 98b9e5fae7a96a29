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
use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use snafu::{ResultExt, Snafu};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio_rustls::TlsAcceptor;
use tower::ServiceExt;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::{debug, info, warn};

use crate::console::admin::HttpAdminConnector;
use crate::console::cluster::KubeClusterFactory;
use crate::console::config::ConsoleConfig;
use crate::console::middleware::{
    ConnectionInfo, assets::assets_middleware, audit::audit_middleware, auth::auth_middleware,
    proxy_middleware, request_context::request_context_middleware,
    secure::{SecurePolicy, secure_middleware},
};
use crate::console::{routes, state::AppState};
use crate::context::Context;
use crate::utils::tls::{self, CertManager};

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("unable to load server certificates: {}", source))]
    Certificates { source: tls::Error },

    #[snafu(display("unable to bind {}: {}", addr, source))]
    Bind { addr: String, source: std::io::Error },
}

/// Starts the console: the plain HTTP listener always, and the TLS
/// listener when public certificates were found.
pub async fn run(config: ConsoleConfig) -> Result<(), Error> {
    let certs = load_certificates(&config)?;
    let context = Arc::new(Context::new(config.subpath.clone(), certs, &config.ca_sources()));
    let admins = Arc::new(HttpAdminConnector::new(context.clone(), config.cluster_domain.clone()));
    let state = AppState::new(config, context.clone(), Arc::new(KubeClusterFactory), admins);
    let app = router(state.clone());

    let host = if state.config.host.is_empty() {
        "0.0.0.0"
    } else {
        state.config.host.as_str()
    };
    let http_addr = format!("{}:{}", host, state.config.port);
    let http = TcpListener::bind(&http_addr).await.context(BindSnafu { addr: &http_addr })?;
    info!("Console server listening on http://{}{}", http_addr, context.subpath());

    if !context.has_public_certs() {
        serve_plain(http, app).await;
        return Ok(());
    }

    let server_config = context.certs().server_config().context(CertificatesSnafu)?;
    let tls_addr = format!("{}:{}", host, state.config.tls_port);
    let https = TcpListener::bind(&tls_addr).await.context(BindSnafu { addr: &tls_addr })?;
    info!("Console server listening on https://{}{}", tls_addr, context.subpath());

    tokio::join!(
        serve_plain(http, app.clone()),
        serve_tls(https, TlsAcceptor::from(Arc::new(server_config)), app),
    );
    Ok(())
}

/// Certificates from the certificate directory, with an explicitly
/// configured pair taking the default slot.
fn load_certificates(config: &ConsoleConfig) -> Result<CertManager, Error> {
    let certs = CertManager::load(&config.certs_dir).context(CertificatesSnafu)?;
    match (&config.tls_certificate, &config.tls_key) {
        (Some(cert), Some(key)) => certs.with_default_pair(cert, key).context(CertificatesSnafu),
        _ => Ok(certs),
    }
}

/// The console application with the full middleware pipeline. Layers run
/// outermost first: security headers, tracing, session decoding, request
/// context, static assets, tenant proxy, audit, compression.
pub fn router(state: AppState) -> Router {
    let redirect_port = (state.config.tls_redirect && state.context.has_public_certs())
        .then_some(state.config.tls_port);
    let policy = Arc::new(SecurePolicy::new(state.config.secure.clone(), redirect_port));

    // routed behind the pipeline so the assets layer can rewrite the subpath
    let api = Router::new()
        .route("/healthz", get(health_check))
        .route("/readyz", get(ready_check))
        .nest("/api/v1", routes::api_routes())
        .with_state(state.clone());

    Router::new()
        .fallback_service(api)
        .layer(CompressionLayer::new())
        .layer(from_fn(audit_middleware))
        .layer(from_fn_with_state(state.clone(), proxy_middleware))
        .layer(from_fn_with_state(state.clone(), assets_middleware))
        .layer(from_fn(request_context_middleware))
        .layer(from_fn_with_state(state, auth_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(policy, secure_middleware))
}

async fn serve_plain(listener: TcpListener, app: Router) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!("failed to accept connection: {}", e);
                continue;
            }
        };
        let app = app.clone();
        tokio::spawn(async move {
            serve_connection(stream, app, ConnectionInfo { remote_addr, tls: false }).await;
        });
    }
}

async fn serve_tls(listener: TcpListener, acceptor: TlsAcceptor, app: Router) {
    loop {
        let (stream, remote_addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                debug!("failed to accept connection: {}", e);
                continue;
            }
        };
        let acceptor = acceptor.clone();
        let app = app.clone();
        tokio::spawn(async move {
            match acceptor.accept(stream).await {
                Ok(stream) => serve_connection(stream, app, ConnectionInfo { remote_addr, tls: true }).await,
                Err(e) => debug!("tls handshake with {} failed: {}", remote_addr, e),
            }
        });
    }
}

/// Serves one connection, upgrades included, tagging every request with
/// the facts of the connection.
async fn serve_connection<IO>(stream: IO, app: Router, connection: ConnectionInfo)
where
    IO: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |mut request: Request<Incoming>| {
        request.extensions_mut().insert(connection);
        app.clone().oneshot(request)
    });

    if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
        .serve_connection_with_upgrades(TokioIo::new(stream), service)
        .await
    {
        warn!("failed to serve connection from {}: {}", connection.remote_addr, e);
    }
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn ready_check() -> impl IntoResponse {
    (StatusCode::OK, "Ready")
}
