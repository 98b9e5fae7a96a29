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

//! Layers every request passes through before reaching a handler.
//!
//! Outermost first: security headers, session decoding, request context,
//! static assets, tenant proxy interception, audit and compression.
//! [`crate::console::server::router`] stacks them in that order.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::net::SocketAddr;

use crate::console::proxy;
use crate::console::state::AppState;

pub mod assets;
pub mod audit;
pub mod auth;
pub mod request_context;
pub mod secure;

/// Per-connection facts recorded by the listener.
#[derive(Clone, Copy, Debug)]
pub struct ConnectionInfo {
    pub remote_addr: SocketAddr,
    pub tls: bool,
}

/// Diverts `/api/proxy/...` and `/api/hop/...` to the tenant proxy.
pub async fn proxy_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if proxy::is_proxy_path(request.uri().path()) {
        return proxy::serve(&state, request).await;
    }
    next.run(request).await
}
