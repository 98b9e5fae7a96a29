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
use axum::middleware::Next;
use axum::response::Response;
use http::{HeaderMap, header};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::info;

use super::request_context::RequestContext;

const REDACTED: &str = "*REDACTED*";

fn is_audited(path: &str) -> bool {
    path.starts_with("/ws") || path.starts_with("/api")
}

/// Header map rendered for the audit log, with credentials masked.
fn redact(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            let value = if name == header::AUTHORIZATION || name == header::COOKIE || name == header::SET_COOKIE {
                REDACTED.to_string()
            } else {
                String::from_utf8_lossy(value.as_bytes()).into_owned()
            };
            (name.to_string(), value)
        })
        .collect()
}

/// Emits one event on the `audit` target once the response is ready.
pub async fn audit_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    if !is_audited(&path) {
        return next.run(request).await;
    }

    let started = Instant::now();
    let method = request.method().clone();
    let request_headers = redact(request.headers());
    let context = request
        .extensions()
        .get::<RequestContext>()
        .cloned()
        .unwrap_or_default();

    let response = next.run(request).await;

    info!(
        target: "audit",
        request_id = %context.request_id,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        duration_ms = started.elapsed().as_millis() as u64,
        remote_addr = %context.remote_addr,
        user_agent = %context.user_agent,
        request_headers = ?request_headers,
        response_headers = ?redact(response.headers()),
        "request served"
    );
    response
}
