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
use http::header;

use super::ConnectionInfo;

/// Identifies a request in logs and audit events.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    pub request_id: String,
    pub user_agent: String,
    pub host: String,
    pub remote_addr: String,
}

impl RequestContext {
    fn from_request(request: &Request) -> Self {
        let headers = request.headers();
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string()
        };

        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            user_agent: text(header::USER_AGENT),
            host: text(header::HOST),
            remote_addr: request
                .extensions()
                .get::<ConnectionInfo>()
                .map(|info| info.remote_addr.to_string())
                .unwrap_or_default(),
        }
    }
}

pub async fn request_context_middleware(mut request: Request, next: Next) -> Response {
    let context = RequestContext::from_request(&request);
    request.extensions_mut().insert(context);
    next.run(request).await
}
