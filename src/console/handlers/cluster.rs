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
use axum::extract::Path;

use crate::console::error::{Error, ErrorKind, Result};
use crate::console::middleware::auth::Principal;
use crate::utils::parity;

/// Erasure-code parities available to a pool of the given shape.
pub async fn get_parity(
    _principal: Principal,
    Path((nodes, disks_per_node)): Path<(i64, i64)>,
) -> Result<Json<Vec<String>>> {
    parity::parity_values(nodes, disks_per_node)
        .map(Json)
        .map_err(|e| Error::with_detail(ErrorKind::InvalidErasureCoding, e))
}

#[cfg(test)]
mod tests {
    use crate::console::cluster::MemoryCluster;
    use crate::console::error::ErrorResponse;
    use crate::console::server;
    use crate::console::state::testing;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    async fn parity(uri: &str) -> (StatusCode, bytes::Bytes) {
        let state = testing::state(MemoryCluster::new());
        let request = http::Request::builder()
            .uri(uri)
            .header(header::COOKIE, testing::session_cookie(&state, "any"))
            .body(Body::empty())
            .unwrap();
        let response = server::router(state).oneshot(request).await.unwrap();
        let status = response.status();
        (status, axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    #[tokio::test]
    async fn test_parity_route() {
        let (status, body) = parity("/api/v1/get-parity/4/10").await;
        assert_eq!(status, StatusCode::OK);
        let values: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(values, ["EC:4", "EC:3", "EC:2"]);

        let (status, body) = parity("/api/v1/get-parity/2/50").await;
        assert_eq!(status, StatusCode::OK);
        let values: Vec<String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(values, ["EC:5", "EC:4", "EC:3", "EC:2"]);
    }

    #[tokio::test]
    async fn test_parity_rejects_small_pools() {
        let (status, body) = parity("/api/v1/get-parity/1/1").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "invalid Erasure Coding Value");
    }

    #[tokio::test]
    async fn test_parity_rejects_overflowing_pools() {
        let (status, body) = parity("/api/v1/get-parity/9223372036854775807/2").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "invalid Erasure Coding Value");
    }
}
