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
//! Thin bindings from routes to the console's domain functions.

use snafu::ResultExt;

use crate::console::cluster::ClusterClients;
use crate::console::error::{ClusterSnafu, Error, ErrorKind, Result};
use crate::console::middleware::auth::Principal;
use crate::console::state::AppState;

pub mod auth;
pub mod cluster;
pub mod marketplace;
pub mod subnet;
pub mod tenants;

/// Cluster clients acting with the principal's own credential.
async fn cluster_clients(state: &AppState, principal: &Principal) -> Result<ClusterClients> {
    state
        .clusters
        .for_token(&principal.0.sts_session_token)
        .await
        .context(ClusterSnafu)
}

/// Pooled HTTP client for the host of `url`.
fn http_client(state: &AppState, url: &str) -> Result<reqwest::Client> {
    let parsed = url::Url::parse(url).map_err(|e| Error::with_detail(ErrorKind::Default, format!("{}: {}", url, e)))?;
    state
        .context
        .http_client(parsed.host_str().unwrap_or_default())
        .map_err(|e| Error::with_detail(ErrorKind::Default, e))
}
