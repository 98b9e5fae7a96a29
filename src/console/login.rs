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

//! Turns a bearer credential into a console session.

use rand::Rng;
use snafu::ResultExt;
use tracing::{debug, warn};

use crate::console::cluster::ClusterFactory;
use crate::console::config::ConsoleConfig;
use crate::console::error::{Error, ErrorKind, SessionSnafu};
use crate::console::session::{Claims, SessionCodec};

/// Random five digit account identifier. It keeps the tenant session
/// cookies of different logins apart.
pub fn random_account_id() -> String {
    rand::thread_rng().gen_range(10000..100000).to_string()
}

/// Verifies `token` against the cluster and seals it into a session.
pub async fn login_with_token(
    clusters: &dyn ClusterFactory,
    codec: &SessionCodec,
    token: &str,
) -> Result<String, Error> {
    let token = token.trim();
    if token.is_empty() {
        return Err(Error::new(ErrorKind::InvalidLogin));
    }

    let clients = clusters.for_token(token).await.map_err(|e| {
        warn!("unable to build cluster clients for login: {}", e);
        Error::with_detail(ErrorKind::InvalidLogin, e)
    })?;
    clients.core.authenticate().await.map_err(|e| {
        debug!("login rejected by the cluster: {}", e);
        Error::with_detail(ErrorKind::InvalidLogin, e)
    })?;

    let claims = Claims::for_bearer(token, random_account_id());
    codec.encode(&claims).context(SessionSnafu)
}

/// The operator's own service account token: the override when set,
/// otherwise the in-pod token file.
pub async fn service_account_token(config: &ConsoleConfig) -> Result<String, Error> {
    if let Some(token) = &config.sa_token_override {
        return Ok(token.clone());
    }
    tokio::fs::read_to_string(&config.sa_token_file)
        .await
        .map(|token| token.trim().to_string())
        .map_err(|e| {
            Error::with_detail(
                ErrorKind::Default,
                format!("unable to read {}: {}", config.sa_token_file.display(), e),
            )
        })
}
