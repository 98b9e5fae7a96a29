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

use std::sync::Arc;

use crate::console::admin::AdminConnector;
use crate::console::cluster::ClusterFactory;
use crate::console::config::ConsoleConfig;
use crate::console::session::SessionCodec;
use crate::context::Context;

/// State shared by every handler and middleware layer.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ConsoleConfig>,
    pub context: Arc<Context>,
    /// Session cookie codec, keyed once at startup.
    pub codec: Arc<SessionCodec>,
    pub clusters: Arc<dyn ClusterFactory>,
    pub admins: Arc<dyn AdminConnector>,
}

impl AppState {
    pub fn new(
        config: ConsoleConfig,
        context: Arc<Context>,
        clusters: Arc<dyn ClusterFactory>,
        admins: Arc<dyn AdminConnector>,
    ) -> Self {
        let codec = SessionCodec::new(&config.pbkdf_passphrase, &config.pbkdf_salt);
        Self {
            config: Arc::new(config),
            context,
            codec: Arc::new(codec),
            clusters,
            admins,
        }
    }

    /// Whether cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.context.has_public_certs()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::console::admin::MemoryAdminConnector;
    use crate::console::cluster::MemoryCluster;
    use crate::console::session::Claims;
    use crate::utils::tls::CertManager;

    pub fn config() -> ConsoleConfig {
        ConsoleConfig::from_lookup(|name| match name {
            "CONSOLE_PBKDF_PASSPHRASE" => Some("passphrase".to_string()),
            "CONSOLE_PBKDF_SALT" => Some("salt".to_string()),
            _ => None,
        })
    }

    pub fn state_with(config: ConsoleConfig, cluster: MemoryCluster, admins: MemoryAdminConnector) -> AppState {
        let context = Arc::new(Context::new(config.subpath.clone(), CertManager::default(), &[]));
        AppState::new(config, context, Arc::new(cluster), Arc::new(admins))
    }

    pub fn state(cluster: MemoryCluster) -> AppState {
        state_with(config(), cluster, MemoryAdminConnector::new())
    }

    /// `Cookie` header value of a session for `token`.
    pub fn session_cookie(state: &AppState, token: &str) -> String {
        let claims = Claims::for_bearer(token, "12345");
        let encoded = state.codec.encode(&claims).unwrap();
        format!("token={}", encoded)
    }
}
