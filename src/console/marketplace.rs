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

//! Marketplace onboarding: the contact email is sent once to the
//! marketplace service and remembered in a config map.

use jsonwebtoken::{EncodingKey, Header};
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use serde_json::json;
use snafu::{ResultExt, Snafu, ensure};
use std::time::Duration;
use tracing::info;

use crate::console::cluster::{self, CoreClient};
use crate::console::config::ConsoleConfig;
use crate::console::error::ErrorKind;

pub const MP_NAMESPACE: &str = "default";
pub const IS_EMAIL_SET: &str = "isEmailSet";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Email was not sent in request"))]
    EmailNotSet,

    #[snafu(display("unable to sign marketplace token: {}", source))]
    Token { source: jsonwebtoken::errors::Error },

    #[snafu(display("request to {} failed: {}", url, source))]
    Request { url: String, source: reqwest::Error },

    #[snafu(display("request to {} failed with status code {} and error {}", url, status, body))]
    Rejected { url: String, status: u16, body: String },

    #[snafu(display("{}", source))]
    Cluster { source: cluster::Error },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmailNotSet => ErrorKind::BadRequest,
            Error::Cluster { source } => source.kind(),
            _ => ErrorKind::Default,
        }
    }
}

pub struct Marketplace {
    client: reqwest::Client,
    host: String,
    eu_host: String,
    secret: String,
    config_map: String,
}

impl Marketplace {
    pub fn new(client: reqwest::Client, config: &ConsoleConfig) -> Self {
        Self {
            client,
            host: config.mp_host.trim_end_matches('/').to_string(),
            eu_host: config.mp_eu_host.trim_end_matches('/').to_string(),
            secret: config.mp_secret.clone(),
            config_map: config.mp_config_map.clone(),
        }
    }

    pub async fn is_email_set(&self, core: &dyn CoreClient) -> Result<bool, Error> {
        let config_map = core
            .get_config_map(MP_NAMESPACE, &self.config_map)
            .await
            .context(ClusterSnafu)?;
        Ok(config_map
            .data
            .as_ref()
            .and_then(|data| data.get(IS_EMAIL_SET))
            .is_some_and(|v| v == "true"))
    }

    /// Posts `email` to the marketplace, then records it in the config map.
    pub async fn register_email(&self, core: &dyn CoreClient, email: &str, is_in_eu: bool) -> Result<(), Error> {
        ensure!(!email.is_empty(), EmailNotSetSnafu);

        let host = if is_in_eu { &self.eu_host } else { &self.host };
        let url = format!("{}/mp-email", host);
        let token = jsonwebtoken::encode(
            &Header::default(),
            &serde_json::Map::new(),
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .context(TokenSnafu)?;

        let response = self
            .client
            .post(&url)
            .timeout(REQUEST_TIMEOUT)
            .header(http::header::COOKIE, format!("jwtToken={}", token))
            .json(&json!({ "email": email }))
            .send()
            .await
            .context(RequestSnafu { url: &url })?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return RejectedSnafu {
                url,
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let config_map = corev1::ConfigMap {
            metadata: metav1::ObjectMeta {
                name: Some(self.config_map.clone()),
                namespace: Some(MP_NAMESPACE.to_string()),
                ..Default::default()
            },
            data: Some([(IS_EMAIL_SET.to_string(), "true".to_string())].into()),
            ..Default::default()
        };
        core.create_config_map(MP_NAMESPACE, config_map)
            .await
            .context(ClusterSnafu)?;
        info!("marketplace email registered");
        Ok(())
    }
}
