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

use futures::StreamExt;
use reqwest::{RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::time::Duration;
use tracing::debug;

use super::{
    ClusterRegistrationInfo, DecodeSnafu, Error, LicenseTokenConfig, LoginResponse,
    TransportSnafu,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);
const BODY_LIMIT: usize = 1 << 20;

#[derive(Deserialize, Default)]
#[serde(default)]
struct TokenInfo {
    access_token: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginReply {
    mfa_required: bool,
    mfa_token: String,
    token_info: TokenInfo,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct KeyReply {
    api_key: String,
    license: String,
}

#[derive(Serialize)]
struct MfaRequest<'a> {
    username: &'a str,
    otp: &'a str,
    token: &'a str,
}

#[derive(Serialize)]
struct RegistrationRequest {
    token: String,
}

/// Client of the remote licensing service.
#[derive(Clone)]
pub struct SubnetClient {
    client: reqwest::Client,
    base_url: String,
}

impl SubnetClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Password login. When the account requires a second factor only the
    /// MFA token is returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, Error> {
        if username.is_empty() || password.is_empty() {
            return Err(Error::EmptyCredentials);
        }

        let body = serde_json::json!({"username": username, "password": password});
        let reply: LoginReply = self
            .send(self.client.post(self.url("/api/auth/login")).json(&body))
            .await?;

        if reply.mfa_required {
            if reply.mfa_token.is_empty() {
                return Err(Error::MissingMfaToken);
            }
            return Ok(LoginResponse {
                access_token: String::new(),
                mfa_token: reply.mfa_token,
            });
        }

        match reply.token_info.access_token {
            Some(access_token) => Ok(LoginResponse {
                access_token,
                mfa_token: String::new(),
            }),
            None => Err(Error::MissingAccessToken),
        }
    }

    pub async fn login_mfa(
        &self,
        username: &str,
        mfa_token: &str,
        otp: &str,
    ) -> Result<LoginResponse, Error> {
        let request = MfaRequest {
            username,
            otp,
            token: mfa_token,
        };
        let reply: LoginReply = self
            .send(self.client.post(self.url("/api/auth/mfa-login")).json(&request))
            .await?;

        reply
            .token_info
            .access_token
            .map(|access_token| LoginResponse {
                access_token,
                mfa_token: String::new(),
            })
            .ok_or(Error::MissingAccessToken)
    }

    pub async fn api_key(&self, access_token: &str) -> Result<String, Error> {
        let reply: KeyReply = self
            .send(
                self.client
                    .get(self.url("/api/auth/api-key"))
                    .bearer_auth(access_token),
            )
            .await?;
        Ok(reply.api_key)
    }

    /// Registers a cluster under `api_key`. The proxy of the returned
    /// config is left empty.
    pub async fn register(
        &self,
        registration: &ClusterRegistrationInfo,
        api_key: &str,
    ) -> Result<LicenseTokenConfig, Error> {
        let request = RegistrationRequest {
            token: registration.token()?,
        };
        let reply: KeyReply = self
            .send(
                self.client
                    .post(self.url("/api/cluster/register"))
                    .query(&[("api_key", api_key)])
                    .json(&request),
            )
            .await?;

        if reply.api_key.is_empty() && reply.license.is_empty() {
            return Err(Error::ApiKeyNotFound);
        }
        Ok(LicenseTokenConfig {
            api_key: reply.api_key,
            license: reply.license,
            proxy: String::new(),
        })
    }

    async fn send<T: serde::de::DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, Error> {
        let response = request
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .context(TransportSnafu)?;
        let status = response.status();
        let body = read_limited(response).await?;
        debug!("licensing service replied {}", status);

        if status != StatusCode::OK {
            return Err(Error::Request {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        serde_json::from_slice(&body).context(DecodeSnafu)
    }
}

async fn read_limited(response: reqwest::Response) -> Result<Vec<u8>, Error> {
    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.context(TransportSnafu)?;
        let room = BODY_LIMIT - body.len();
        body.extend_from_slice(&chunk[..chunk.len().min(room)]);
        if body.len() >= BODY_LIMIT {
            break;
        }
    }
    Ok(body)
}
