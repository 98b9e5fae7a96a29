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
use serde::{Deserialize, Serialize};

/// Login strategies offered to the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoginStrategy {
    ServiceAccount,
    RedirectServiceAccount,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRule {
    pub redirect: String,
    pub display_name: String,
}

/// `GET /login` response.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LoginDetails {
    pub login_strategy: LoginStrategy,
    #[serde(default)]
    pub redirect_rules: Vec<RedirectRule>,
    #[serde(rename = "isK8S")]
    pub is_k8s: bool,
}

/// Service account login request.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub jwt: String,
}

/// Authorization code returned by the identity provider.
#[derive(Debug, Deserialize)]
pub struct Oauth2Request {
    pub code: String,
    pub state: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionResponse {
    pub status: String,
    pub operator: bool,
    pub features: Vec<String>,
}
