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

#[derive(Debug, Deserialize)]
pub struct SubnetLoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SubnetMfaRequest {
    pub username: String,
    pub mfa_token: String,
    pub otp: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiKeyQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiKey {
    pub api_key: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiKeyInfo {
    pub registered: bool,
}
