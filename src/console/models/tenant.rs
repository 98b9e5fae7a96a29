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

/// Tenant list item
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantListItem {
    pub name: String,
    pub namespace: String,
    pub pool_count: usize,
    pub total_drives: i64,
    pub current_state: String,
    pub health_status: Option<String>,
    pub creation_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantListResponse {
    pub tenants: Vec<TenantListItem>,
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub name: String,
    pub servers: i32,
    pub volumes_per_server: i32,
}

/// Tenant details
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantDetailsResponse {
    pub name: String,
    pub namespace: String,
    pub image: Option<String>,
    pub pools: Vec<PoolInfo>,
    pub current_state: String,
    pub health_status: Option<String>,
    pub drives_online: Option<i32>,
    pub drives_offline: Option<i32>,
    pub write_quorum: Option<i32>,
    pub creation_date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NamespaceListResponse {
    pub namespaces: Vec<String>,
}
