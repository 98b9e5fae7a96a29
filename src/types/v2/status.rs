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

use kube::KubeSchema;
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Clone, Debug, KubeSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantStatus {
    #[serde(default)]
    pub current_state: String,

    #[serde(default)]
    pub available_replicas: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_status: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drives_online: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drives_offline: Option<i32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_quorum: Option<i32>,
}
