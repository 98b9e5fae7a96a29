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
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// `GET /info` reply, reduced to what the console reads.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoMessage {
    pub mode: String,
    #[serde(rename = "deploymentID")]
    pub deployment_id: String,
    pub buckets: Count,
    pub objects: Count,
    pub usage: Usage,
    pub servers: Vec<ServerProperties>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Count {
    pub count: u64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub error: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Usage {
    pub size: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServerProperties {
    pub state: String,
    pub endpoint: String,
    pub version: String,
    #[serde(rename = "commitID")]
    pub commit_id: String,
    pub uptime: i64,
    pub drives: Vec<Disk>,
    pub pool_number: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Disk {
    pub endpoint: String,
    pub state: String,
    pub totalspace: u64,
    pub usedspace: u64,
    pub availspace: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Enabled,
    Disabled,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key: String,
    pub policy_name: String,
    pub status: AccountStatus,
    pub member_of: Vec<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroupDesc {
    pub name: String,
    pub status: String,
    pub members: Vec<String>,
    pub policy: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GroupAddRemove {
    pub group: String,
    pub members: Vec<String>,
    pub group_status: String,
    pub is_remove: bool,
}

/// Service account credentials returned once at creation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAccountCredentials {
    pub access_key: String,
    pub secret_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub session_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AddServiceAccountReq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target_user: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub access_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub secret_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateServiceAccountReq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_policy: Option<Value>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub new_secret_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub new_status: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub new_name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub new_description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceAccountInfo {
    pub parent_user: String,
    pub account_status: String,
    pub implied_policy: bool,
    pub access_key: String,
    pub name: String,
    pub description: String,
    pub expiration: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListServiceAccountsResp {
    pub accounts: Vec<ServiceAccountInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InfoServiceAccountResp {
    pub parent_user: String,
    pub account_status: String,
    pub implied_policy: bool,
    pub policy: String,
    pub name: String,
    pub description: String,
    pub expiration: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketAccess {
    pub read: bool,
    pub write: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketAccessInfo {
    pub name: String,
    pub size: u64,
    pub objects: u64,
    pub access: BucketAccess,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    #[serde(rename = "AccountName")]
    pub account_name: String,
    #[serde(rename = "Policy")]
    pub policy: Value,
    #[serde(rename = "Buckets")]
    pub buckets: Vec<BucketAccessInfo>,
}

/// Replication target of a bucket. Fields the console does not read are
/// carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BucketTarget {
    #[serde(rename = "sourcebucket")]
    pub source_bucket: String,
    pub endpoint: String,
    #[serde(rename = "targetbucket")]
    pub target_bucket: String,
    pub arn: String,
    #[serde(rename = "type")]
    pub target_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierCreds {
    #[serde(rename = "access", skip_serializing_if = "String::is_empty")]
    pub access_key: String,
    #[serde(rename = "secret", skip_serializing_if = "String::is_empty")]
    pub secret_key: String,
    #[serde(rename = "creds", skip_serializing_if = "String::is_empty")]
    pub creds_json: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealOpts {
    pub recursive: bool,
    pub dry_run: bool,
    pub remove: bool,
    pub recreate: bool,
    pub scan_mode: i32,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HealRequest {
    pub bucket: String,
    pub prefix: String,
    pub opts: HealOpts,
    pub client_token: String,
    pub force_start: bool,
    pub force_stop: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmsStatus {
    pub name: String,
    #[serde(rename = "default-key")]
    pub default_key: String,
    pub endpoints: BTreeMap<String, String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KmsKeyInfo {
    pub name: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "createdBy")]
    pub created_by: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdpListItem {
    #[serde(rename = "type")]
    pub idp_type: String,
    pub name: String,
    pub enabled: bool,
    #[serde(rename = "roleARN")]
    pub role_arn: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IdpCfgInfo {
    pub key: String,
    pub value: String,
    pub is_cfg: bool,
    pub is_env: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdpConfig {
    #[serde(rename = "type")]
    pub idp_type: String,
    pub name: String,
    pub info: Vec<IdpCfgInfo>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StartProfilingResult {
    pub node_name: String,
    pub success: bool,
    pub error: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ProfilerType {
    #[default]
    Cpu,
    Mem,
    Block,
    Mutex,
    Trace,
    Threads,
    Goroutines,
}

/// Filters of a trace subscription.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TraceOptions {
    pub s3: bool,
    pub internal: bool,
    pub storage: bool,
    pub os: bool,
    pub errors_only: bool,
    /// Only calls slower than this many milliseconds.
    pub threshold_ms: i64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogOptions {
    pub node: String,
    pub limit: i64,
    pub kind: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpeedtestOptions {
    pub size: i64,
    pub concurrency: i64,
    pub duration_secs: i64,
    pub autotune: bool,
    pub bucket: String,
}

/// Error body returned by the admin API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteError {
    #[serde(rename = "Code")]
    pub code: String,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "Resource")]
    pub resource: String,
    #[serde(rename = "RequestId")]
    pub request_id: String,
}

/// Splits one line of config output, `subsys k=v k2="v 2"`, into the
/// subsystem and its pairs. Values are either bare or double quoted.
pub fn parse_config_line(line: &str) -> (String, BTreeMap<String, String>) {
    let line = line.trim();
    let (subsystem, mut rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut pairs = BTreeMap::new();

    while let Some((key, tail)) = rest.trim_start().split_once('=') {
        let (value, next) = match tail.strip_prefix('"') {
            Some(quoted) => quoted.split_once('"').unwrap_or((quoted, "")),
            None => tail.split_once(' ').unwrap_or((tail, "")),
        };
        pairs.insert(key.trim().to_string(), value.to_string());
        rest = next;
    }

    (subsystem.to_string(), pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_info_message_wire_names() {
        let info: InfoMessage = serde_json::from_value(serde_json::json!({
            "mode": "online",
            "deploymentID": "d-1",
            "buckets": {"count": 3},
            "objects": {"count": 10},
            "usage": {"size": 2048},
            "servers": [{
                "version": "2024-01-01T00-00-00Z",
                "poolNumber": 2,
                "drives": [{"totalspace": 100, "usedspace": 40}],
                "network": {"a": "online"}
            }]
        }))
        .unwrap();

        assert_eq!(info.deployment_id, "d-1");
        assert_eq!(info.buckets.count, 3);
        assert_eq!(info.servers[0].pool_number, 2);
        assert_eq!(info.servers[0].drives[0].usedspace, 40);
    }

    #[test]
    fn test_bucket_target_keeps_unknown_fields() {
        let raw = serde_json::json!({
            "sourcebucket": "src",
            "endpoint": "play.min.io",
            "targetbucket": "dst",
            "type": "replication",
            "bandwidthlimit": 100
        });
        let target: BucketTarget = serde_json::from_value(raw).unwrap();

        assert_eq!(target.source_bucket, "src");
        assert_eq!(target.endpoint, "play.min.io");
        assert_eq!(target.target_type, "replication");
        assert_eq!(target.extra["bandwidthlimit"], 100);
    }

    #[test]
    fn test_account_status() {
        assert_eq!(AccountStatus::Disabled.to_string(), "disabled");
        let user: UserInfo = serde_json::from_str(r#"{"status":"disabled","memberOf":["g"]}"#).unwrap();
        assert_eq!(user.status, AccountStatus::Disabled);
        assert_eq!(user.member_of, vec!["g"]);
    }

    #[test]
    fn test_parse_config_line() {
        let (subsystem, pairs) =
            parse_config_line(r#"subnet license=abc api_key= proxy="http://a b""#);

        assert_eq!(subsystem, "subnet");
        assert_eq!(pairs["license"], "abc");
        assert_eq!(pairs["api_key"], "");
        assert_eq!(pairs["proxy"], "http://a b");

        let (subsystem, pairs) = parse_config_line("subnet");
        assert_eq!(subsystem, "subnet");
        assert!(pairs.is_empty());
    }
}
