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

//! Typed client for a tenant's admin API (`/minio/admin/v3`).

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::console::cluster::{self, CoreClient};
use crate::console::error::ErrorKind;
use crate::context::Context;
use crate::types::v2::tenant::Tenant;

mod client;
pub mod credentials;
pub mod crypto;
mod memory;
pub mod signer;
pub mod types;

pub use client::HttpAdmin;
pub use memory::{MemoryAdmin, MemoryAdminConnector};
use types::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("{}", message))]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    #[snafu(display("admin request failed: {}", source))]
    Transport { source: reqwest::Error },

    #[snafu(display("invalid admin response: {}", source))]
    Decode { source: serde_json::Error },

    #[snafu(display("admin event stream failed: {}", source))]
    Stream { source: std::io::Error },

    #[snafu(display("{}", source))]
    Crypto { source: crypto::Error },

    #[snafu(display("{}", source))]
    Sign { source: signer::Error },

    #[snafu(display("invalid tenant url '{}': {}", url, source))]
    Url {
        url: String,
        source: url::ParseError,
    },

    #[snafu(display("{}", source))]
    Client { source: crate::context::Error },

    #[snafu(display("{}", source))]
    Cluster { source: cluster::Error },

    #[snafu(display("{}", source))]
    Tenant { source: crate::types::error::Error },

    #[snafu(display("tenant configuration does not hold admin credentials"))]
    MissingCredentials,

    #[snafu(display("{} is not supported by this tenant", operation))]
    Unsupported { operation: String },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Remote { code, status, .. } => {
                ErrorKind::from_remote_code(code).unwrap_or(match code.as_str() {
                    "XMinioAdminNoSuchPolicy" => ErrorKind::PolicyNotFound,
                    "XMinioAdminNoSuchGroup" | "XMinioAdminNoSuchServiceAccount" => {
                        ErrorKind::NotFound
                    }
                    "XMinioAdminTierAlreadyExists" => ErrorKind::RemoteTierExists,
                    "XMinioAdminTierNotFound" => ErrorKind::RemoteTierNotFound,
                    "XMinioAdminTierNameNotUpperCase" => ErrorKind::RemoteTierUppercase,
                    "XMinioAdminTierBucketNotFound" => ErrorKind::RemoteTierBucketNotFound,
                    "XMinioAdminTierInvalidCredentials" => {
                        ErrorKind::RemoteTierInvalidCredentials
                    }
                    "XMinioAdminGroupExists" => ErrorKind::GroupExists,
                    _ if *status == 404 => ErrorKind::NotFound,
                    _ => ErrorKind::Default,
                })
            }
            Error::Cluster { source } => source.kind(),
            _ => ErrorKind::Default,
        }
    }
}

/// Root credentials of a tenant.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key: String,
    pub secret_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"*REDACTED*")
            .finish()
    }
}

/// Events of a streaming admin call. The sender side closes when the
/// subscription is cancelled or the tenant ends the stream.
pub type EventStream = mpsc::Receiver<Result<Value, Error>>;

/// Operations offered by a tenant's admin API. Unary calls are cancelled by
/// dropping their future; streaming calls stop when `cancel` fires.
#[async_trait]
pub trait TenantAdmin: Send + Sync {
    async fn server_info(&self) -> Result<InfoMessage, Error>;

    // configuration
    /// Raw `subsys k=v ...` lines for `key`.
    async fn get_config_kv(&self, key: &str) -> Result<String, Error>;
    /// Returns whether the tenant needs a restart to apply the change.
    async fn set_config_kv(&self, kv: &str) -> Result<bool, Error>;
    async fn del_config_kv(&self, kv: &str) -> Result<(), Error>;
    async fn help_config_kv(&self, sub_sys: &str, key: &str, env_only: bool) -> Result<Value, Error>;
    async fn service_restart(&self) -> Result<(), Error>;

    // users
    async fn list_users(&self) -> Result<BTreeMap<String, UserInfo>, Error>;
    async fn add_user(&self, access_key: &str, secret_key: &str) -> Result<(), Error>;
    async fn remove_user(&self, access_key: &str) -> Result<(), Error>;
    async fn get_user_info(&self, access_key: &str) -> Result<UserInfo, Error>;
    async fn set_user_status(&self, access_key: &str, status: AccountStatus) -> Result<(), Error>;
    async fn change_password(&self, access_key: &str, secret_key: &str) -> Result<(), Error>;

    // groups
    async fn list_groups(&self) -> Result<Vec<String>, Error>;
    async fn update_group_members(&self, request: &GroupAddRemove) -> Result<(), Error>;
    async fn get_group_description(&self, group: &str) -> Result<GroupDesc, Error>;
    async fn set_group_status(&self, group: &str, status: AccountStatus) -> Result<(), Error>;

    // policies
    async fn list_policies(&self) -> Result<BTreeMap<String, Value>, Error>;
    async fn get_policy(&self, name: &str) -> Result<Value, Error>;
    async fn add_policy(&self, name: &str, policy: &Value) -> Result<(), Error>;
    async fn remove_policy(&self, name: &str) -> Result<(), Error>;
    async fn set_policy(&self, policy: &str, entity: &str, is_group: bool) -> Result<(), Error>;

    // service accounts
    async fn add_service_account(
        &self,
        request: &AddServiceAccountReq,
    ) -> Result<ServiceAccountCredentials, Error>;
    async fn list_service_accounts(&self, user: &str) -> Result<ListServiceAccountsResp, Error>;
    async fn info_service_account(&self, access_key: &str) -> Result<InfoServiceAccountResp, Error>;
    async fn update_service_account(
        &self,
        access_key: &str,
        request: &UpdateServiceAccountReq,
    ) -> Result<(), Error>;
    async fn delete_service_account(&self, access_key: &str) -> Result<(), Error>;

    async fn account_info(&self) -> Result<AccountInfo, Error>;

    async fn heal(&self, request: &HealRequest) -> Result<Value, Error>;

    // remote buckets
    async fn list_remote_buckets(&self, bucket: &str, arn_type: &str)
    -> Result<Vec<BucketTarget>, Error>;
    /// Returns the ARN of the new target.
    async fn add_remote_bucket(&self, bucket: &str, target: &BucketTarget) -> Result<String, Error>;
    async fn remove_remote_bucket(&self, bucket: &str, arn: &str) -> Result<(), Error>;

    // tiers
    async fn list_tiers(&self) -> Result<Vec<Value>, Error>;
    async fn tier_stats(&self) -> Result<Vec<Value>, Error>;
    async fn add_tier(&self, config: &Value) -> Result<(), Error>;
    async fn edit_tier_creds(&self, name: &str, creds: &TierCreds) -> Result<(), Error>;
    async fn verify_tier(&self, name: &str) -> Result<(), Error>;

    // site replication
    async fn site_replication_info(&self) -> Result<Value, Error>;
    async fn add_site_replication(&self, sites: &Value) -> Result<Value, Error>;
    async fn edit_site_replication(&self, site: &Value) -> Result<Value, Error>;
    async fn remove_site_replication(&self, request: &Value) -> Result<Value, Error>;
    async fn site_replication_status(&self, query: &[(&str, &str)]) -> Result<Value, Error>;

    // key management
    async fn kms_status(&self) -> Result<KmsStatus, Error>;
    async fn create_key(&self, key: &str) -> Result<(), Error>;
    async fn list_keys(&self, pattern: &str) -> Result<Vec<KmsKeyInfo>, Error>;
    async fn key_status(&self, key: &str) -> Result<Value, Error>;

    // identity providers
    /// Returns whether the tenant needs a restart to apply the change.
    async fn add_or_update_idp_config(
        &self,
        idp_type: &str,
        name: &str,
        config: &str,
        update: bool,
    ) -> Result<bool, Error>;
    async fn list_idp_config(&self, idp_type: &str) -> Result<Vec<IdpListItem>, Error>;
    async fn get_idp_config(&self, idp_type: &str, name: &str) -> Result<IdpConfig, Error>;
    async fn delete_idp_config(&self, idp_type: &str, name: &str) -> Result<bool, Error>;

    // profiling
    async fn start_profiling(&self, profiler: ProfilerType)
    -> Result<Vec<StartProfilingResult>, Error>;
    /// Zip archive with the profiles of every node.
    async fn download_profiling_data(&self) -> Result<Bytes, Error>;

    // streams
    async fn service_trace(
        &self,
        options: &TraceOptions,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error>;
    async fn get_logs(&self, options: &LogOptions, cancel: CancellationToken)
    -> Result<EventStream, Error>;
    async fn speedtest(
        &self,
        options: &SpeedtestOptions,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error>;
}

/// Produces an admin client for a tenant, resolving its credentials with
/// the caller's cluster access.
#[async_trait]
pub trait AdminConnector: Send + Sync {
    async fn connect(
        &self,
        core: &dyn CoreClient,
        tenant: &Tenant,
    ) -> Result<Arc<dyn TenantAdmin>, Error>;
}

/// Connects to the tenant's in-cluster `minio` service over HTTP(S).
pub struct HttpAdminConnector {
    context: Arc<Context>,
    cluster_domain: String,
}

impl HttpAdminConnector {
    pub fn new(context: Arc<Context>, cluster_domain: impl Into<String>) -> Self {
        Self {
            context,
            cluster_domain: cluster_domain.into(),
        }
    }
}

#[async_trait]
impl AdminConnector for HttpAdminConnector {
    async fn connect(
        &self,
        core: &dyn CoreClient,
        tenant: &Tenant,
    ) -> Result<Arc<dyn TenantAdmin>, Error> {
        let credentials = credentials::tenant_credentials(core, tenant).await?;
        let endpoint = tenant
            .minio_service_url(&self.cluster_domain)
            .context(TenantSnafu)?;
        let client = self.context.tenant_http_client(true).context(ClientSnafu)?;

        Ok(Arc::new(HttpAdmin::new(client, &endpoint, credentials)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(status: u16, code: &str) -> Error {
        Error::Remote {
            status,
            code: code.to_string(),
            message: "m".to_string(),
        }
    }

    #[test]
    fn test_remote_error_kinds() {
        assert_eq!(remote(403, "AccessDenied").kind(), ErrorKind::AccessDenied);
        assert_eq!(remote(403, "InvalidAccessKeyId").kind(), ErrorKind::InvalidAccessKey);
        assert_eq!(
            remote(404, "XMinioAdminNoSuchPolicy").kind(),
            ErrorKind::PolicyNotFound
        );
        assert_eq!(remote(404, "XMinioSomethingElse").kind(), ErrorKind::NotFound);
        assert_eq!(remote(500, "InternalError").kind(), ErrorKind::Default);
    }

    #[test]
    fn test_credentials_debug_is_redacted() {
        let credentials = Credentials {
            access_key: "minio".to_string(),
            secret_key: "minio123".to_string(),
        };
        let debug = format!("{:?}", credentials);

        assert!(debug.contains("minio"));
        assert!(!debug.contains("minio123"));
    }
}
