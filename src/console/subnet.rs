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

//! Fleet registration with the remote licensing service: password login,
//! optional one-time-password step, api key retrieval and per-tenant
//! registration, finished by writing the registration marker secret.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::ByteString;
use k8s_openapi::api::core::v1 as corev1;
use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

use crate::console::admin::types::{InfoMessage, parse_config_line};
use crate::console::admin::{self, AdminConnector, TenantAdmin};
use crate::console::cluster::{self, ClusterClients, CoreClient};
use crate::console::error::ErrorKind;

mod client;

pub use client::SubnetClient;

/// Namespace holding the registration marker.
pub const MARKER_NAMESPACE: &str = "default";
/// Key of the api key inside the marker secret.
pub const MARKER_API_KEY: &str = "api-key";

const SUBNET_SUBSYSTEM: &str = "subnet";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("empty credentials"))]
    EmptyCredentials,

    #[snafu(display("Request failed with code {} and errors: {}", status, body))]
    Request { status: u16, body: String },

    #[snafu(display("licensing request failed: {}", source))]
    Transport { source: reqwest::Error },

    #[snafu(display("invalid licensing response: {}", source))]
    Decode { source: serde_json::Error },

    #[snafu(display("missing mfa token"))]
    MissingMfaToken,

    #[snafu(display("access token not found in response"))]
    MissingAccessToken,

    #[snafu(display("subnet api key not found"))]
    ApiKeyNotFound,

    #[snafu(display("tenant reports no servers"))]
    NoServers,

    #[snafu(display("{}", source))]
    Admin { source: admin::Error },

    #[snafu(display("tenant {}: {}", tenant, source))]
    Tenant {
        tenant: String,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display("{}", source))]
    Cluster { source: cluster::Error },

    #[snafu(display("{}", source))]
    Client { source: crate::context::Error },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyCredentials => ErrorKind::BadRequest,
            Error::Request { status: 401 | 403, .. } => ErrorKind::AccessDenied,
            Error::Admin { source } => source.kind(),
            Error::Tenant { source, .. } => source.kind(),
            Error::Cluster { source } => source.kind(),
            _ => ErrorKind::Default,
        }
    }
}

/// Outcome of a login step. Exactly one token is set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub mfa_token: String,
}

/// Licensing state kept in a tenant's `subnet` subsystem.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LicenseTokenConfig {
    pub api_key: String,
    pub license: String,
    pub proxy: String,
}

impl LicenseTokenConfig {
    /// Reads the config output of the `subnet` subsystem.
    pub fn parse(output: &str) -> Self {
        let mut config = Self::default();
        for line in output.lines().filter(|l| !l.trim().is_empty()) {
            let (_, pairs) = parse_config_line(line);
            for (key, value) in pairs {
                match key.as_str() {
                    "api_key" => config.api_key = value,
                    "license" => config.license = value,
                    "proxy" => config.proxy = value,
                    _ => {}
                }
            }
        }
        config
    }

    pub fn to_config_kv(&self) -> String {
        format!(
            "{} license={} api_key={} proxy={}",
            SUBNET_SUBSYSTEM, self.license, self.api_key, self.proxy
        )
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub minio_version: String,
    pub no_of_server_pools: i64,
    pub no_of_servers: usize,
    pub no_of_drives: usize,
    pub no_of_buckets: u64,
    pub no_of_objects: u64,
    pub total_drive_space: u64,
    pub used_drive_space: u64,
}

/// Summary of a tenant sent to the licensing service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterRegistrationInfo {
    pub deployment_id: String,
    pub cluster_name: String,
    pub used_capacity: u64,
    pub info: ClusterInfo,
}

impl ClusterRegistrationInfo {
    pub fn from_info(info: &InfoMessage) -> Result<Self, Error> {
        let first = info.servers.first().ok_or(Error::NoServers)?;
        let drives = info.servers.iter().flat_map(|s| s.drives.iter());

        Ok(Self {
            deployment_id: info.deployment_id.clone(),
            cluster_name: info.deployment_id.clone(),
            used_capacity: info.usage.size,
            info: ClusterInfo {
                minio_version: first.version.clone(),
                no_of_server_pools: info
                    .servers
                    .iter()
                    .map(|s| s.pool_number)
                    .fold(1, i64::max),
                no_of_servers: info.servers.len(),
                no_of_drives: drives.clone().count(),
                no_of_buckets: info.buckets.count,
                no_of_objects: info.objects.count,
                total_drive_space: drives.clone().map(|d| d.totalspace).sum(),
                used_drive_space: drives.map(|d| d.usedspace).sum(),
            },
        })
    }

    /// Base64 of the JSON document, as sent in the registration request.
    pub fn token(&self) -> Result<String, Error> {
        let json = serde_json::to_vec(self).context(DecodeSnafu)?;
        Ok(STANDARD.encode(json))
    }
}

/// Registers one tenant and stores the returned license in its `subnet`
/// subsystem, keeping the configured proxy.
pub async fn register_tenant(
    subnet: &SubnetClient,
    admin: &dyn TenantAdmin,
    api_key: &str,
) -> Result<(), Error> {
    let info = admin.server_info().await.context(AdminSnafu)?;
    let registration = ClusterRegistrationInfo::from_info(&info)?;
    let mut license = subnet.register(&registration, api_key).await?;

    let current = admin
        .get_config_kv(SUBNET_SUBSYSTEM)
        .await
        .context(AdminSnafu)?;
    license.proxy = LicenseTokenConfig::parse(&current).proxy;
    admin
        .set_config_kv(&license.to_config_kv())
        .await
        .context(AdminSnafu)?;
    Ok(())
}

/// Registers every tenant visible to the caller, then writes the marker
/// secret. Tenants are handled one after another and the marker is only
/// written once all of them succeeded.
pub async fn register_tenants(
    subnet: &SubnetClient,
    clusters: &ClusterClients,
    connector: &dyn AdminConnector,
    api_key: &str,
    marker_name: &str,
) -> Result<(), Error> {
    let tenants = clusters
        .operator
        .list_tenants(None)
        .await
        .context(ClusterSnafu)?;

    let mut admins: Vec<(String, Arc<dyn TenantAdmin>)> = Vec::with_capacity(tenants.len());
    for tenant in &tenants {
        let id = format!("{}/{}", tenant.namespace().unwrap_or_default(), tenant.name());
        let admin = connector
            .connect(clusters.core.as_ref(), tenant)
            .await
            .context(AdminSnafu)
            .context(TenantSnafu { tenant: id.clone() })?;
        admins.push((id, admin));
    }

    for (id, admin) in &admins {
        register_tenant(subnet, admin.as_ref(), api_key)
            .await
            .context(TenantSnafu { tenant: id.clone() })?;
        info!("registered tenant {}", id);
    }

    create_marker(clusters.core.as_ref(), api_key, marker_name).await
}

async fn create_marker(core: &dyn CoreClient, api_key: &str, name: &str) -> Result<(), Error> {
    let secret = corev1::Secret {
        metadata: metav1::ObjectMeta {
            name: Some(name.to_string()),
            ..Default::default()
        },
        type_: Some("Opaque".to_string()),
        data: Some(BTreeMap::from([(
            MARKER_API_KEY.to_string(),
            ByteString(api_key.as_bytes().to_vec()),
        )])),
        ..Default::default()
    };

    core.create_secret(MARKER_NAMESPACE, secret)
        .await
        .context(ClusterSnafu)?;
    Ok(())
}

/// Whether the fleet holds a registration marker. A missing marker is a
/// not-found error.
pub async fn api_key_registered(core: &dyn CoreClient, marker_name: &str) -> Result<bool, Error> {
    core.get_secret(MARKER_NAMESPACE, marker_name)
        .await
        .context(ClusterSnafu)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::admin::types::{Count, Disk, ServerProperties, Usage};
    use crate::console::admin::{MemoryAdmin, MemoryAdminConnector};
    use crate::console::cluster::{ClusterFactory, MemoryCluster};
    use crate::tests::create_test_tenant;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn info(deployment: &str) -> InfoMessage {
        let drive = |total, used| Disk {
            totalspace: total,
            usedspace: used,
            ..Default::default()
        };
        InfoMessage {
            deployment_id: deployment.to_string(),
            buckets: Count {
                count: 3,
                ..Default::default()
            },
            objects: Count {
                count: 30,
                ..Default::default()
            },
            usage: Usage { size: 512 },
            servers: vec![
                ServerProperties {
                    version: "RELEASE.2024".to_string(),
                    pool_number: 1,
                    drives: vec![drive(100, 10), drive(100, 20)],
                    ..Default::default()
                },
                ServerProperties {
                    version: "RELEASE.2023".to_string(),
                    pool_number: 2,
                    drives: vec![drive(50, 5)],
                    ..Default::default()
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_registration_info() {
        let registration = ClusterRegistrationInfo::from_info(&info("dep-1")).unwrap();

        assert_eq!(registration.cluster_name, "dep-1");
        assert_eq!(registration.used_capacity, 512);
        assert_eq!(registration.info.minio_version, "RELEASE.2024");
        assert_eq!(registration.info.no_of_server_pools, 2);
        assert_eq!(registration.info.no_of_servers, 2);
        assert_eq!(registration.info.no_of_drives, 3);
        assert_eq!(registration.info.total_drive_space, 250);
        assert_eq!(registration.info.used_drive_space, 35);

        let decoded = STANDARD.decode(registration.token().unwrap()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(json["deployment_id"], "dep-1");
        assert_eq!(json["info"]["no_of_buckets"], 3);

        assert!(matches!(
            ClusterRegistrationInfo::from_info(&InfoMessage::default()),
            Err(Error::NoServers)
        ));
    }

    #[test]
    fn test_license_config() {
        let config = LicenseTokenConfig::parse("subnet license= api_key=old proxy=http://proxy:3128\n");
        assert_eq!(config.proxy, "http://proxy:3128");
        assert_eq!(config.api_key, "old");

        let updated = LicenseTokenConfig {
            license: "lic".to_string(),
            api_key: "key".to_string(),
            proxy: config.proxy,
        };
        assert_eq!(
            updated.to_config_kv(),
            "subnet license=lic api_key=key proxy=http://proxy:3128"
        );
    }

    async fn licensing_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/cluster/register"))
            .and(query_param("api_key", "key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "api_key": "new-key",
                "license": "jwt-license"
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_register_tenants_writes_marker() {
        let server = licensing_server().await;
        let subnet = SubnetClient::new(reqwest::Client::new(), server.uri());
        let admin = MemoryAdmin::new()
            .with_info(info("dep-1"))
            .with_config("subnet license= api_key= proxy=http://proxy:3128");
        let connector = MemoryAdminConnector::new().with_tenant("ns", "t1", admin.clone());
        let cluster = MemoryCluster::new()
            .with_token("tok")
            .with_tenant(create_test_tenant("t1", "ns"));
        let clients = cluster.for_token("tok").await.unwrap();

        register_tenants(&subnet, &clients, &connector, "key", "operator-subnet")
            .await
            .unwrap();

        assert_eq!(
            admin.config("subnet").unwrap(),
            "subnet api_key=new-key license=jwt-license proxy=http://proxy:3128"
        );
        let marker = cluster.secret(MARKER_NAMESPACE, "operator-subnet").unwrap();
        assert_eq!(marker.data.unwrap()[MARKER_API_KEY].0, b"key");
        assert!(api_key_registered(clients.core.as_ref(), "operator-subnet").await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_tenant_leaves_no_marker() {
        let server = licensing_server().await;
        let subnet = SubnetClient::new(reqwest::Client::new(), server.uri());
        let healthy = MemoryAdmin::new().with_info(info("dep-1"));
        let broken = MemoryAdmin::new().with_failure("server_info", 403, "AccessDenied", "denied");
        let connector = MemoryAdminConnector::new()
            .with_tenant("ns", "a", healthy.clone())
            .with_tenant("ns", "b", broken);
        let cluster = MemoryCluster::new()
            .with_token("tok")
            .with_tenant(create_test_tenant("a", "ns"))
            .with_tenant(create_test_tenant("b", "ns"));
        let clients = cluster.for_token("tok").await.unwrap();

        let error = register_tenants(&subnet, &clients, &connector, "key", "operator-subnet")
            .await
            .unwrap_err();

        assert!(error.to_string().starts_with("tenant ns/b"));
        assert_eq!(error.kind(), ErrorKind::AccessDenied);
        assert!(cluster.secret(MARKER_NAMESPACE, "operator-subnet").is_none());

        let missing = api_key_registered(clients.core.as_ref(), "operator-subnet")
            .await
            .unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unreachable_tenant_aborts_before_registration() {
        let server = licensing_server().await;
        let subnet = SubnetClient::new(reqwest::Client::new(), server.uri());
        let cluster = MemoryCluster::new()
            .with_token("tok")
            .with_tenant(create_test_tenant("lost", "ns"));
        let clients = cluster.for_token("tok").await.unwrap();

        let error = register_tenants(&subnet, &clients, &MemoryAdminConnector::new(), "key", "m")
            .await
            .unwrap_err();

        assert!(matches!(error, Error::Tenant { ref tenant, .. } if tenant == "ns/lost"));
        assert!(server.received_requests().await.unwrap().is_empty());
        assert!(cluster.secret(MARKER_NAMESPACE, "m").is_none());
    }
}
