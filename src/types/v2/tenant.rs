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

use crate::types;
use crate::types::error::NoNamespaceSnafu;
use crate::types::v2::pool::Pool;
use k8s_openapi::api::core::v1 as corev1;
use kube::{CustomResource, KubeSchema, ResourceExt};
use serde::{Deserialize, Serialize};
use snafu::OptionExt;

/// Port the tenant console listens on without TLS.
pub const CONSOLE_PORT: u16 = 9090;
/// Port the tenant console listens on with TLS.
pub const CONSOLE_TLS_PORT: u16 = 9443;

/// Name of the in-namespace service fronting the tenant's object-storage API.
pub const MINIO_SERVICE_NAME: &str = "minio";
/// Label carried by every pod that belongs to a tenant.
pub const TENANT_LABEL: &str = "v1.min.io/tenant";
/// Container holding the object-storage server inside tenant pods.
pub const MINIO_CONTAINER: &str = "minio";

const CONSOLE_SERVICE_SUFFIX: &str = "-console";

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, KubeSchema, Default)]
#[kube(
    group = "minio.min.io",
    version = "v2",
    kind = "Tenant",
    namespaced,
    status = "crate::types::v2::status::TenantStatus",
    shortname = "tenant",
    plural = "tenants",
    singular = "tenant",
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.currentState"}"#,
    printcolumn = r#"{"name":"Health", "type":"string", "jsonPath":".status.healthStatus"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#,
    crates(serde_json = "k8s_openapi::serde_json")
)]
#[serde(rename_all = "camelCase")]
pub struct TenantSpec {
    #[serde(default)]
    pub pools: Vec<Pool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Secret holding a shell-style `config.env` for the tenant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<corev1::LocalObjectReference>,

    /// Legacy secret holding raw `accesskey`/`secretkey` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creds_secret: Option<corev1::LocalObjectReference>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_auto_cert: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub external_cert_secret: Vec<LocalCertificateReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<corev1::EnvVar>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<Features>,
}

#[derive(Deserialize, Serialize, Clone, Debug, KubeSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalCertificateReference {
    pub name: String,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<String>,
}

#[derive(Deserialize, Serialize, Clone, Debug, KubeSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Features {
    #[serde(default)]
    pub bucket_dns: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domains: Option<TenantDomains>,
}

#[derive(Deserialize, Serialize, Clone, Debug, KubeSchema, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TenantDomains {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub console: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub minio: Vec<String>,
}

impl Tenant {
    pub fn namespace(&self) -> Result<String, types::error::Error> {
        ResourceExt::namespace(self).context(NoNamespaceSnafu)
    }

    pub fn name(&self) -> String {
        ResourceExt::name_any(self)
    }

    /// Certificates are requested automatically unless explicitly disabled.
    pub fn auto_cert(&self) -> bool {
        self.spec.request_auto_cert.unwrap_or(true)
    }

    pub fn external_cert(&self) -> bool {
        !self.spec.external_cert_secret.is_empty()
    }

    pub fn tls(&self) -> bool {
        self.auto_cert() || self.external_cert()
    }

    fn scheme(&self) -> &'static str {
        if self.tls() { "https" } else { "http" }
    }

    pub fn console_service_name(&self) -> String {
        format!("{}{}", self.name(), CONSOLE_SERVICE_SUFFIX)
    }

    /// In-cluster URL of the tenant's own console, the target of the reverse proxy.
    pub fn console_service_url(&self, cluster_domain: &str) -> Result<String, types::error::Error> {
        let port = if self.tls() {
            CONSOLE_TLS_PORT
        } else {
            CONSOLE_PORT
        };

        Ok(format!(
            "{}://{}.{}.svc.{}:{}",
            self.scheme(),
            self.console_service_name(),
            self.namespace()?,
            cluster_domain,
            port
        ))
    }

    /// In-cluster URL of the tenant's object-storage service, which also serves the admin API.
    pub fn minio_service_url(&self, cluster_domain: &str) -> Result<String, types::error::Error> {
        let port = if self.tls() { 443 } else { 80 };

        Ok(format!(
            "{}://{}.{}.svc.{}:{}",
            self.scheme(),
            MINIO_SERVICE_NAME,
            self.namespace()?,
            cluster_domain,
            port
        ))
    }

    pub fn configuration_secret_name(&self) -> Option<&str> {
        self.spec
            .configuration
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn creds_secret_name(&self) -> Option<&str> {
        self.spec
            .creds_secret
            .as_ref()
            .map(|r| r.name.as_str())
            .filter(|n| !n.is_empty())
    }

    pub fn domains(&self) -> Option<&TenantDomains> {
        self.spec.features.as_ref().and_then(|f| f.domains.as_ref())
    }

    /// Label selector matching every pod of this tenant.
    pub fn pod_selector(&self) -> String {
        format!("{}={}", TENANT_LABEL, self.name())
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::create_test_tenant;

    #[test]
    fn test_console_url_defaults_to_tls() {
        let tenant = create_test_tenant("storage", "tenant-a");

        assert!(tenant.auto_cert());
        assert_eq!(
            tenant.console_service_url("cluster.local").ok().as_deref(),
            Some("https://storage-console.tenant-a.svc.cluster.local:9443")
        );
        assert_eq!(
            tenant.minio_service_url("cluster.local").ok().as_deref(),
            Some("https://minio.tenant-a.svc.cluster.local:443")
        );
    }

    #[test]
    fn test_console_url_without_certificates() {
        let mut tenant = create_test_tenant("storage", "tenant-a");
        tenant.spec.request_auto_cert = Some(false);

        assert_eq!(
            tenant.console_service_url("example.org").ok().as_deref(),
            Some("http://storage-console.tenant-a.svc.example.org:9090")
        );
        assert_eq!(
            tenant.minio_service_url("example.org").ok().as_deref(),
            Some("http://minio.tenant-a.svc.example.org:80")
        );
    }

    #[test]
    fn test_external_cert_flips_scheme() {
        let mut tenant = create_test_tenant("storage", "tenant-a");
        tenant.spec.request_auto_cert = Some(false);
        tenant
            .spec
            .external_cert_secret
            .push(super::LocalCertificateReference {
                name: "tls".to_string(),
                type_: None,
            });

        assert!(tenant.tls());
        assert_eq!(
            tenant.console_service_url("cluster.local").ok().as_deref(),
            Some("https://storage-console.tenant-a.svc.cluster.local:9443")
        );
    }

    #[test]
    fn test_missing_namespace() {
        let mut tenant = create_test_tenant("storage", "tenant-a");
        tenant.metadata.namespace = None;

        assert!(tenant.console_service_url("cluster.local").is_err());
    }

    #[test]
    fn test_secret_names_ignore_empty_references() {
        let mut tenant = create_test_tenant("storage", "tenant-a");
        tenant.spec.configuration = Some(k8s_openapi::api::core::v1::LocalObjectReference {
            name: String::new(),
        });

        assert_eq!(tenant.configuration_secret_name(), None);
        assert_eq!(tenant.creds_secret_name(), None);
        assert_eq!(tenant.pod_selector(), "v1.min.io/tenant=storage");
    }
}
