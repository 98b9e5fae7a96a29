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

//! Cluster access on behalf of a principal: the core API (secrets, pods,
//! events, ...) and the operator's `Tenant` resources.

use async_trait::async_trait;
use k8s_openapi::api::core::v1 as corev1;
use snafu::Snafu;
use std::sync::Arc;

use crate::console::error::ErrorKind;
use crate::types::v2::tenant::Tenant;

mod client;
mod memory;

pub use client::KubeClusterFactory;
pub use memory::MemoryCluster;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum Error {
    #[snafu(display("unable to load cluster configuration: {}", source))]
    InferConfig {
        source: kube::config::InferConfigError,
    },

    #[snafu(display("unable to build cluster client: {}", source))]
    Connect { source: kube::Error },

    #[snafu(display("{}", source))]
    Kube { source: kube::Error },

    #[snafu(display("unable to read logs of pod {}: {}", pod, source))]
    ReadLogs { pod: String, source: std::io::Error },

    #[snafu(display("{} not found", resource))]
    NotFound { resource: String },

    #[snafu(display("{} already exists", resource))]
    AlreadyExists { resource: String },

    #[snafu(display("Unauthorized"))]
    Unauthorized,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Kube { source } | Error::Connect { source } => ErrorKind::from_kube(source),
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::Unauthorized => ErrorKind::InvalidSession,
            Error::InferConfig { .. } | Error::AlreadyExists { .. } | Error::ReadLogs { .. } => {
                ErrorKind::Default
            }
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }
}

/// Core Kubernetes API, scoped to one principal.
#[async_trait]
pub trait CoreClient: Send + Sync {
    /// Cheap read against the API root; fails when the bearer is rejected.
    async fn authenticate(&self) -> Result<(), Error>;

    async fn list_namespaces(&self) -> Result<Vec<corev1::Namespace>, Error>;

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<corev1::Secret, Error>;

    async fn create_secret(
        &self,
        namespace: &str,
        secret: corev1::Secret,
    ) -> Result<corev1::Secret, Error>;

    async fn get_config_map(&self, namespace: &str, name: &str)
    -> Result<corev1::ConfigMap, Error>;

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: corev1::ConfigMap,
    ) -> Result<corev1::ConfigMap, Error>;

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<corev1::Pod>, Error>;

    /// Raw log bytes of one container, as the kubelet returns them.
    async fn pod_logs(&self, namespace: &str, pod: &str, container: &str)
    -> Result<Vec<u8>, Error>;

    async fn list_events(
        &self,
        namespace: &str,
        field_selector: &str,
    ) -> Result<Vec<corev1::Event>, Error>;
}

/// The operator's custom resources, scoped to one principal.
#[async_trait]
pub trait OperatorClient: Send + Sync {
    async fn get_tenant(&self, namespace: &str, name: &str) -> Result<Tenant, Error>;

    /// Tenants in `namespace`, or in every namespace when `None`.
    async fn list_tenants(&self, namespace: Option<&str>) -> Result<Vec<Tenant>, Error>;
}

/// Handles built for a single bearer credential.
#[derive(Clone)]
pub struct ClusterClients {
    pub core: Arc<dyn CoreClient>,
    pub operator: Arc<dyn OperatorClient>,
}

/// Builds cluster handles for a bearer. Nothing is cached or shared between
/// principals.
#[async_trait]
pub trait ClusterFactory: Send + Sync {
    async fn for_token(&self, token: &str) -> Result<ClusterClients, Error>;
}

/// Matches `k=v[,k=v...]` selectors against a set of labels or fields.
pub(crate) fn selector_matches<'a>(
    selector: &str,
    lookup: impl Fn(&str) -> Option<&'a str>,
) -> bool {
    selector
        .split(',')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .all(|term| match term.split_once('=') {
            Some((key, value)) => lookup(key.trim()) == Some(value.trim()),
            None => lookup(term).is_some(),
        })
}
