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

use async_trait::async_trait;
use k8s_openapi::api::core::v1 as corev1;
use kube::ResourceExt;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{ClusterClients, ClusterFactory, CoreClient, Error, OperatorClient, selector_matches};
use crate::types::v2::tenant::Tenant;

type Key = (String, String);

#[derive(Default)]
struct State {
    tokens: HashSet<String>,
    namespaces: Vec<String>,
    secrets: BTreeMap<Key, corev1::Secret>,
    config_maps: BTreeMap<Key, corev1::ConfigMap>,
    pods: BTreeMap<Key, corev1::Pod>,
    logs: BTreeMap<Key, Vec<u8>>,
    events: Vec<corev1::Event>,
    tenants: BTreeMap<Key, Tenant>,
}

fn key(namespace: &str, name: &str) -> Key {
    (namespace.to_string(), name.to_string())
}

/// In-memory cluster used by tests. Only bearers registered with
/// [`MemoryCluster::with_token`] are accepted.
#[derive(Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<State>>,
}

impl MemoryCluster {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_token(self, token: &str) -> Self {
        self.state().tokens.insert(token.to_string());
        self
    }

    pub fn with_namespace(self, namespace: &str) -> Self {
        self.state().namespaces.push(namespace.to_string());
        self
    }

    pub fn with_secret(self, secret: corev1::Secret) -> Self {
        let id = key(&secret.namespace().unwrap_or_default(), &secret.name_any());
        self.state().secrets.insert(id, secret);
        self
    }

    pub fn with_config_map(self, config_map: corev1::ConfigMap) -> Self {
        let id = key(&config_map.namespace().unwrap_or_default(), &config_map.name_any());
        self.state().config_maps.insert(id, config_map);
        self
    }

    pub fn with_pod(self, pod: corev1::Pod, logs: impl Into<Vec<u8>>) -> Self {
        let id = key(&pod.namespace().unwrap_or_default(), &pod.name_any());
        let mut state = self.state();
        state.logs.insert(id.clone(), logs.into());
        state.pods.insert(id, pod);
        drop(state);
        self
    }

    pub fn with_event(self, event: corev1::Event) -> Self {
        self.state().events.push(event);
        self
    }

    pub fn with_tenant(self, tenant: Tenant) -> Self {
        let id = key(&tenant.namespace().unwrap_or_default(), &tenant.name_any());
        self.state().tenants.insert(id, tenant);
        self
    }

    pub fn secret(&self, namespace: &str, name: &str) -> Option<corev1::Secret> {
        self.state().secrets.get(&key(namespace, name)).cloned()
    }

    pub fn config_map(&self, namespace: &str, name: &str) -> Option<corev1::ConfigMap> {
        self.state().config_maps.get(&key(namespace, name)).cloned()
    }
}

#[async_trait]
impl ClusterFactory for MemoryCluster {
    async fn for_token(&self, token: &str) -> Result<ClusterClients, Error> {
        let handle = Arc::new(MemoryClient {
            cluster: self.clone(),
            token: token.to_string(),
        });
        Ok(ClusterClients {
            core: handle.clone(),
            operator: handle,
        })
    }
}

struct MemoryClient {
    cluster: MemoryCluster,
    token: String,
}

impl MemoryClient {
    /// Locks the cluster after checking the bearer, like an API server
    /// would on every call.
    fn authorized(&self) -> Result<MutexGuard<'_, State>, Error> {
        let state = self.cluster.state();
        if state.tokens.contains(&self.token) {
            Ok(state)
        } else {
            Err(Error::Unauthorized)
        }
    }
}

fn not_found(kind: &str, namespace: &str, name: &str) -> Error {
    Error::NotFound {
        resource: format!("{}/{}/{}", kind, namespace, name),
    }
}

#[async_trait]
impl CoreClient for MemoryClient {
    async fn authenticate(&self) -> Result<(), Error> {
        self.authorized().map(|_| ())
    }

    async fn list_namespaces(&self) -> Result<Vec<corev1::Namespace>, Error> {
        let state = self.authorized()?;
        Ok(state
            .namespaces
            .iter()
            .map(|name| corev1::Namespace {
                metadata: kube::api::ObjectMeta {
                    name: Some(name.clone()),
                    ..Default::default()
                },
                ..Default::default()
            })
            .collect())
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<corev1::Secret, Error> {
        self.authorized()?
            .secrets
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("secrets", namespace, name))
    }

    async fn create_secret(
        &self,
        namespace: &str,
        mut secret: corev1::Secret,
    ) -> Result<corev1::Secret, Error> {
        let mut state = self.authorized()?;
        let id = key(namespace, &secret.name_any());
        if state.secrets.contains_key(&id) {
            return Err(Error::AlreadyExists {
                resource: format!("secrets/{}/{}", id.0, id.1),
            });
        }
        secret.metadata.namespace = Some(namespace.to_string());
        state.secrets.insert(id, secret.clone());
        Ok(secret)
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<corev1::ConfigMap, Error> {
        self.authorized()?
            .config_maps
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("configmaps", namespace, name))
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        mut config_map: corev1::ConfigMap,
    ) -> Result<corev1::ConfigMap, Error> {
        let mut state = self.authorized()?;
        let id = key(namespace, &config_map.name_any());
        if state.config_maps.contains_key(&id) {
            return Err(Error::AlreadyExists {
                resource: format!("configmaps/{}/{}", id.0, id.1),
            });
        }
        config_map.metadata.namespace = Some(namespace.to_string());
        state.config_maps.insert(id, config_map.clone());
        Ok(config_map)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<corev1::Pod>, Error> {
        let state = self.authorized()?;
        Ok(state
            .pods
            .iter()
            .filter(|((ns, _), _)| ns == namespace)
            .filter(|(_, pod)| {
                let labels = pod.labels();
                selector_matches(label_selector, |k| labels.get(k).map(String::as_str))
            })
            .map(|(_, pod)| pod.clone())
            .collect())
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        _container: &str,
    ) -> Result<Vec<u8>, Error> {
        self.authorized()?
            .logs
            .get(&key(namespace, pod))
            .cloned()
            .ok_or_else(|| not_found("pods", namespace, pod))
    }

    async fn list_events(
        &self,
        namespace: &str,
        field_selector: &str,
    ) -> Result<Vec<corev1::Event>, Error> {
        let state = self.authorized()?;
        Ok(state
            .events
            .iter()
            .filter(|event| event.metadata.namespace.as_deref() == Some(namespace))
            .filter(|event| {
                selector_matches(field_selector, |field| match field {
                    "involvedObject.uid" => event.involved_object.uid.as_deref(),
                    "involvedObject.name" => event.involved_object.name.as_deref(),
                    "metadata.name" => event.metadata.name.as_deref(),
                    _ => None,
                })
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OperatorClient for MemoryClient {
    async fn get_tenant(&self, namespace: &str, name: &str) -> Result<Tenant, Error> {
        self.authorized()?
            .tenants
            .get(&key(namespace, name))
            .cloned()
            .ok_or_else(|| not_found("tenants", namespace, name))
    }

    async fn list_tenants(&self, namespace: Option<&str>) -> Result<Vec<Tenant>, Error> {
        let state = self.authorized()?;
        Ok(state
            .tenants
            .iter()
            .filter(|((ns, _), _)| namespace.is_none_or(|wanted| ns == wanted))
            .map(|(_, tenant)| tenant.clone())
            .collect())
    }
}
