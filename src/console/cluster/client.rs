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
use futures::AsyncReadExt;
use k8s_openapi::api::core::v1 as corev1;
use kube::api::{ListParams, LogParams, PostParams};
use kube::{Api, Client};
use snafu::ResultExt;
use std::sync::Arc;

use super::{
    ClusterClients, ClusterFactory, ConnectSnafu, CoreClient, Error, InferConfigSnafu, KubeSnafu,
    OperatorClient, ReadLogsSnafu,
};
use crate::types::v2::tenant::Tenant;

/// Builds `kube` clients from the in-cluster or kubeconfig settings, with
/// the principal's bearer replacing any configured credentials.
#[derive(Clone, Default)]
pub struct KubeClusterFactory;

#[async_trait]
impl ClusterFactory for KubeClusterFactory {
    async fn for_token(&self, token: &str) -> Result<ClusterClients, Error> {
        let mut config = kube::Config::infer().await.context(InferConfigSnafu)?;

        let auth = &mut config.auth_info;
        auth.token = Some(token.to_string().into());
        auth.token_file = None;
        auth.username = None;
        auth.password = None;
        auth.client_certificate = None;
        auth.client_certificate_data = None;
        auth.client_key = None;
        auth.client_key_data = None;
        auth.auth_provider = None;
        auth.exec = None;

        let client = Client::try_from(config).context(ConnectSnafu)?;
        let handle = Arc::new(KubeCluster { client });
        Ok(ClusterClients {
            core: handle.clone(),
            operator: handle,
        })
    }
}

pub struct KubeCluster {
    client: Client,
}

#[async_trait]
impl CoreClient for KubeCluster {
    async fn authenticate(&self) -> Result<(), Error> {
        let request = http::Request::get("/api")
            .body(Vec::new())
            .map_err(|e| Error::Kube {
                source: kube::Error::HttpError(e),
            })?;
        self.client.request_text(request).await.context(KubeSnafu)?;
        Ok(())
    }

    async fn list_namespaces(&self) -> Result<Vec<corev1::Namespace>, Error> {
        let api: Api<corev1::Namespace> = Api::all(self.client.clone());
        let list = api.list(&ListParams::default()).await.context(KubeSnafu)?;
        Ok(list.items)
    }

    async fn get_secret(&self, namespace: &str, name: &str) -> Result<corev1::Secret, Error> {
        let api: Api<corev1::Secret> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.context(KubeSnafu)
    }

    async fn create_secret(
        &self,
        namespace: &str,
        secret: corev1::Secret,
    ) -> Result<corev1::Secret, Error> {
        let api: Api<corev1::Secret> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &secret)
            .await
            .context(KubeSnafu)
    }

    async fn get_config_map(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<corev1::ConfigMap, Error> {
        let api: Api<corev1::ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.context(KubeSnafu)
    }

    async fn create_config_map(
        &self,
        namespace: &str,
        config_map: corev1::ConfigMap,
    ) -> Result<corev1::ConfigMap, Error> {
        let api: Api<corev1::ConfigMap> = Api::namespaced(self.client.clone(), namespace);
        api.create(&PostParams::default(), &config_map)
            .await
            .context(KubeSnafu)
    }

    async fn list_pods(
        &self,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<corev1::Pod>, Error> {
        let api: Api<corev1::Pod> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().labels(label_selector))
            .await
            .context(KubeSnafu)?;
        Ok(list.items)
    }

    async fn pod_logs(
        &self,
        namespace: &str,
        pod: &str,
        container: &str,
    ) -> Result<Vec<u8>, Error> {
        let api: Api<corev1::Pod> = Api::namespaced(self.client.clone(), namespace);
        let params = LogParams {
            container: Some(container.to_string()),
            ..LogParams::default()
        };
        // `Api::logs` insists on UTF-8, the report keeps whatever the pod wrote
        let mut stream = Box::pin(api.log_stream(pod, &params).await.context(KubeSnafu)?);
        let mut logs = Vec::new();
        stream
            .read_to_end(&mut logs)
            .await
            .context(ReadLogsSnafu { pod })?;
        Ok(logs)
    }

    async fn list_events(
        &self,
        namespace: &str,
        field_selector: &str,
    ) -> Result<Vec<corev1::Event>, Error> {
        let api: Api<corev1::Event> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default().fields(field_selector))
            .await
            .context(KubeSnafu)?;
        Ok(list.items)
    }
}

#[async_trait]
impl OperatorClient for KubeCluster {
    async fn get_tenant(&self, namespace: &str, name: &str) -> Result<Tenant, Error> {
        let api: Api<Tenant> = Api::namespaced(self.client.clone(), namespace);
        api.get(name).await.context(KubeSnafu)
    }

    async fn list_tenants(&self, namespace: Option<&str>) -> Result<Vec<Tenant>, Error> {
        let api: Api<Tenant> = match namespace {
            Some(namespace) => Api::namespaced(self.client.clone(), namespace),
            None => Api::all(self.client.clone()),
        };
        let list = api.list(&ListParams::default()).await.context(KubeSnafu)?;
        Ok(list.items)
    }
}
