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
use axum::Json;
use axum::extract::{Path, State};
use snafu::ResultExt;

use crate::console::error::{ClusterSnafu, ReportSnafu, Result};
use crate::console::middleware::auth::Principal;
use crate::console::models::tenant::*;
use crate::console::report::{self, TenantReport};
use crate::console::state::AppState;
use crate::types::v2::tenant::Tenant;

use super::cluster_clients;

const UNKNOWN_STATE: &str = "Unknown";

/// Lists every tenant the principal can see.
pub async fn list_tenants(State(state): State<AppState>, principal: Principal) -> Result<Json<TenantListResponse>> {
    let clients = cluster_clients(&state, &principal).await?;
    let tenants = clients.operator.list_tenants(None).await.context(ClusterSnafu)?;

    let items: Vec<TenantListItem> = tenants.iter().map(list_item).collect();
    Ok(Json(TenantListResponse {
        total: items.len(),
        tenants: items,
    }))
}

pub async fn get_tenant(
    State(state): State<AppState>,
    principal: Principal,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<TenantDetailsResponse>> {
    let clients = cluster_clients(&state, &principal).await?;
    let tenant = clients
        .operator
        .get_tenant(&namespace, &name)
        .await
        .context(ClusterSnafu)?;

    let status = tenant.status.clone().unwrap_or_default();
    Ok(Json(TenantDetailsResponse {
        name: tenant.name(),
        namespace: tenant.namespace().unwrap_or(namespace),
        image: tenant.spec.image.clone(),
        pools: tenant
            .spec
            .pools
            .iter()
            .map(|p| PoolInfo {
                name: p.name.clone(),
                servers: p.servers,
                volumes_per_server: p.volumes_per_server,
            })
            .collect(),
        current_state: current_state(&tenant),
        health_status: status.health_status,
        drives_online: status.drives_online,
        drives_offline: status.drives_offline,
        write_quorum: status.write_quorum,
        creation_date: creation_date(&tenant),
    }))
}

/// Zipped support bundle of the tenant and its pods.
pub async fn tenant_report(
    State(state): State<AppState>,
    principal: Principal,
    Path((namespace, name)): Path<(String, String)>,
) -> Result<Json<TenantReport>> {
    let clients = cluster_clients(&state, &principal).await?;
    let report = report::tenant_report(&clients, &namespace, &name)
        .await
        .context(ReportSnafu)?;
    Ok(Json(report))
}

pub async fn list_namespaces(State(state): State<AppState>, principal: Principal) -> Result<Json<NamespaceListResponse>> {
    let clients = cluster_clients(&state, &principal).await?;
    let namespaces = clients.core.list_namespaces().await.context(ClusterSnafu)?;

    Ok(Json(NamespaceListResponse {
        namespaces: namespaces.into_iter().filter_map(|ns| ns.metadata.name).collect(),
    }))
}

fn list_item(tenant: &Tenant) -> TenantListItem {
    TenantListItem {
        name: tenant.name(),
        namespace: tenant.namespace().unwrap_or_default(),
        pool_count: tenant.spec.pools.len(),
        total_drives: tenant.spec.pools.iter().map(|p| p.drives()).sum(),
        current_state: current_state(tenant),
        health_status: tenant.status.as_ref().and_then(|s| s.health_status.clone()),
        creation_date: creation_date(tenant),
    }
}

fn current_state(tenant: &Tenant) -> String {
    tenant
        .status
        .as_ref()
        .map(|s| s.current_state.clone())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| UNKNOWN_STATE.to_string())
}

fn creation_date(tenant: &Tenant) -> Option<String> {
    tenant
        .metadata
        .creation_timestamp
        .as_ref()
        .map(|ts| ts.0.to_rfc3339())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::cluster::MemoryCluster;
    use crate::console::error::ErrorResponse;
    use crate::console::server;
    use crate::console::state::testing;
    use crate::tests::create_test_tenant;
    use crate::types::v2::status::TenantStatus;
    use axum::body::Body;
    use axum::http::{StatusCode, header};
    use tower::ServiceExt;

    async fn get(state: &AppState, uri: &str, token: &str) -> (StatusCode, bytes::Bytes) {
        let request = http::Request::builder()
            .uri(uri)
            .header(header::COOKIE, testing::session_cookie(state, token))
            .body(Body::empty())
            .unwrap();
        let response = server::router(state.clone()).oneshot(request).await.unwrap();
        let status = response.status();
        (status, axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap())
    }

    fn cluster() -> MemoryCluster {
        let mut healthy = create_test_tenant("t1", "ns-a");
        healthy.status = Some(TenantStatus {
            current_state: "Initialized".to_string(),
            health_status: Some("green".to_string()),
            ..Default::default()
        });
        MemoryCluster::new()
            .with_token("admin")
            .with_namespace("ns-a")
            .with_namespace("ns-b")
            .with_tenant(healthy)
            .with_tenant(create_test_tenant("t2", "ns-b"))
    }

    #[tokio::test]
    async fn test_list_tenants() {
        let state = testing::state(cluster());
        let (status, body) = get(&state, "/api/v1/tenants", "admin").await;
        assert_eq!(status, StatusCode::OK);

        let list: TenantListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.total, 2);
        let t1 = list.tenants.iter().find(|t| t.name == "t1").unwrap();
        assert_eq!(t1.namespace, "ns-a");
        assert_eq!(t1.total_drives, 16);
        assert_eq!(t1.current_state, "Initialized");
        let t2 = list.tenants.iter().find(|t| t.name == "t2").unwrap();
        assert_eq!(t2.current_state, "Unknown");
    }

    #[tokio::test]
    async fn test_get_tenant() {
        let state = testing::state(cluster());
        let (status, body) = get(&state, "/api/v1/namespaces/ns-a/tenants/t1", "admin").await;
        assert_eq!(status, StatusCode::OK);
        let details: TenantDetailsResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(details.pools.len(), 1);
        assert_eq!(details.health_status.as_deref(), Some("green"));

        let (status, body) = get(&state, "/api/v1/namespaces/ns-a/tenants/missing", "admin").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.message, "not found");
    }

    #[tokio::test]
    async fn test_report_route() {
        let state = testing::state(cluster());
        let (status, body) = get(&state, "/api/v1/namespaces/ns-a/tenants/t1/report", "admin").await;
        assert_eq!(status, StatusCode::OK);
        let report: TenantReport = serde_json::from_slice(&body).unwrap();
        assert_eq!(report.filename, "t1-report.zip");
        assert!(!report.blob.is_empty());
    }

    #[tokio::test]
    async fn test_list_namespaces() {
        let state = testing::state(cluster());
        let (status, body) = get(&state, "/api/v1/namespaces", "admin").await;
        assert_eq!(status, StatusCode::OK);
        let list: NamespaceListResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(list.namespaces, vec!["ns-a".to_string(), "ns-b".to_string()]);
    }

    #[tokio::test]
    async fn test_foreign_bearer_is_refused() {
        let state = testing::state(cluster());
        let (status, _) = get(&state, "/api/v1/tenants", "stranger").await;
        assert!(status.is_client_error());
    }
}
