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
use axum::{
    Router,
    routing::{get, post},
};

use crate::console::{handlers, state::AppState};

/// Every REST route, mounted under `/api/v1`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(auth_routes())
        .merge(tenant_routes())
        .merge(cluster_routes())
        .merge(subnet_routes())
        .merge(marketplace_routes())
}

/// Login, logout and session routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(handlers::auth::login_detail))
        .route("/login/operator", post(handlers::auth::login))
        .route("/login/oauth2/auth", post(handlers::auth::login_oauth2))
        .route("/logout", post(handlers::auth::logout))
        .route("/session", get(handlers::auth::session))
}

pub fn tenant_routes() -> Router<AppState> {
    Router::new()
        .route("/tenants", get(handlers::tenants::list_tenants))
        .route(
            "/namespaces/{namespace}/tenants/{tenant}",
            get(handlers::tenants::get_tenant),
        )
        .route(
            "/namespaces/{namespace}/tenants/{tenant}/report",
            get(handlers::tenants::tenant_report),
        )
}

pub fn cluster_routes() -> Router<AppState> {
    Router::new()
        .route("/namespaces", get(handlers::tenants::list_namespaces))
        .route(
            "/get-parity/{nodes}/{disks_per_node}",
            get(handlers::cluster::get_parity),
        )
}

/// Licensing routes
pub fn subnet_routes() -> Router<AppState> {
    Router::new()
        .route("/subnet/login", post(handlers::subnet::login))
        .route("/subnet/login/mfa", post(handlers::subnet::login_mfa))
        .route("/subnet/apikey", get(handlers::subnet::api_key))
        .route("/subnet/apikey/register", post(handlers::subnet::register))
        .route("/subnet/apikey/info", get(handlers::subnet::api_key_info))
}

pub fn marketplace_routes() -> Router<AppState> {
    Router::new().route(
        "/mp-integration",
        get(handlers::marketplace::get_mp_integration).post(handlers::marketplace::post_mp_integration),
    )
}
