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

//! Serves the pre-built single page application and hands everything
//! under `{subpath}api` to the API layers.

use axum::body::Body;
use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{Html, IntoResponse, Response};
use http::{StatusCode, Uri};
use tower::ServiceExt;
use tower_http::services::ServeDir;
use tracing::{debug, warn};

use crate::console::state::AppState;

const INDEX: &str = "index.html";
const DEFAULT_BASE: &str = r#"<base href="/"/>"#;
const LICENSE_MARKER: &str = r#"<meta name="minio-license" content="apgl"/>"#;

/// Probe endpoints answered by the router itself.
const PROBES: [&str; 2] = ["/healthz", "/readyz"];

pub async fn assets_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let subpath = state.context.subpath().to_string();
    let path = request.uri().path().to_string();

    if PROBES.contains(&path.as_str()) {
        return next.run(request).await;
    }

    if path.starts_with(&format!("{}api", subpath)) {
        if subpath != "/" {
            strip_subpath(&mut request, &subpath);
        }
        return next.run(request).await;
    }

    if path.trim_end_matches('/') == subpath.trim_end_matches('/') {
        return index(&state, request.uri()).await;
    }
    if path.ends_with('/') {
        return StatusCode::NOT_FOUND.into_response();
    }

    let Some(relative) = path.strip_prefix(&subpath) else {
        return index(&state, request.uri()).await;
    };
    let asset = match format!("/{}", relative).parse::<Uri>() {
        Ok(uri) => uri,
        Err(_) => return index(&state, request.uri()).await,
    };

    let uri = request.uri().clone();
    *request.uri_mut() = asset;
    let served = ServeDir::new(&state.config.assets_dir)
        .append_index_html_on_directories(false)
        .oneshot(request)
        .await;
    match served {
        Ok(response) if response.status() != StatusCode::NOT_FOUND => response.map(Body::new),
        _ => index(&state, &uri).await,
    }
}

/// Rewrites `{subpath}api/...` to `/api/...`.
fn strip_subpath(request: &mut Request, subpath: &str) {
    let Some(path_and_query) = request.uri().path_and_query() else {
        return;
    };
    let rewritten = format!("/{}", &path_and_query.as_str()[subpath.len()..]);
    match rewritten.parse::<Uri>() {
        Ok(uri) => *request.uri_mut() = uri,
        Err(e) => debug!("keeping request path '{}': {}", path_and_query, e),
    }
}

/// The application index with the base path and license plan inlined.
async fn index(state: &AppState, uri: &Uri) -> Response {
    let page = match tokio::fs::read_to_string(state.config.assets_dir.join(INDEX)).await {
        Ok(page) => page,
        Err(e) => {
            warn!("unable to read application index: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let subpath = state.context.subpath();
    let base = requested_base(uri).unwrap_or_else(|| subpath.to_string());
    let mut page = if base != "/" { replace_base(&page, &base) } else { page };

    if let Some(plan) = &state.config.marketplace {
        page = page.replacen(
            LICENSE_MARKER,
            &format!(r#"<meta name="minio-license" content="{}" />"#, plan),
            1,
        );
    }

    Html(page).into_response()
}

/// Base override requested with `cp=y&cpb=<path>`.
fn requested_base(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let first = |key: &str| pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str());

    if first("cp") != Some("y") {
        return None;
    }
    let base = first("cpb").filter(|b| !b.is_empty())?;
    Some(if base.ends_with('/') {
        base.to_string()
    } else {
        format!("{}/", base)
    })
}

fn replace_base(page: &str, base: &str) -> String {
    let valid = !base.is_empty()
        && base
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '-');
    if !valid {
        return page.to_string();
    }
    page.replacen(DEFAULT_BASE, &format!(r#"<base href="{}"/>"#, base), 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::admin::MemoryAdminConnector;
    use crate::console::cluster::MemoryCluster;
    use crate::console::state::testing;
    use axum::Router;
    use axum::routing::get;

    const PAGE: &str = r#"<html><head><base href="/"/><meta name="minio-license" content="apgl"/></head></html>"#;

    fn app(subpath: &str, plan: Option<&str>) -> (Router, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(INDEX), PAGE).unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log(1)").unwrap();
        std::fs::create_dir(dir.path().join("static")).unwrap();

        let mut config = testing::config();
        config.assets_dir = dir.path().to_path_buf();
        config.subpath = subpath.to_string();
        config.marketplace = plan.map(str::to_string);
        let state = testing::state_with(config, MemoryCluster::new(), MemoryAdminConnector::new());

        let router = Router::new()
            .route("/api/v1/echo", get(|uri: Uri| async move { format!("api:{}", uri) }))
            .layer(axum::middleware::from_fn_with_state(state.clone(), assets_middleware))
            .with_state(state);
        (router, dir)
    }

    async fn fetch(app: &Router, uri: &str) -> (StatusCode, String) {
        let request = http::Request::builder().uri(uri).body(Body::empty()).unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&body).into_owned())
    }

    #[tokio::test]
    async fn test_assets_and_application_fallback() {
        let (app, _dir) = app("/", None);

        assert_eq!(fetch(&app, "/app.js").await, (StatusCode::OK, "console.log(1)".to_string()));
        assert_eq!(fetch(&app, "/tenants/t1").await, (StatusCode::OK, PAGE.to_string()));
        assert_eq!(fetch(&app, "/").await, (StatusCode::OK, PAGE.to_string()));
        assert_eq!(fetch(&app, "/static/").await.0, StatusCode::NOT_FOUND);
        assert_eq!(fetch(&app, "/api/v1/echo?a=1").await.1, "api:/api/v1/echo?a=1");
    }

    #[tokio::test]
    async fn test_embedded_base_override() {
        let (app, _dir) = app("/", None);

        let (_, page) = fetch(&app, "/tenants?cp=y&cpb=/api/proxy/ns/t1").await;
        assert!(page.contains(r#"<base href="/api/proxy/ns/t1/"/>"#));

        let (_, rejected) = fetch(&app, "/tenants?cp=y&cpb=/x%22%3E").await;
        assert!(rejected.contains(DEFAULT_BASE));
    }

    #[tokio::test]
    async fn test_subpath_and_license_plan() {
        let (app, _dir) = app("/console", Some("aws"));

        let (status, page) = fetch(&app, "/console/").await;
        assert_eq!(status, StatusCode::OK);
        assert!(page.contains(r#"<base href="/console/"/>"#));
        assert!(page.contains(r#"<meta name="minio-license" content="aws" />"#));

        assert_eq!(fetch(&app, "/console/app.js").await.1, "console.log(1)");
        assert_eq!(fetch(&app, "/console/api/v1/echo").await.1, "api:/api/v1/echo");
    }
}
