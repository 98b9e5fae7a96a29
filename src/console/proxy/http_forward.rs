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

use axum::body::{Body, HttpBody};
use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use snafu::ResultExt;
use tracing::warn;
use url::Url;

use super::{Error, ForwardSnafu};

const HOP_BY_HOP: [HeaderName; 6] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
];

/// Forwards one request to the tenant and streams its answer back.
pub(super) async fn forward(
    client: &reqwest::Client,
    request: Request,
    destination: Url,
    tenant_base: &str,
    token: &str,
) -> Response {
    match try_forward(client, request, destination, tenant_base, token).await {
        Ok(response) => response,
        Err(e) => {
            warn!("proxy: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn try_forward(
    client: &reqwest::Client,
    request: Request,
    mut destination: Url,
    tenant_base: &str,
    token: &str,
) -> Result<Response, Error> {
    let (parts, body) = request.into_parts();
    set_query(&mut destination, parts.uri.query(), tenant_base);

    let mut outbound = client
        .request(parts.method, destination)
        .header(header::COOKIE, format!("{}={}", crate::console::session::SESSION_COOKIE, token));
    for value in parts.headers.get_all(header::CONTENT_TYPE) {
        outbound = outbound.header(header::CONTENT_TYPE, value.clone());
    }
    if body.size_hint().exact() != Some(0) {
        outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
    }

    let upstream = outbound.send().await.context(ForwardSnafu)?;
    let status = upstream.status();
    let headers = response_headers(upstream.headers());

    let mut response = Response::new(Body::from_stream(
        upstream.bytes_stream().map_err(std::io::Error::other),
    ));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    Ok(response)
}

/// Copies the browser query and, when the tenant is embedded (`cp=y`),
/// tells it the base path it is served under.
fn set_query(destination: &mut Url, query: Option<&str>, tenant_base: &str) {
    let mut pairs: Vec<(String, String)> = query
        .map(|q| url::form_urlencoded::parse(q.as_bytes()).into_owned().collect())
        .unwrap_or_default();

    if pairs.iter().find(|(k, _)| k == "cp").is_some_and(|(_, v)| v == "y") {
        pairs.push(("cpb".to_string(), tenant_base.to_string()));
    }

    if pairs.is_empty() {
        destination.set_query(None);
        return;
    }
    pairs.sort_by(|a, b| a.0.cmp(&b.0));
    destination.query_pairs_mut().clear().extend_pairs(pairs);
}

fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len() + 2);
    for (name, value) in upstream {
        if name == header::X_FRAME_OPTIONS || HOP_BY_HOP.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("SAMEORIGIN"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string, header as header_is, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_embedded_tenant_gets_its_base_path() {
        let mut url = Url::parse("https://t1-console.ns.svc.cluster.local:9443/api/v1/buckets").unwrap();
        set_query(&mut url, Some("cp=y&b=1"), "/api/proxy/ns/t1");
        assert_eq!(
            url.as_str(),
            "https://t1-console.ns.svc.cluster.local:9443/api/v1/buckets?b=1&cp=y&cpb=%2Fapi%2Fproxy%2Fns%2Ft1"
        );

        let mut plain = Url::parse("http://t1/api/v1/buckets").unwrap();
        set_query(&mut plain, None, "/api/proxy/ns/t1");
        assert_eq!(plain.query(), None);
    }

    #[test]
    fn test_frame_options_are_overridden() {
        let mut upstream = HeaderMap::new();
        upstream.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
        upstream.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        upstream.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));

        let headers = response_headers(&upstream);
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
        assert_eq!(headers[header::X_XSS_PROTECTION], "1; mode=block");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert!(headers.get(header::TRANSFER_ENCODING).is_none());
    }

    #[tokio::test]
    async fn test_forward_keeps_method_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/api/v1/buckets/b1/quota"))
            .and(query_param("cp", "y"))
            .and(query_param("cpb", "/api/hop/ns/t1"))
            .and(header_is("cookie", "token=abc"))
            .and(header_is("content-type", "application/json"))
            .and(body_string(r#"{"enabled":true}"#))
            .respond_with(
                ResponseTemplate::new(302)
                    .append_header("location", "/elsewhere")
                    .set_body_string("moved"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = http::Request::builder()
            .method("PUT")
            .uri("/api/hop/ns/t1/api/v1/buckets/b1/quota?cp=y")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::AUTHORIZATION, "Bearer not-forwarded")
            .body(Body::from(r#"{"enabled":true}"#))
            .unwrap();
        let destination = Url::parse(&format!("{}/api/v1/buckets/b1/quota", server.uri())).unwrap();
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        let response = forward(&client, request, destination, "/api/hop/ns/t1", "abc").await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/elsewhere");

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"moved");
    }
}
