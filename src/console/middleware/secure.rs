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

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use http::header::{self, HeaderName};
use http::{HeaderMap, HeaderValue, StatusCode};
use regex::Regex;
use std::sync::Arc;
use tracing::warn;

use super::ConnectionInfo;
use crate::console::config::SecureOptions;

const PUBLIC_KEY_PINS: HeaderName = HeaderName::from_static("public-key-pins");
const FEATURE_POLICY: HeaderName = HeaderName::from_static("feature-policy");
const EXPECT_CT: HeaderName = HeaderName::from_static("expect-ct");

/// Compiled form of [`SecureOptions`].
#[derive(Debug)]
pub struct SecurePolicy {
    options: SecureOptions,
    host_patterns: Vec<Regex>,
    /// TLS port to redirect plain requests to, when redirection applies.
    redirect_port: Option<u16>,
}

impl SecurePolicy {
    /// `redirect_port` is set only when the server holds public
    /// certificates and redirection is enabled.
    pub fn new(options: SecureOptions, redirect_port: Option<u16>) -> Self {
        let host_patterns = if options.allowed_hosts_are_regex {
            options
                .allowed_hosts
                .iter()
                .filter_map(|pattern| match Regex::new(&format!("^{}$", pattern)) {
                    Ok(regex) => Some(regex),
                    Err(e) => {
                        warn!("ignoring allowed host pattern '{}': {}", pattern, e);
                        None
                    }
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            options,
            host_patterns,
            redirect_port,
        }
    }

    fn host_allowed(&self, host: &str) -> bool {
        if self.options.allowed_hosts.is_empty() {
            return true;
        }
        if self.options.allowed_hosts_are_regex {
            self.host_patterns.iter().any(|re| re.is_match(host))
        } else {
            self.options
                .allowed_hosts
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(host))
        }
    }

    /// Host the client addressed, preferring the configured proxy headers.
    fn effective_host(&self, request: &Request) -> String {
        let headers = request.headers();
        self.options
            .hosts_proxy_headers
            .iter()
            .filter_map(|name| headers.get(name.as_str()))
            .chain(headers.get(header::HOST))
            .filter_map(|value| value.to_str().ok())
            .find(|value| !value.is_empty())
            .map(str::to_string)
            .or_else(|| request.uri().authority().map(|a| a.to_string()))
            .unwrap_or_default()
    }

    fn redirect_target(&self, host: &str, port: u16, request: &Request) -> String {
        let host = if self.options.tls_host.is_empty() {
            let name = host.rsplit_once(':').map_or(host, |(name, _)| name);
            if port == 443 {
                name.to_string()
            } else {
                format!("{}:{}", name, port)
            }
        } else {
            self.options.tls_host.clone()
        };
        let path = request
            .uri()
            .path_and_query()
            .map_or("/", |pq| pq.as_str());
        format!("https://{}{}", host, path)
    }

    fn apply(&self, headers: &mut HeaderMap, tls: bool) {
        let options = &self.options;
        let mut set = |name: HeaderName, value: &str| {
            if value.is_empty() {
                return;
            }
            if let Ok(value) = HeaderValue::from_str(value) {
                headers.entry(name).or_insert(value);
            }
        };

        if options.frame_deny {
            set(header::X_FRAME_OPTIONS, "DENY");
        }
        if options.content_type_no_sniff {
            set(header::X_CONTENT_TYPE_OPTIONS, "nosniff");
        }
        if options.browser_xss_filter {
            set(header::X_XSS_PROTECTION, "1; mode=block");
        }
        if options.sts_seconds > 0 && (tls || options.force_sts_header) {
            let mut sts = format!("max-age={}", options.sts_seconds);
            if options.sts_include_subdomains {
                sts.push_str("; includeSubDomains");
            }
            if options.sts_preload {
                sts.push_str("; preload");
            }
            set(header::STRICT_TRANSPORT_SECURITY, &sts);
        }
        set(header::CONTENT_SECURITY_POLICY, &options.content_security_policy);
        set(
            header::CONTENT_SECURITY_POLICY_REPORT_ONLY,
            &options.content_security_policy_report_only,
        );
        set(header::REFERRER_POLICY, &options.referrer_policy);
        set(FEATURE_POLICY, &options.feature_policy);
        set(PUBLIC_KEY_PINS, &options.public_key);
        set(EXPECT_CT, &options.expect_ct_header);
    }
}

pub async fn secure_middleware(
    State(policy): State<Arc<SecurePolicy>>,
    request: Request,
    next: Next,
) -> Response {
    let tls = request
        .extensions()
        .get::<ConnectionInfo>()
        .is_some_and(|info| info.tls);
    let host = policy.effective_host(&request);

    if !policy.host_allowed(&host) {
        warn!("rejecting request for host '{}'", host);
        return (StatusCode::BAD_REQUEST, "Bad Host").into_response();
    }

    if let (false, Some(port)) = (tls, policy.redirect_port) {
        let target = policy.redirect_target(&host, port, &request);
        let status = if policy.options.tls_temporary_redirect {
            StatusCode::TEMPORARY_REDIRECT
        } else {
            StatusCode::MOVED_PERMANENTLY
        };
        return (status, [(header::LOCATION, target)]).into_response();
    }

    let mut response = next.run(request).await;
    policy.apply(response.headers_mut(), tls);
    response
}
