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

use crate::utils::tls::{self, CertManager};
use rustls::pki_types::CertificateDer;
use snafu::{ResultExt, Snafu};
use std::collections::HashMap;
use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, OnceLock};
use tracing::debug;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("build http client for '{}': {}", host, source))]
    BuildClient { host: String, source: reqwest::Error },

    #[snafu(display("invalid CA certificate: {}", source))]
    CaCertificate { source: reqwest::Error },
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct ClientKey {
    host: String,
    follow_redirects: bool,
}

/// Process-wide state shared by every request: the subpath the console is
/// served under, the outbound HTTP client pool, the CA pool those clients
/// trust and the server certificates.
pub struct Context {
    raw_subpath: String,
    subpath: OnceLock<String>,
    http_clients: Mutex<HashMap<ClientKey, reqwest::Client>>,
    root_certificates: Vec<CertificateDer<'static>>,
    certs: Arc<CertManager>,
}

impl Context {
    pub fn new(raw_subpath: impl Into<String>, certs: CertManager, ca_sources: &[PathBuf]) -> Self {
        Self {
            raw_subpath: raw_subpath.into(),
            subpath: OnceLock::new(),
            http_clients: Mutex::new(HashMap::new()),
            root_certificates: tls::load_ca_certificates(ca_sources),
            certs: Arc::new(certs),
        }
    }

    /// Normalized subpath, always bracketed by a leading and trailing slash.
    pub fn subpath(&self) -> &str {
        self.subpath
            .get_or_init(|| normalize_subpath(&self.raw_subpath))
    }

    pub fn certs(&self) -> Arc<CertManager> {
        self.certs.clone()
    }

    /// Whether the server holds a non-empty public certificate set.
    pub fn has_public_certs(&self) -> bool {
        !self.certs.is_empty()
    }

    /// Pooled client for `host`. Certificate verification is skipped only
    /// towards loopback hosts.
    pub fn http_client(&self, host: &str) -> Result<reqwest::Client, Error> {
        self.pooled(host, true)
    }

    /// Pooled client for in-cluster tenant services. Like the loopback
    /// clients it does not verify the tenant's certificate.
    pub fn tenant_http_client(&self, follow_redirects: bool) -> Result<reqwest::Client, Error> {
        self.pooled("127.0.0.1", follow_redirects)
    }

    fn pooled(&self, host: &str, follow_redirects: bool) -> Result<reqwest::Client, Error> {
        let key = ClientKey {
            host: host.to_owned(),
            follow_redirects,
        };

        // no await happens while the pool is locked
        let mut pool = self
            .http_clients
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(client) = pool.get(&key) {
            return Ok(client.clone());
        }

        let client = self.build_client(host, follow_redirects)?;
        debug!("created http client for {}", host);
        pool.insert(key, client.clone());
        Ok(client)
    }

    fn build_client(&self, host: &str, follow_redirects: bool) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(is_loopback(host));

        if !follow_redirects {
            builder = builder.redirect(reqwest::redirect::Policy::none());
        }

        for cert in &self.root_certificates {
            builder = builder
                .add_root_certificate(reqwest::Certificate::from_der(cert).context(CaCertificateSnafu)?);
        }

        builder.build().context(BuildClientSnafu { host })
    }
}

fn is_loopback(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Normalizes a configured subpath: backslashes become slashes, `.` and
/// `..` segments are resolved, and the result carries exactly one leading
/// and one trailing slash. Blank input means `/`.
pub fn normalize_subpath(raw: &str) -> String {
    let raw = raw.trim().replace('\\', "/");

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        "/".to_string()
    } else {
        format!("/{}/", segments.join("/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_subpath() {
        assert_eq!(normalize_subpath(""), "/");
        assert_eq!(normalize_subpath("   "), "/");
        assert_eq!(normalize_subpath("/foo"), "/foo/");
        assert_eq!(normalize_subpath("foo/"), "/foo/");
        assert_eq!(normalize_subpath("foo\\bar"), "/foo/bar/");
        assert_eq!(normalize_subpath("/foo/bar/../baz/"), "/foo/baz/");
        assert_eq!(normalize_subpath("/../.."), "/");
        assert_eq!(normalize_subpath("//a//./b"), "/a/b/");
    }

    #[test]
    fn test_normalize_subpath_is_idempotent() {
        for raw in ["", "/foo", "foo/", "foo\\bar", "/foo/bar/../baz/", "a/./b/../../c"] {
            let once = normalize_subpath(raw);
            assert_eq!(normalize_subpath(&once), once);
            assert!(once.starts_with('/') && once.ends_with('/'));
            assert!(!once.starts_with("//") && !once.ends_with("//"));
        }
    }

    #[test]
    fn test_subpath_resolved_once() {
        let context = Context::new("console\\ui", CertManager::default(), &[]);
        assert_eq!(context.subpath(), "/console/ui/");
        assert!(std::ptr::eq(context.subpath(), context.subpath()));
        assert!(!context.has_public_certs());
    }

    #[test]
    fn test_is_loopback() {
        assert!(is_loopback("127.0.0.1"));
        assert!(is_loopback("[::1]"));
        assert!(is_loopback("localhost"));
        assert!(!is_loopback("minio.tenant.svc.cluster.local"));
        assert!(!is_loopback("10.0.0.1"));
    }

    #[tokio::test]
    async fn test_http_client_pool_reuses_clients() {
        let context = Context::new("/", CertManager::default(), &[]);
        context.http_client("subnet.min.io").unwrap();
        context.http_client("subnet.min.io").unwrap();
        context.tenant_http_client(false).unwrap();
        context.tenant_http_client(false).unwrap();

        assert_eq!(context.http_clients.lock().unwrap().len(), 2);
    }
}
