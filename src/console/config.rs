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

use rand::Rng;
use rand::distributions::Alphanumeric;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 9090;
pub const DEFAULT_TLS_PORT: u16 = 9443;
pub const DEFAULT_SESSION_DURATION: Duration = Duration::from_secs(45 * 60);
pub const DEFAULT_SA_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";
pub const DEFAULT_SUBNET_BASE_URL: &str = "https://subnet.min.io";
pub const DEFAULT_API_KEY_SECRET_NAME: &str = "operator-subnet";
pub const DEFAULT_MP_CONFIG_MAP: &str = "mp-config";
pub const DEFAULT_MP_HOST: &str = "https://marketplace.apps.min.dev";
pub const DEFAULT_MP_EU_HOST: &str = "https://marketplace-eu.apps.min.dev";
pub const DEFAULT_IDP_SCOPES: &str = "openid,profile,email";

/// Security header policy applied by the outermost layer.
#[derive(Clone, Debug, PartialEq)]
pub struct SecureOptions {
    pub allowed_hosts: Vec<String>,
    pub allowed_hosts_are_regex: bool,
    pub frame_deny: bool,
    pub content_type_no_sniff: bool,
    pub browser_xss_filter: bool,
    pub content_security_policy: String,
    pub content_security_policy_report_only: String,
    pub hosts_proxy_headers: Vec<String>,
    pub sts_seconds: i64,
    pub sts_include_subdomains: bool,
    pub sts_preload: bool,
    pub force_sts_header: bool,
    pub tls_host: String,
    pub tls_temporary_redirect: bool,
    pub public_key: String,
    pub referrer_policy: String,
    pub feature_policy: String,
    pub expect_ct_header: String,
}

impl Default for SecureOptions {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl SecureOptions {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(&format!("OPERATOR_SECURE_{}", name));
        let flag = |name: &str, default: bool| {
            var(name)
                .map(|v| v.trim().eq_ignore_ascii_case("on"))
                .unwrap_or(default)
        };
        let text = |name: &str| var(name).unwrap_or_default();
        let list = |name: &str| split_list(&text(name));

        Self {
            allowed_hosts: list("ALLOWED_HOSTS"),
            allowed_hosts_are_regex: flag("ALLOWED_HOSTS_ARE_REGEX", false),
            frame_deny: flag("FRAME_DENY", true),
            content_type_no_sniff: flag("CONTENT_TYPE_NO_SNIFF", true),
            browser_xss_filter: flag("BROWSER_XSS_FILTER", true),
            content_security_policy: text("CONTENT_SECURITY_POLICY"),
            content_security_policy_report_only: text("CONTENT_SECURITY_POLICY_REPORT_ONLY"),
            hosts_proxy_headers: list("HOSTS_PROXY_HEADERS"),
            sts_seconds: var("STS_SECONDS")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(0),
            sts_include_subdomains: flag("STS_INCLUDE_SUB_DOMAINS", false),
            sts_preload: flag("STS_PRELOAD", false),
            force_sts_header: flag("FORCE_STS_HEADER", false),
            tls_host: text("TLS_HOST"),
            tls_temporary_redirect: flag("TLS_TEMPORARY_REDIRECT", false),
            public_key: text("PUBLIC_KEY"),
            referrer_policy: text("REFERRER_POLICY"),
            feature_policy: text("FEATURE_POLICY"),
            expect_ct_header: text("EXPECT_CT_HEADER"),
        }
    }
}

/// External identity provider settings. Present only when both the
/// discovery URL and the client id are configured.
#[derive(Clone, Debug, PartialEq)]
pub struct IdpConfig {
    pub url: String,
    pub client_id: String,
    pub secret: String,
    pub callback: String,
    pub callback_dynamic: bool,
    pub scopes: Vec<String>,
    pub userinfo: bool,
    pub hmac_passphrase: String,
    pub hmac_salt: String,
}

/// Listener settings supplied on the command line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ServerOptions {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub tls_port: Option<u16>,
    pub tls_redirect: Option<bool>,
    pub certs_dir: Option<PathBuf>,
    pub tls_certificate: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub tls_ca: Option<PathBuf>,
}

#[derive(Clone, Debug)]
pub struct ConsoleConfig {
    pub host: String,
    pub port: u16,
    pub tls_port: u16,
    pub tls_redirect: bool,
    pub certs_dir: PathBuf,
    pub tls_certificate: Option<PathBuf>,
    pub tls_key: Option<PathBuf>,
    pub tls_ca: Option<PathBuf>,
    pub subpath: String,
    pub session_duration: Duration,
    pub pbkdf_passphrase: String,
    pub pbkdf_salt: String,
    pub cluster_domain: String,
    pub in_cluster: bool,
    pub sa_token_file: PathBuf,
    pub sa_token_override: Option<String>,
    pub subnet_base_url: String,
    pub api_key_secret_name: String,
    pub mp_config_map: String,
    pub mp_host: String,
    pub mp_eu_host: String,
    pub mp_secret: String,
    pub marketplace: Option<String>,
    pub assets_dir: PathBuf,
    pub home_dir: Option<PathBuf>,
    pub secure: SecureOptions,
    pub idp: Option<IdpConfig>,
}

impl ConsoleConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let or = |name: &str, default: &str| non_empty(name).unwrap_or_else(|| default.to_string());

        let home_dir = non_empty("HOME").map(PathBuf::from);
        let pbkdf_passphrase = non_empty("CONSOLE_PBKDF_PASSPHRASE").unwrap_or_else(random_secret);
        let pbkdf_salt = non_empty("CONSOLE_PBKDF_SALT").unwrap_or_else(random_secret);

        let idp = match (non_empty("CONSOLE_IDP_URL"), non_empty("CONSOLE_IDP_CLIENT_ID")) {
            (Some(url), Some(client_id)) => Some(IdpConfig {
                url,
                client_id,
                secret: or("CONSOLE_IDP_SECRET", ""),
                callback: or("CONSOLE_IDP_CALLBACK", ""),
                callback_dynamic: is_on(&or("CONSOLE_IDP_CALLBACK_DYNAMIC", "off")),
                scopes: split_list(&or("CONSOLE_IDP_SCOPES", DEFAULT_IDP_SCOPES)),
                userinfo: is_on(&or("CONSOLE_IDP_USERINFO", "off")),
                hmac_passphrase: or("CONSOLE_IDP_HMAC_PASSPHRASE", &pbkdf_passphrase),
                hmac_salt: or("CONSOLE_IDP_HMAC_SALT", &pbkdf_salt),
            }),
            _ => None,
        };

        Self {
            host: or("OPERATOR_HOSTNAME", ""),
            port: non_empty("OPERATOR_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT),
            tls_port: non_empty("OPERATOR_TLS_PORT")
                .and_then(|v| v.trim().parse().ok())
                .unwrap_or(DEFAULT_TLS_PORT),
            tls_redirect: is_on(&or("OPERATOR_SECURE_TLS_REDIRECT", "on")),
            certs_dir: home_dir
                .as_ref()
                .map(|home| home.join(".console").join("certs"))
                .unwrap_or_else(|| PathBuf::from("certs")),
            tls_certificate: None,
            tls_key: None,
            tls_ca: None,
            subpath: or("OPERATOR_SUBPATH", "/"),
            session_duration: non_empty("CONSOLE_SESSION_DURATION")
                .and_then(|v| v.trim().parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_SESSION_DURATION),
            pbkdf_passphrase,
            pbkdf_salt,
            cluster_domain: or("CLUSTER_DOMAIN", "cluster.local"),
            in_cluster: non_empty("KUBERNETES_SERVICE_HOST").is_some(),
            sa_token_file: PathBuf::from(DEFAULT_SA_TOKEN_FILE),
            sa_token_override: non_empty("OPERATOR_SA_TOKEN"),
            subnet_base_url: or("SUBNET_BASE_URL", DEFAULT_SUBNET_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key_secret_name: or("API_KEY_SECRET_NAME", DEFAULT_API_KEY_SECRET_NAME),
            mp_config_map: or("MP_CONFIG_KEY", DEFAULT_MP_CONFIG_MAP),
            mp_host: or("MP_HOST", DEFAULT_MP_HOST),
            mp_eu_host: or("MP_EU_HOST", DEFAULT_MP_EU_HOST),
            mp_secret: or("MP_SECRET", ""),
            marketplace: non_empty("OPERATOR_MARKETPLACE"),
            assets_dir: PathBuf::from(or("OPERATOR_ASSETS_DIR", "web-app/build")),
            home_dir,
            secure: SecureOptions::from_lookup(&lookup),
            idp,
        }
    }

    /// Command-line values win over the environment.
    pub fn apply(&mut self, options: ServerOptions) {
        if let Some(host) = options.host {
            self.host = host;
        }
        if let Some(port) = options.port {
            self.port = port;
        }
        if let Some(port) = options.tls_port {
            self.tls_port = port;
        }
        if let Some(redirect) = options.tls_redirect {
            self.tls_redirect = redirect;
        }
        if let Some(dir) = options.certs_dir {
            self.certs_dir = dir;
        }
        self.tls_certificate = options.tls_certificate.or(self.tls_certificate.take());
        self.tls_key = options.tls_key.or(self.tls_key.take());
        self.tls_ca = options.tls_ca.or(self.tls_ca.take());
    }

    /// Directories and files whose certificates outbound clients trust on
    /// top of the system roots.
    pub fn ca_sources(&self) -> Vec<PathBuf> {
        let mut sources = Vec::new();
        if let Some(home) = &self.home_dir {
            sources.push(home.join(".console").join("certs").join("CAs"));
            sources.push(home.join(".minio").join("certs").join("CAs"));
        }
        sources.push(self.certs_dir.join("CAs"));
        if let Some(ca) = &self.tls_ca {
            sources.push(ca.clone());
        }
        sources
    }

    pub fn idp_enabled(&self) -> bool {
        self.idp.is_some()
    }
}

fn is_on(value: &str) -> bool {
    value.trim().eq_ignore_ascii_case("on")
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn random_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}
