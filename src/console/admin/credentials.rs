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

//! Root credentials of a tenant, read from its configuration secret.

use k8s_openapi::api::core::v1 as corev1;
use snafu::ResultExt;
use std::collections::BTreeMap;

use super::{ClusterSnafu, Credentials, Error, TenantSnafu};
use crate::console::cluster::CoreClient;
use crate::types::v2::tenant::Tenant;

pub const CONFIG_ENV_KEY: &str = "config.env";
pub const ACCESS_KEY: &str = "accesskey";
pub const SECRET_KEY: &str = "secretkey";

const ROOT_USER: &str = "MINIO_ROOT_USER";
const ROOT_PASSWORD: &str = "MINIO_ROOT_PASSWORD";
const LEGACY_ACCESS_KEY: &str = "MINIO_ACCESS_KEY";
const LEGACY_SECRET_KEY: &str = "MINIO_SECRET_KEY";

/// Parses `export NAME=value` lines. Values may be bare or double quoted.
pub fn parse_config_env(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .filter_map(|line| {
            let line = line.trim();
            let line = line.strip_prefix("export ").unwrap_or(line).trim_start();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (name, value) = line.split_once('=')?;
            Some((name.trim().to_string(), unquote(value.trim())))
        })
        .collect()
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn secret_value(secret: &corev1::Secret, key: &str) -> Option<String> {
    if let Some(value) = secret.data.as_ref().and_then(|d| d.get(key)) {
        return Some(String::from_utf8_lossy(&value.0).into_owned());
    }
    secret
        .string_data
        .as_ref()
        .and_then(|d| d.get(key))
        .cloned()
}

/// Environment of the tenant: its spec env, overlaid with the variables of
/// the configuration secret. Root credentials are mirrored under
/// `accesskey` and `secretkey`.
pub async fn tenant_configuration(
    core: &dyn CoreClient,
    tenant: &Tenant,
) -> Result<BTreeMap<String, String>, Error> {
    let mut config: BTreeMap<String, String> = tenant
        .spec
        .env
        .iter()
        .filter_map(|env| env.value.clone().map(|v| (env.name.clone(), v)))
        .collect();

    if let Some(secret_name) = tenant.configuration_secret_name() {
        let namespace = tenant.namespace().context(TenantSnafu)?;
        let secret = core
            .get_secret(&namespace, secret_name)
            .await
            .context(ClusterSnafu)?;
        if let Some(raw) = secret_value(&secret, CONFIG_ENV_KEY) {
            config.extend(parse_config_env(&raw));
        }
    }

    let access = config
        .get(ROOT_USER)
        .or_else(|| config.get(LEGACY_ACCESS_KEY))
        .cloned();
    let secret = config
        .get(ROOT_PASSWORD)
        .or_else(|| config.get(LEGACY_SECRET_KEY))
        .cloned();
    if let Some(access) = access {
        config.insert(ACCESS_KEY.to_string(), access);
    }
    if let Some(secret) = secret {
        config.insert(SECRET_KEY.to_string(), secret);
    }

    Ok(config)
}

/// Root credentials from the configuration secret, falling back to the
/// legacy credentials secret.
pub async fn tenant_credentials(
    core: &dyn CoreClient,
    tenant: &Tenant,
) -> Result<Credentials, Error> {
    let config = tenant_configuration(core, tenant).await?;
    if let (Some(access_key), Some(secret_key)) = (config.get(ACCESS_KEY), config.get(SECRET_KEY)) {
        return Ok(Credentials {
            access_key: access_key.clone(),
            secret_key: secret_key.clone(),
        });
    }

    if let Some(creds_name) = tenant.creds_secret_name() {
        let namespace = tenant.namespace().context(TenantSnafu)?;
        let secret = core
            .get_secret(&namespace, creds_name)
            .await
            .context(ClusterSnafu)?;
        if let (Some(access_key), Some(secret_key)) = (
            secret_value(&secret, ACCESS_KEY),
            secret_value(&secret, SECRET_KEY),
        ) {
            return Ok(Credentials {
                access_key,
                secret_key,
            });
        }
    }

    Err(Error::MissingCredentials)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::cluster::{ClusterFactory, MemoryCluster};
    use crate::tests::create_test_tenant;
    use k8s_openapi::ByteString;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;

    const CONFIG: &str = r#"
export MINIO_ROOT_USER=minio
export MINIO_ROOT_PASSWORD="minio123"
export MINIO_IDENTITY_LDAP_USER_DN_SEARCH_FILTER="(uid=%s)"
export MINIO_NOTE="say \"hi\""
"#;

    fn secret(name: &str, data: &[(&str, &str)]) -> corev1::Secret {
        corev1::Secret {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            data: Some(
                data.iter()
                    .map(|(k, v)| (k.to_string(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Default::default()
        }
    }

    fn tenant(configuration: Option<&str>, creds: Option<&str>) -> Tenant {
        let mut tenant = create_test_tenant("t", "ns");
        tenant.spec.configuration = configuration.map(|n| corev1::LocalObjectReference {
            name: n.to_string(),
        });
        tenant.spec.creds_secret = creds.map(|n| corev1::LocalObjectReference {
            name: n.to_string(),
        });
        tenant
    }

    #[test]
    fn test_parse_config_env() {
        let vars = parse_config_env(CONFIG);

        assert_eq!(vars["MINIO_ROOT_USER"], "minio");
        assert_eq!(vars["MINIO_ROOT_PASSWORD"], "minio123");
        assert_eq!(vars["MINIO_IDENTITY_LDAP_USER_DN_SEARCH_FILTER"], "(uid=%s)");
        assert_eq!(vars["MINIO_NOTE"], "say \"hi\"");
        assert_eq!(
            parse_config_env("export A=\"back\\\\slash\"\nexport B=plain\n"),
            BTreeMap::from([
                ("A".to_string(), "back\\slash".to_string()),
                ("B".to_string(), "plain".to_string()),
            ])
        );
    }

    #[tokio::test]
    async fn test_credentials_from_configuration() {
        let cluster = MemoryCluster::new()
            .with_token("t")
            .with_secret(secret("t-env", &[(CONFIG_ENV_KEY, CONFIG)]));
        let clients = cluster.for_token("t").await.unwrap();

        let credentials = tenant_credentials(clients.core.as_ref(), &tenant(Some("t-env"), None))
            .await
            .unwrap();
        assert_eq!(credentials.access_key, "minio");
        assert_eq!(credentials.secret_key, "minio123");
    }

    #[tokio::test]
    async fn test_legacy_names_and_creds_secret() {
        let legacy = "export MINIO_ACCESS_KEY=old\nexport MINIO_SECRET_KEY=older\n";
        let cluster = MemoryCluster::new()
            .with_token("t")
            .with_secret(secret("legacy-env", &[(CONFIG_ENV_KEY, legacy)]))
            .with_secret(secret("empty-env", &[(CONFIG_ENV_KEY, "")]))
            .with_secret(secret("creds", &[(ACCESS_KEY, "a"), (SECRET_KEY, "s")]));
        let clients = cluster.for_token("t").await.unwrap();
        let core = clients.core.as_ref();

        let legacy = tenant_credentials(core, &tenant(Some("legacy-env"), None))
            .await
            .unwrap();
        assert_eq!(legacy.access_key, "old");

        let fallback = tenant_credentials(core, &tenant(Some("empty-env"), Some("creds")))
            .await
            .unwrap();
        assert_eq!(fallback.secret_key, "s");

        let missing = tenant_credentials(core, &tenant(Some("empty-env"), None)).await;
        assert!(matches!(missing, Err(Error::MissingCredentials)));
    }

    #[tokio::test]
    async fn test_spec_env_is_overlaid() {
        let cluster = MemoryCluster::new()
            .with_token("t")
            .with_secret(secret("t-env", &[(CONFIG_ENV_KEY, CONFIG)]));
        let clients = cluster.for_token("t").await.unwrap();
        let mut tenant = tenant(Some("t-env"), None);
        tenant.spec.env = vec![
            corev1::EnvVar {
                name: "MINIO_KMS_SECRET_KEY".to_string(),
                value: Some("k".to_string()),
                ..Default::default()
            },
            corev1::EnvVar {
                name: "MINIO_ROOT_USER".to_string(),
                value: Some("from-spec".to_string()),
                ..Default::default()
            },
        ];

        let config = tenant_configuration(clients.core.as_ref(), &tenant)
            .await
            .unwrap();
        assert_eq!(config["MINIO_KMS_SECRET_KEY"], "k");
        assert_eq!(config[ACCESS_KEY], "minio");
    }
}
