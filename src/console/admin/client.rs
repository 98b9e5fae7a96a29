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
use bytes::Bytes;
use chrono::Utc;
use futures::TryStreamExt;
use reqwest::{Method, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use snafu::ResultExt;
use std::collections::BTreeMap;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

use super::types::*;
use super::{
    Credentials, CryptoSnafu, DecodeSnafu, Error, EventStream, SignSnafu, StreamSnafu, TenantAdmin,
    TransportSnafu, UrlSnafu, crypto, signer,
};

const ADMIN_PREFIX: [&str; 3] = ["minio", "admin", "v3"];
const CONFIG_APPLIED_HEADER: &str = "x-minio-config-applied";
const STREAM_BUFFER: usize = 64;

/// Admin API over HTTP(S), signing every request with the tenant's root
/// credentials.
pub struct HttpAdmin {
    client: reqwest::Client,
    endpoint: Url,
    credentials: Credentials,
}

impl HttpAdmin {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        credentials: Credentials,
    ) -> Result<Self, Error> {
        let endpoint = Url::parse(endpoint).context(UrlSnafu { url: endpoint })?;
        if endpoint.cannot_be_a_base() {
            return Err(Error::Url {
                url: endpoint.to_string(),
                source: url::ParseError::RelativeUrlWithCannotBeABaseBase,
            });
        }
        Ok(Self {
            client,
            endpoint,
            credentials,
        })
    }

    fn url(&self, path: &[&str], query: &[(&str, &str)]) -> Url {
        let mut url = self.endpoint.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.clear().extend(ADMIN_PREFIX).extend(path);
        }
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        url
    }

    async fn execute(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: Vec<u8>,
    ) -> Result<Response, Error> {
        let url = self.url(path, query);
        let headers = signer::sign(method.as_str(), &url, &body, &self.credentials, Utc::now())
            .context(SignSnafu)?;

        debug!("admin {} {}", method, url.path());
        let mut request = self.client.request(method, url).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }

        let response = request.send().await.context(TransportSnafu)?;
        if response.status().is_success() {
            Ok(response)
        } else {
            Err(remote_error(response).await)
        }
    }

    async fn call(&self, method: Method, path: &[&str], query: &[(&str, &str)]) -> Result<(), Error> {
        self.execute(method, path, query, Vec::new()).await?;
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, Error> {
        let response = self.execute(Method::GET, path, query, Vec::new()).await?;
        decode_json(response).await
    }

    async fn get_encrypted(&self, path: &[&str], query: &[(&str, &str)]) -> Result<Vec<u8>, Error> {
        let response = self.execute(Method::GET, path, query, Vec::new()).await?;
        let sealed = response.bytes().await.context(TransportSnafu)?;
        crypto::decrypt_data(&self.credentials.secret_key, &sealed).context(CryptoSnafu)
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: &T,
    ) -> Result<Response, Error> {
        let body = serde_json::to_vec(body).context(DecodeSnafu)?;
        self.execute(method, path, query, body).await
    }

    async fn send_encrypted(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        plaintext: &[u8],
    ) -> Result<Response, Error> {
        let body =
            crypto::encrypt_data(&self.credentials.secret_key, plaintext).context(CryptoSnafu)?;
        self.execute(method, path, query, body).await
    }

    async fn send_encrypted_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        body: &T,
    ) -> Result<Response, Error> {
        let plaintext = serde_json::to_vec(body).context(DecodeSnafu)?;
        self.send_encrypted(method, path, query, &plaintext).await
    }

    /// Newline-delimited JSON events pumped by a background task until the
    /// tenant closes the stream, the receiver is dropped or `cancel` fires.
    async fn stream(
        &self,
        method: Method,
        path: &[&str],
        query: &[(&str, &str)],
        cancel: CancellationToken,
    ) -> Result<EventStream, Error> {
        let response = self.execute(method, path, query, Vec::new()).await?;
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            let body = response.bytes_stream().map_err(std::io::Error::other);
            let mut lines = StreamReader::new(body).lines();
            loop {
                let line = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    line = lines.next_line() => line,
                };
                let event = match line {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => serde_json::from_str::<Value>(&line).context(DecodeSnafu),
                    Ok(None) => break,
                    Err(source) => {
                        let _ = tx.send(Err(Error::Stream { source })).await;
                        break;
                    }
                };
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("admin event stream closed");
        });

        Ok(rx)
    }
}

async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, Error> {
    let body = response.bytes().await.context(TransportSnafu)?;
    serde_json::from_slice(&body).context(DecodeSnafu)
}

fn decode_slice<T: DeserializeOwned>(body: &[u8]) -> Result<T, Error> {
    serde_json::from_slice(body).context(DecodeSnafu)
}

fn restart_required(response: &Response) -> bool {
    response
        .headers()
        .get(CONFIG_APPLIED_HEADER)
        .and_then(|v| v.to_str().ok())
        != Some("true")
}

async fn remote_error(response: Response) -> Error {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();

    match serde_json::from_slice::<RemoteError>(&body) {
        Ok(remote) if !remote.code.is_empty() => Error::Remote {
            status: status.as_u16(),
            message: if remote.message.is_empty() {
                remote.code.clone()
            } else {
                remote.message
            },
            code: remote.code,
        },
        _ => Error::Remote {
            status: status.as_u16(),
            code: String::new(),
            message: if body.is_empty() {
                status.to_string()
            } else {
                String::from_utf8_lossy(&body).into_owned()
            },
        },
    }
}

fn flag(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

#[async_trait]
impl TenantAdmin for HttpAdmin {
    async fn server_info(&self) -> Result<InfoMessage, Error> {
        self.get_json(&["info"], &[]).await
    }

    async fn get_config_kv(&self, key: &str) -> Result<String, Error> {
        let plain = self.get_encrypted(&["get-config-kv"], &[("key", key)]).await?;
        Ok(String::from_utf8_lossy(&plain).into_owned())
    }

    async fn set_config_kv(&self, kv: &str) -> Result<bool, Error> {
        let response = self
            .send_encrypted(Method::PUT, &["set-config-kv"], &[], kv.as_bytes())
            .await?;
        Ok(restart_required(&response))
    }

    async fn del_config_kv(&self, kv: &str) -> Result<(), Error> {
        self.send_encrypted(Method::DELETE, &["del-config-kv"], &[], kv.as_bytes())
            .await?;
        Ok(())
    }

    async fn help_config_kv(&self, sub_sys: &str, key: &str, env_only: bool) -> Result<Value, Error> {
        let env = if env_only { "true" } else { "" };
        self.get_json(
            &["help-config-kv"],
            &[("subSys", sub_sys), ("key", key), ("envOnly", env)],
        )
        .await
    }

    async fn service_restart(&self) -> Result<(), Error> {
        self.call(Method::POST, &["service"], &[("action", "restart")])
            .await
    }

    async fn list_users(&self) -> Result<BTreeMap<String, UserInfo>, Error> {
        let plain = self.get_encrypted(&["list-users"], &[]).await?;
        decode_slice(&plain)
    }

    async fn add_user(&self, access_key: &str, secret_key: &str) -> Result<(), Error> {
        let body = json!({"secretKey": secret_key, "status": AccountStatus::Enabled});
        self.send_encrypted_json(Method::PUT, &["add-user"], &[("accessKey", access_key)], &body)
            .await?;
        Ok(())
    }

    async fn remove_user(&self, access_key: &str) -> Result<(), Error> {
        self.call(Method::DELETE, &["remove-user"], &[("accessKey", access_key)])
            .await
    }

    async fn get_user_info(&self, access_key: &str) -> Result<UserInfo, Error> {
        self.get_json(&["user-info"], &[("accessKey", access_key)])
            .await
    }

    async fn set_user_status(&self, access_key: &str, status: AccountStatus) -> Result<(), Error> {
        let status = status.to_string();
        self.call(
            Method::PUT,
            &["set-user-status"],
            &[("accessKey", access_key), ("status", status.as_str())],
        )
        .await
    }

    async fn change_password(&self, access_key: &str, secret_key: &str) -> Result<(), Error> {
        self.add_user(access_key, secret_key).await
    }

    async fn list_groups(&self) -> Result<Vec<String>, Error> {
        let groups: Option<Vec<String>> = self.get_json(&["groups"], &[]).await?;
        Ok(groups.unwrap_or_default())
    }

    async fn update_group_members(&self, request: &GroupAddRemove) -> Result<(), Error> {
        self.send_json(Method::PUT, &["update-group-members"], &[], request)
            .await?;
        Ok(())
    }

    async fn get_group_description(&self, group: &str) -> Result<GroupDesc, Error> {
        self.get_json(&["group"], &[("group", group)]).await
    }

    async fn set_group_status(&self, group: &str, status: AccountStatus) -> Result<(), Error> {
        let status = status.to_string();
        self.call(
            Method::PUT,
            &["set-group-status"],
            &[("group", group), ("status", status.as_str())],
        )
        .await
    }

    async fn list_policies(&self) -> Result<BTreeMap<String, Value>, Error> {
        self.get_json(&["list-canned-policies"], &[]).await
    }

    async fn get_policy(&self, name: &str) -> Result<Value, Error> {
        self.get_json(&["info-canned-policy"], &[("name", name)])
            .await
    }

    async fn add_policy(&self, name: &str, policy: &Value) -> Result<(), Error> {
        self.send_json(Method::PUT, &["add-canned-policy"], &[("name", name)], policy)
            .await?;
        Ok(())
    }

    async fn remove_policy(&self, name: &str) -> Result<(), Error> {
        self.call(Method::DELETE, &["remove-canned-policy"], &[("name", name)])
            .await
    }

    async fn set_policy(&self, policy: &str, entity: &str, is_group: bool) -> Result<(), Error> {
        self.call(
            Method::PUT,
            &["set-user-or-group-policy"],
            &[
                ("policyName", policy),
                ("userOrGroup", entity),
                ("isGroup", flag(is_group)),
            ],
        )
        .await
    }

    async fn add_service_account(
        &self,
        request: &AddServiceAccountReq,
    ) -> Result<ServiceAccountCredentials, Error> {
        #[derive(serde::Deserialize)]
        struct Created {
            credentials: ServiceAccountCredentials,
        }

        let response = self
            .send_encrypted_json(Method::PUT, &["add-service-account"], &[], request)
            .await?;
        let sealed = response.bytes().await.context(TransportSnafu)?;
        let plain =
            crypto::decrypt_data(&self.credentials.secret_key, &sealed).context(CryptoSnafu)?;
        Ok(decode_slice::<Created>(&plain)?.credentials)
    }

    async fn list_service_accounts(&self, user: &str) -> Result<ListServiceAccountsResp, Error> {
        let plain = self
            .get_encrypted(&["list-service-accounts"], &[("user", user)])
            .await?;
        decode_slice(&plain)
    }

    async fn info_service_account(&self, access_key: &str) -> Result<InfoServiceAccountResp, Error> {
        let plain = self
            .get_encrypted(&["info-service-account"], &[("accessKey", access_key)])
            .await?;
        decode_slice(&plain)
    }

    async fn update_service_account(
        &self,
        access_key: &str,
        request: &UpdateServiceAccountReq,
    ) -> Result<(), Error> {
        self.send_encrypted_json(
            Method::POST,
            &["update-service-account"],
            &[("accessKey", access_key)],
            request,
        )
        .await?;
        Ok(())
    }

    async fn delete_service_account(&self, access_key: &str) -> Result<(), Error> {
        self.call(
            Method::DELETE,
            &["delete-service-account"],
            &[("accessKey", access_key)],
        )
        .await
    }

    async fn account_info(&self) -> Result<AccountInfo, Error> {
        self.get_json(&["accountinfo"], &[]).await
    }

    async fn heal(&self, request: &HealRequest) -> Result<Value, Error> {
        let mut path = vec!["heal"];
        if !request.bucket.is_empty() {
            path.push(&request.bucket);
            path.extend(request.prefix.split('/').filter(|s| !s.is_empty()));
        }
        let mut query = Vec::new();
        if !request.client_token.is_empty() {
            query.push(("clientToken", request.client_token.as_str()));
        }
        if request.force_start {
            query.push(("forceStart", "true"));
        }
        if request.force_stop {
            query.push(("forceStop", "true"));
        }

        let response = self
            .send_json(Method::POST, &path, &query, &request.opts)
            .await?;
        decode_json(response).await
    }

    async fn list_remote_buckets(
        &self,
        bucket: &str,
        arn_type: &str,
    ) -> Result<Vec<BucketTarget>, Error> {
        let targets: Option<Vec<BucketTarget>> = self
            .get_json(
                &["list-remote-targets"],
                &[("bucket", bucket), ("type", arn_type)],
            )
            .await?;
        Ok(targets.unwrap_or_default())
    }

    async fn add_remote_bucket(&self, bucket: &str, target: &BucketTarget) -> Result<String, Error> {
        let response = self
            .send_encrypted_json(
                Method::PUT,
                &["set-remote-target"],
                &[("bucket", bucket)],
                target,
            )
            .await?;
        decode_json(response).await
    }

    async fn remove_remote_bucket(&self, bucket: &str, arn: &str) -> Result<(), Error> {
        self.call(
            Method::DELETE,
            &["remove-remote-target"],
            &[("bucket", bucket), ("arn", arn)],
        )
        .await
    }

    async fn list_tiers(&self) -> Result<Vec<Value>, Error> {
        let tiers: Option<Vec<Value>> = self.get_json(&["tier"], &[]).await?;
        Ok(tiers.unwrap_or_default())
    }

    async fn tier_stats(&self) -> Result<Vec<Value>, Error> {
        let stats: Option<Vec<Value>> = self.get_json(&["tier-stats"], &[]).await?;
        Ok(stats.unwrap_or_default())
    }

    async fn add_tier(&self, config: &Value) -> Result<(), Error> {
        self.send_encrypted_json(Method::PUT, &["tier"], &[], config)
            .await?;
        Ok(())
    }

    async fn edit_tier_creds(&self, name: &str, creds: &TierCreds) -> Result<(), Error> {
        self.send_encrypted_json(Method::POST, &["tier", name], &[], creds)
            .await?;
        Ok(())
    }

    async fn verify_tier(&self, name: &str) -> Result<(), Error> {
        self.call(Method::GET, &["tier", name], &[]).await
    }

    async fn site_replication_info(&self) -> Result<Value, Error> {
        self.get_json(&["site-replication", "info"], &[]).await
    }

    async fn add_site_replication(&self, sites: &Value) -> Result<Value, Error> {
        let response = self
            .send_encrypted_json(Method::PUT, &["site-replication", "add"], &[], sites)
            .await?;
        decode_json(response).await
    }

    async fn edit_site_replication(&self, site: &Value) -> Result<Value, Error> {
        let response = self
            .send_encrypted_json(Method::PUT, &["site-replication", "edit"], &[], site)
            .await?;
        decode_json(response).await
    }

    async fn remove_site_replication(&self, request: &Value) -> Result<Value, Error> {
        let response = self
            .send_json(Method::PUT, &["site-replication", "remove"], &[], request)
            .await?;
        decode_json(response).await
    }

    async fn site_replication_status(&self, query: &[(&str, &str)]) -> Result<Value, Error> {
        self.get_json(&["site-replication", "status"], query).await
    }

    async fn kms_status(&self) -> Result<KmsStatus, Error> {
        self.get_json(&["kms", "status"], &[]).await
    }

    async fn create_key(&self, key: &str) -> Result<(), Error> {
        self.call(Method::POST, &["kms", "key", "create"], &[("key-id", key)])
            .await
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<KmsKeyInfo>, Error> {
        let keys: Option<Vec<KmsKeyInfo>> = self
            .get_json(&["kms", "key", "list"], &[("pattern", pattern)])
            .await?;
        Ok(keys.unwrap_or_default())
    }

    async fn key_status(&self, key: &str) -> Result<Value, Error> {
        self.get_json(&["kms", "key", "status"], &[("key-id", key)])
            .await
    }

    async fn add_or_update_idp_config(
        &self,
        idp_type: &str,
        name: &str,
        config: &str,
        update: bool,
    ) -> Result<bool, Error> {
        let method = if update { Method::POST } else { Method::PUT };
        let response = self
            .send_encrypted(method, &["idp-config", idp_type, name], &[], config.as_bytes())
            .await?;
        Ok(restart_required(&response))
    }

    async fn list_idp_config(&self, idp_type: &str) -> Result<Vec<IdpListItem>, Error> {
        let items: Option<Vec<IdpListItem>> =
            self.get_json(&["idp-config", idp_type], &[]).await?;
        Ok(items.unwrap_or_default())
    }

    async fn get_idp_config(&self, idp_type: &str, name: &str) -> Result<IdpConfig, Error> {
        let plain = self
            .get_encrypted(&["idp-config", idp_type, name], &[])
            .await?;
        decode_slice(&plain)
    }

    async fn delete_idp_config(&self, idp_type: &str, name: &str) -> Result<bool, Error> {
        let response = self
            .execute(Method::DELETE, &["idp-config", idp_type, name], &[], Vec::new())
            .await?;
        Ok(restart_required(&response))
    }

    async fn start_profiling(
        &self,
        profiler: ProfilerType,
    ) -> Result<Vec<StartProfilingResult>, Error> {
        let profiler = profiler.to_string();
        let response = self
            .execute(
                Method::POST,
                &["profiling", "start"],
                &[("profilerType", profiler.as_str())],
                Vec::new(),
            )
            .await?;
        decode_json(response).await
    }

    async fn download_profiling_data(&self) -> Result<Bytes, Error> {
        let response = self
            .execute(Method::GET, &["profiling", "download"], &[], Vec::new())
            .await?;
        response.bytes().await.context(TransportSnafu)
    }

    async fn service_trace(
        &self,
        options: &TraceOptions,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error> {
        let threshold = format!("{}ms", options.threshold_ms.max(0));
        self.stream(
            Method::GET,
            &["trace"],
            &[
                ("s3", flag(options.s3)),
                ("internal", flag(options.internal)),
                ("storage", flag(options.storage)),
                ("os", flag(options.os)),
                ("err", flag(options.errors_only)),
                ("threshold", threshold.as_str()),
            ],
            cancel,
        )
        .await
    }

    async fn get_logs(
        &self,
        options: &LogOptions,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error> {
        let limit = options.limit.to_string();
        self.stream(
            Method::GET,
            &["log"],
            &[
                ("node", options.node.as_str()),
                ("limit", limit.as_str()),
                ("logType", options.kind.as_str()),
            ],
            cancel,
        )
        .await
    }

    async fn speedtest(
        &self,
        options: &SpeedtestOptions,
        cancel: CancellationToken,
    ) -> Result<EventStream, Error> {
        let size = options.size.to_string();
        let concurrency = options.concurrency.to_string();
        let duration = format!("{}s", options.duration_secs);
        let mut query = vec![
            ("size", size.as_str()),
            ("concurrent", concurrency.as_str()),
            ("duration", duration.as_str()),
            ("autotune", flag(options.autotune)),
        ];
        if !options.bucket.is_empty() {
            query.push(("bucket", options.bucket.as_str()));
        }
        self.stream(Method::POST, &["speedtest"], &query, cancel)
            .await
    }
}
