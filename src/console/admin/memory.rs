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
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::types::*;
use super::{AdminConnector, Error, EventStream, TenantAdmin};
use crate::console::cluster::CoreClient;
use crate::types::v2::tenant::Tenant;

#[derive(Default)]
struct State {
    info: InfoMessage,
    config: BTreeMap<String, BTreeMap<String, String>>,
    restart_required: bool,
    users: BTreeMap<String, UserInfo>,
    groups: BTreeMap<String, GroupDesc>,
    policies: BTreeMap<String, Value>,
    service_accounts: BTreeMap<String, ServiceAccountInfo>,
    responses: BTreeMap<String, Value>,
    events: BTreeMap<String, Vec<Value>>,
    failures: BTreeMap<String, (u16, String, String)>,
    calls: Vec<String>,
}

/// Table-driven tenant admin used by tests. Users, groups, policies,
/// service accounts and configuration are stateful; every other operation
/// answers from [`MemoryAdmin::with_response`] or fails as unsupported.
#[derive(Clone, Default)]
pub struct MemoryAdmin {
    state: Arc<Mutex<State>>,
}

fn render_subsystem(name: &str, keys: &BTreeMap<String, String>) -> String {
    let mut line = name.to_string();
    for (key, value) in keys {
        if value.contains(' ') {
            line.push_str(&format!(" {}=\"{}\"", key, value));
        } else {
            line.push_str(&format!(" {}={}", key, value));
        }
    }
    line
}

impl MemoryAdmin {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with_info(self, info: InfoMessage) -> Self {
        self.state().info = info;
        self
    }

    pub fn with_config(self, kv: &str) -> Self {
        let (subsystem, pairs) = parse_config_line(kv);
        self.state().config.entry(subsystem).or_default().extend(pairs);
        self
    }

    pub fn with_restart_required(self) -> Self {
        self.state().restart_required = true;
        self
    }

    pub fn with_user(self, access_key: &str, info: UserInfo) -> Self {
        self.state().users.insert(access_key.to_string(), info);
        self
    }

    pub fn with_policy(self, name: &str, policy: Value) -> Self {
        self.state().policies.insert(name.to_string(), policy);
        self
    }

    /// Canned reply of `operation`, decoded into its typed result.
    pub fn with_response(self, operation: &str, response: Value) -> Self {
        self.state().responses.insert(operation.to_string(), response);
        self
    }

    pub fn with_events(self, operation: &str, events: Vec<Value>) -> Self {
        self.state().events.insert(operation.to_string(), events);
        self
    }

    /// Makes `operation` fail as the remote service would.
    pub fn with_failure(self, operation: &str, status: u16, code: &str, message: &str) -> Self {
        self.state().failures.insert(
            operation.to_string(),
            (status, code.to_string(), message.to_string()),
        );
        self
    }

    /// Operations invoked so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Current `subsys k=v ...` line of a configuration subsystem.
    pub fn config(&self, subsystem: &str) -> Option<String> {
        self.state()
            .config
            .get(subsystem)
            .map(|keys| render_subsystem(subsystem, keys))
    }

    fn begin(&self, operation: &str) -> Result<MutexGuard<'_, State>, Error> {
        let mut state = self.state();
        state.calls.push(operation.to_string());
        match state.failures.get(operation) {
            Some((status, code, message)) => Err(Error::Remote {
                status: *status,
                code: code.clone(),
                message: message.clone(),
            }),
            None => Ok(state),
        }
    }

    fn canned<T: serde::de::DeserializeOwned>(&self, operation: &str) -> Result<T, Error> {
        let state = self.begin(operation)?;
        let value = state
            .responses
            .get(operation)
            .cloned()
            .ok_or_else(|| Error::Unsupported {
                operation: operation.to_string(),
            })?;
        drop(state);
        serde_json::from_value(value).map_err(|source| Error::Decode { source })
    }

    fn acknowledge(&self, operation: &str) -> Result<(), Error> {
        self.begin(operation).map(drop)
    }

    fn stream(&self, operation: &str, cancel: CancellationToken) -> Result<EventStream, Error> {
        let events = self
            .begin(operation)?
            .events
            .get(operation)
            .cloned()
            .unwrap_or_default();
        let (tx, rx) = mpsc::channel(events.len().max(1));

        tokio::spawn(async move {
            for event in events {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    sent = tx.send(Ok(event)) => if sent.is_err() { break },
                }
            }
        });
        Ok(rx)
    }
}

fn no_such(kind: &str, code: &str, name: &str) -> Error {
    Error::Remote {
        status: 404,
        code: code.to_string(),
        message: format!("The specified {} {} does not exist.", kind, name),
    }
}

#[async_trait]
impl TenantAdmin for MemoryAdmin {
    async fn server_info(&self) -> Result<InfoMessage, Error> {
        Ok(self.begin("server_info")?.info.clone())
    }

    async fn get_config_kv(&self, key: &str) -> Result<String, Error> {
        let state = self.begin("get_config_kv")?;
        let subsystem = key.split_once(' ').map_or(key, |(s, _)| s);
        Ok(state
            .config
            .get(subsystem)
            .map(|keys| render_subsystem(subsystem, keys))
            .unwrap_or_else(|| subsystem.to_string()))
    }

    async fn set_config_kv(&self, kv: &str) -> Result<bool, Error> {
        let mut state = self.begin("set_config_kv")?;
        let (subsystem, pairs) = parse_config_line(kv);
        state.config.entry(subsystem).or_default().extend(pairs);
        Ok(state.restart_required)
    }

    async fn del_config_kv(&self, kv: &str) -> Result<(), Error> {
        let mut state = self.begin("del_config_kv")?;
        let (subsystem, _) = parse_config_line(kv);
        state.config.remove(&subsystem);
        Ok(())
    }

    async fn help_config_kv(&self, _sub_sys: &str, _key: &str, _env_only: bool) -> Result<Value, Error> {
        self.canned("help_config_kv")
    }

    async fn service_restart(&self) -> Result<(), Error> {
        self.acknowledge("service_restart")
    }

    async fn list_users(&self) -> Result<BTreeMap<String, UserInfo>, Error> {
        Ok(self.begin("list_users")?.users.clone())
    }

    async fn add_user(&self, access_key: &str, secret_key: &str) -> Result<(), Error> {
        let mut state = self.begin("add_user")?;
        let user = state.users.entry(access_key.to_string()).or_default();
        user.secret_key = secret_key.to_string();
        Ok(())
    }

    async fn remove_user(&self, access_key: &str) -> Result<(), Error> {
        let mut state = self.begin("remove_user")?;
        state
            .users
            .remove(access_key)
            .map(drop)
            .ok_or_else(|| no_such("user", "XMinioAdminNoSuchUser", access_key))
    }

    async fn get_user_info(&self, access_key: &str) -> Result<UserInfo, Error> {
        let state = self.begin("get_user_info")?;
        let mut user = state
            .users
            .get(access_key)
            .cloned()
            .ok_or_else(|| no_such("user", "XMinioAdminNoSuchUser", access_key))?;
        user.secret_key.clear();
        Ok(user)
    }

    async fn set_user_status(&self, access_key: &str, status: AccountStatus) -> Result<(), Error> {
        let mut state = self.begin("set_user_status")?;
        let user = state
            .users
            .get_mut(access_key)
            .ok_or_else(|| no_such("user", "XMinioAdminNoSuchUser", access_key))?;
        user.status = status;
        Ok(())
    }

    async fn change_password(&self, access_key: &str, secret_key: &str) -> Result<(), Error> {
        self.add_user(access_key, secret_key).await
    }

    async fn list_groups(&self) -> Result<Vec<String>, Error> {
        Ok(self.begin("list_groups")?.groups.keys().cloned().collect())
    }

    async fn update_group_members(&self, request: &GroupAddRemove) -> Result<(), Error> {
        let mut state = self.begin("update_group_members")?;
        if request.is_remove {
            if request.members.is_empty() {
                state.groups.remove(&request.group);
            } else if let Some(group) = state.groups.get_mut(&request.group) {
                group.members.retain(|m| !request.members.contains(m));
            }
            return Ok(());
        }

        let group = state
            .groups
            .entry(request.group.clone())
            .or_insert_with(|| GroupDesc {
                name: request.group.clone(),
                status: AccountStatus::Enabled.to_string(),
                ..Default::default()
            });
        for member in &request.members {
            if !group.members.contains(member) {
                group.members.push(member.clone());
            }
        }
        Ok(())
    }

    async fn get_group_description(&self, group: &str) -> Result<GroupDesc, Error> {
        self.begin("get_group_description")?
            .groups
            .get(group)
            .cloned()
            .ok_or_else(|| no_such("group", "XMinioAdminNoSuchGroup", group))
    }

    async fn set_group_status(&self, group: &str, status: AccountStatus) -> Result<(), Error> {
        let mut state = self.begin("set_group_status")?;
        let desc = state
            .groups
            .get_mut(group)
            .ok_or_else(|| no_such("group", "XMinioAdminNoSuchGroup", group))?;
        desc.status = status.to_string();
        Ok(())
    }

    async fn list_policies(&self) -> Result<BTreeMap<String, Value>, Error> {
        Ok(self.begin("list_policies")?.policies.clone())
    }

    async fn get_policy(&self, name: &str) -> Result<Value, Error> {
        self.begin("get_policy")?
            .policies
            .get(name)
            .cloned()
            .ok_or_else(|| no_such("policy", "XMinioAdminNoSuchPolicy", name))
    }

    async fn add_policy(&self, name: &str, policy: &Value) -> Result<(), Error> {
        self.begin("add_policy")?
            .policies
            .insert(name.to_string(), policy.clone());
        Ok(())
    }

    async fn remove_policy(&self, name: &str) -> Result<(), Error> {
        self.begin("remove_policy")?
            .policies
            .remove(name)
            .map(drop)
            .ok_or_else(|| no_such("policy", "XMinioAdminNoSuchPolicy", name))
    }

    async fn set_policy(&self, policy: &str, entity: &str, is_group: bool) -> Result<(), Error> {
        let mut state = self.begin("set_policy")?;
        if !state.policies.contains_key(policy) {
            return Err(no_such("policy", "XMinioAdminNoSuchPolicy", policy));
        }
        if is_group {
            let group = state
                .groups
                .get_mut(entity)
                .ok_or_else(|| no_such("group", "XMinioAdminNoSuchGroup", entity))?;
            group.policy = policy.to_string();
        } else {
            let user = state
                .users
                .get_mut(entity)
                .ok_or_else(|| no_such("user", "XMinioAdminNoSuchUser", entity))?;
            user.policy_name = policy.to_string();
        }
        Ok(())
    }

    async fn add_service_account(
        &self,
        request: &AddServiceAccountReq,
    ) -> Result<ServiceAccountCredentials, Error> {
        let mut state = self.begin("add_service_account")?;
        let access_key = if request.access_key.is_empty() {
            format!("SA{:06}", state.service_accounts.len() + 1)
        } else {
            request.access_key.clone()
        };
        let secret_key = if request.secret_key.is_empty() {
            uuid::Uuid::new_v4().simple().to_string()
        } else {
            request.secret_key.clone()
        };
        state.service_accounts.insert(
            access_key.clone(),
            ServiceAccountInfo {
                parent_user: request.target_user.clone(),
                account_status: "on".to_string(),
                implied_policy: request.policy.is_none(),
                access_key: access_key.clone(),
                name: request.name.clone(),
                description: request.description.clone(),
                expiration: None,
            },
        );
        Ok(ServiceAccountCredentials {
            access_key,
            secret_key,
            ..Default::default()
        })
    }

    async fn list_service_accounts(&self, user: &str) -> Result<ListServiceAccountsResp, Error> {
        let state = self.begin("list_service_accounts")?;
        Ok(ListServiceAccountsResp {
            accounts: state
                .service_accounts
                .values()
                .filter(|account| user.is_empty() || account.parent_user == user)
                .cloned()
                .collect(),
        })
    }

    async fn info_service_account(&self, access_key: &str) -> Result<InfoServiceAccountResp, Error> {
        let state = self.begin("info_service_account")?;
        let account = state.service_accounts.get(access_key).ok_or_else(|| {
            no_such("service account", "XMinioAdminNoSuchServiceAccount", access_key)
        })?;
        Ok(InfoServiceAccountResp {
            parent_user: account.parent_user.clone(),
            account_status: account.account_status.clone(),
            implied_policy: account.implied_policy,
            policy: String::new(),
            name: account.name.clone(),
            description: account.description.clone(),
            expiration: account.expiration.clone(),
        })
    }

    async fn update_service_account(
        &self,
        access_key: &str,
        request: &UpdateServiceAccountReq,
    ) -> Result<(), Error> {
        let mut state = self.begin("update_service_account")?;
        let account = state.service_accounts.get_mut(access_key).ok_or_else(|| {
            no_such("service account", "XMinioAdminNoSuchServiceAccount", access_key)
        })?;
        if !request.new_status.is_empty() {
            account.account_status = request.new_status.clone();
        }
        if !request.new_name.is_empty() {
            account.name = request.new_name.clone();
        }
        if !request.new_description.is_empty() {
            account.description = request.new_description.clone();
        }
        if request.new_policy.is_some() {
            account.implied_policy = false;
        }
        Ok(())
    }

    async fn delete_service_account(&self, access_key: &str) -> Result<(), Error> {
        self.begin("delete_service_account")?
            .service_accounts
            .remove(access_key)
            .map(drop)
            .ok_or_else(|| {
                no_such("service account", "XMinioAdminNoSuchServiceAccount", access_key)
            })
    }

    async fn account_info(&self) -> Result<AccountInfo, Error> {
        self.canned("account_info")
    }

    async fn heal(&self, _request: &HealRequest) -> Result<Value, Error> {
        self.canned("heal")
    }

    async fn list_remote_buckets(&self, _bucket: &str, _arn_type: &str) -> Result<Vec<BucketTarget>, Error> {
        self.canned("list_remote_buckets")
    }

    async fn add_remote_bucket(&self, _bucket: &str, _target: &BucketTarget) -> Result<String, Error> {
        self.canned("add_remote_bucket")
    }

    async fn remove_remote_bucket(&self, _bucket: &str, _arn: &str) -> Result<(), Error> {
        self.acknowledge("remove_remote_bucket")
    }

    async fn list_tiers(&self) -> Result<Vec<Value>, Error> {
        self.canned("list_tiers")
    }

    async fn tier_stats(&self) -> Result<Vec<Value>, Error> {
        self.canned("tier_stats")
    }

    async fn add_tier(&self, _config: &Value) -> Result<(), Error> {
        self.acknowledge("add_tier")
    }

    async fn edit_tier_creds(&self, _name: &str, _creds: &TierCreds) -> Result<(), Error> {
        self.acknowledge("edit_tier_creds")
    }

    async fn verify_tier(&self, _name: &str) -> Result<(), Error> {
        self.acknowledge("verify_tier")
    }

    async fn site_replication_info(&self) -> Result<Value, Error> {
        self.canned("site_replication_info")
    }

    async fn add_site_replication(&self, _sites: &Value) -> Result<Value, Error> {
        self.canned("add_site_replication")
    }

    async fn edit_site_replication(&self, _site: &Value) -> Result<Value, Error> {
        self.canned("edit_site_replication")
    }

    async fn remove_site_replication(&self, _request: &Value) -> Result<Value, Error> {
        self.canned("remove_site_replication")
    }

    async fn site_replication_status(&self, _query: &[(&str, &str)]) -> Result<Value, Error> {
        self.canned("site_replication_status")
    }

    async fn kms_status(&self) -> Result<KmsStatus, Error> {
        self.canned("kms_status")
    }

    async fn create_key(&self, _key: &str) -> Result<(), Error> {
        self.acknowledge("create_key")
    }

    async fn list_keys(&self, _pattern: &str) -> Result<Vec<KmsKeyInfo>, Error> {
        self.canned("list_keys")
    }

    async fn key_status(&self, _key: &str) -> Result<Value, Error> {
        self.canned("key_status")
    }

    async fn add_or_update_idp_config(
        &self,
        _idp_type: &str,
        _name: &str,
        _config: &str,
        _update: bool,
    ) -> Result<bool, Error> {
        Ok(self.begin("add_or_update_idp_config")?.restart_required)
    }

    async fn list_idp_config(&self, _idp_type: &str) -> Result<Vec<IdpListItem>, Error> {
        self.canned("list_idp_config")
    }

    async fn get_idp_config(&self, _idp_type: &str, _name: &str) -> Result<IdpConfig, Error> {
        self.canned("get_idp_config")
    }

    async fn delete_idp_config(&self, _idp_type: &str, _name: &str) -> Result<bool, Error> {
        Ok(self.begin("delete_idp_config")?.restart_required)
    }

    async fn start_profiling(&self, _profiler: ProfilerType) -> Result<Vec<StartProfilingResult>, Error> {
        self.canned("start_profiling")
    }

    async fn download_profiling_data(&self) -> Result<Bytes, Error> {
        let data: String = self.canned("download_profiling_data")?;
        Ok(Bytes::from(data))
    }

    async fn service_trace(&self, _options: &TraceOptions, cancel: CancellationToken) -> Result<EventStream, Error> {
        self.stream("service_trace", cancel)
    }

    async fn get_logs(&self, _options: &LogOptions, cancel: CancellationToken) -> Result<EventStream, Error> {
        self.stream("get_logs", cancel)
    }

    async fn speedtest(&self, _options: &SpeedtestOptions, cancel: CancellationToken) -> Result<EventStream, Error> {
        self.stream("speedtest", cancel)
    }
}

/// Hands out registered [`MemoryAdmin`]s by tenant; unknown tenants are
/// unreachable.
#[derive(Clone, Default)]
pub struct MemoryAdminConnector {
    tenants: Arc<Mutex<BTreeMap<(String, String), MemoryAdmin>>>,
}

impl MemoryAdminConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenant(self, namespace: &str, name: &str, admin: MemoryAdmin) -> Self {
        self.tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert((namespace.to_string(), name.to_string()), admin);
        self
    }
}

#[async_trait]
impl AdminConnector for MemoryAdminConnector {
    async fn connect(
        &self,
        _core: &dyn CoreClient,
        tenant: &Tenant,
    ) -> Result<Arc<dyn TenantAdmin>, Error> {
        let key = (tenant.namespace().unwrap_or_default(), tenant.name());
        let admin = self
            .tenants
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .cloned();

        match admin {
            Some(admin) => Ok(Arc::new(admin)),
            None => Err(Error::Remote {
                status: 503,
                code: "XMinioServerNotInitialized".to_string(),
                message: format!("tenant {}/{} is unreachable", key.0, key.1),
            }),
        }
    }
}
