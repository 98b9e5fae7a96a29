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

//! Diagnostic archive of a tenant: its resource, and the log, events and
//! status of every pod it runs.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use k8s_openapi::api::core::v1 as corev1;
use kube::ResourceExt;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu, ensure};
use std::io::{Cursor, Write};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::console::cluster::{self, ClusterClients};
use crate::console::error::ErrorKind;
use crate::types::v2::tenant::MINIO_CONTAINER;

#[derive(Debug, Snafu)]
pub enum Error {
    #[snafu(display("Namespace and Tenant name cannot be empty"))]
    EmptyName,

    #[snafu(display("{}", source))]
    Cluster { source: cluster::Error },

    #[snafu(display("unable to serialize tenant: {}", source))]
    Yaml { source: serde_yaml_ng::Error },

    #[snafu(display("unable to serialize {}: {}", what, source))]
    Json {
        what: String,
        source: serde_json::Error,
    },

    #[snafu(display("unable to write report entry {}: {}", entry, source))]
    Entry {
        entry: String,
        source: zip::result::ZipError,
    },

    #[snafu(display("unable to write report entry {}: {}", entry, source))]
    Write {
        entry: String,
        source: std::io::Error,
    },

    #[snafu(display("unable to finish report: {}", source))]
    Finish { source: zip::result::ZipError },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::EmptyName => ErrorKind::BadRequest,
            Error::Cluster { source } => source.kind(),
            _ => ErrorKind::Default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantReport {
    pub filename: String,
    /// Base64 of the zip archive.
    pub blob: String,
}

struct Archive {
    writer: ZipWriter<Cursor<Vec<u8>>>,
}

impl Archive {
    fn new() -> Self {
        Self {
            writer: ZipWriter::new(Cursor::new(Vec::new())),
        }
    }

    fn add(&mut self, entry: String, content: &[u8]) -> Result<(), Error> {
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
        self.writer
            .start_file(entry.as_str(), options)
            .context(EntrySnafu { entry: &entry })?;
        self.writer.write_all(content).context(WriteSnafu { entry })
    }

    fn finish(self) -> Result<Vec<u8>, Error> {
        Ok(self.writer.finish().context(FinishSnafu)?.into_inner())
    }
}

/// Builds the report. Any failing step fails the whole report.
pub async fn tenant_report(clients: &ClusterClients, namespace: &str, tenant_name: &str) -> Result<TenantReport, Error> {
    ensure!(!namespace.is_empty() && !tenant_name.is_empty(), EmptyNameSnafu);

    let tenant = clients
        .operator
        .get_tenant(namespace, tenant_name)
        .await
        .context(ClusterSnafu)?;
    let pods = clients
        .core
        .list_pods(namespace, &tenant.pod_selector())
        .await
        .context(ClusterSnafu)?;

    let mut archive = Archive::new();
    let tenant_yaml = serde_yaml_ng::to_string(&tenant).context(YamlSnafu)?;
    archive.add(format!("{}.yaml", tenant_name), tenant_yaml.as_bytes())?;

    for pod in &pods {
        let name = pod.name_any();

        let logs = clients
            .core
            .pod_logs(namespace, &name, MINIO_CONTAINER)
            .await
            .context(ClusterSnafu)?;
        archive.add(format!("{}.log", name), &logs)?;

        let uid = pod.uid().unwrap_or_default();
        let events = clients
            .core
            .list_events(namespace, &format!("involvedObject.uid={}", uid))
            .await
            .context(ClusterSnafu)?;
        let events = k8s_openapi::List::<corev1::Event> {
            items: events,
            metadata: Default::default(),
        };
        let events = serde_json::to_vec(&events).context(JsonSnafu { what: "events" })?;
        archive.add(format!("{}-events.txt", name), &events)?;

        let status = serde_json::to_vec(&pod.status).context(JsonSnafu { what: "pod status" })?;
        archive.add(format!("{}-status.txt", name), &status)?;
    }

    Ok(TenantReport {
        filename: format!("{}-report.zip", tenant_name),
        blob: STANDARD.encode(archive.finish()?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::cluster::{ClusterFactory, MemoryCluster};
    use crate::tests::create_test_tenant;
    use crate::types::v2::tenant::TENANT_LABEL;
    use k8s_openapi::apimachinery::pkg::apis::meta::v1 as metav1;
    use std::io::Read;

    fn pod(name: &str, tenant: &str) -> corev1::Pod {
        corev1::Pod {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                uid: Some(format!("{}-uid", name)),
                labels: Some([(TENANT_LABEL.to_string(), tenant.to_string())].into()),
                ..Default::default()
            },
            status: Some(corev1::PodStatus {
                phase: Some("Running".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn event(name: &str, pod_uid: &str) -> corev1::Event {
        corev1::Event {
            metadata: metav1::ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some("ns".to_string()),
                ..Default::default()
            },
            involved_object: corev1::ObjectReference {
                uid: Some(pod_uid.to_string()),
                ..Default::default()
            },
            message: Some(format!("{} happened", name)),
            ..Default::default()
        }
    }

    fn entry(archive: &mut zip::ZipArchive<Cursor<Vec<u8>>>, name: &str) -> String {
        let mut content = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut content).unwrap();
        content
    }

    #[tokio::test]
    async fn test_report_contents() {
        let cluster = MemoryCluster::new()
            .with_token("t")
            .with_tenant(create_test_tenant("t1", "ns"))
            .with_pod(pod("t1-pool-0-0", "t1"), "server started")
            .with_pod(pod("t2-pool-0-0", "t2"), "other tenant")
            .with_event(event("scheduled", "t1-pool-0-0-uid"))
            .with_event(event("unrelated", "t2-pool-0-0-uid"));
        let clients = cluster.for_token("t").await.unwrap();

        let report = tenant_report(&clients, "ns", "t1").await.unwrap();
        assert_eq!(report.filename, "t1-report.zip");

        let bytes = STANDARD.decode(&report.blob).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(
            names,
            [
                "t1-pool-0-0-events.txt",
                "t1-pool-0-0-status.txt",
                "t1-pool-0-0.log",
                "t1.yaml"
            ]
        );

        assert!(entry(&mut archive, "t1.yaml").contains("name: t1"));
        assert_eq!(entry(&mut archive, "t1-pool-0-0.log"), "server started");
        let events = entry(&mut archive, "t1-pool-0-0-events.txt");
        assert!(events.contains("scheduled happened"));
        assert!(!events.contains("unrelated"));
        assert!(entry(&mut archive, "t1-pool-0-0-status.txt").contains("Running"));
    }

    #[tokio::test]
    async fn test_report_keeps_raw_log_bytes() {
        let raw = b"started\xff\xfe binary tail".to_vec();
        let cluster = MemoryCluster::new()
            .with_token("t")
            .with_tenant(create_test_tenant("t1", "ns"))
            .with_pod(pod("t1-pool-0-0", "t1"), raw.clone());
        let clients = cluster.for_token("t").await.unwrap();

        let report = tenant_report(&clients, "ns", "t1").await.unwrap();
        let bytes = STANDARD.decode(&report.blob).unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();

        let mut logs = Vec::new();
        archive
            .by_name("t1-pool-0-0.log")
            .unwrap()
            .read_to_end(&mut logs)
            .unwrap();
        assert_eq!(logs, raw);
    }

    #[tokio::test]
    async fn test_report_failures() {
        let cluster = MemoryCluster::new().with_token("t");
        let clients = cluster.for_token("t").await.unwrap();

        let empty = tenant_report(&clients, "", "t1").await.unwrap_err();
        assert_eq!(empty.to_string(), "Namespace and Tenant name cannot be empty");
        assert_eq!(empty.kind(), ErrorKind::BadRequest);

        let missing = tenant_report(&clients, "ns", "t1").await.unwrap_err();
        assert_eq!(missing.kind(), ErrorKind::NotFound);
    }
}
