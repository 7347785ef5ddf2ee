use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

/// Aggregated workload state for every cluster the backend knows about.
///
/// Replaced wholesale on each successful poll; partial payloads deserialize
/// through the field defaults below rather than failing the whole snapshot.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub deployments: BTreeMap<String, ClusterBucket<DeploymentResource>>,
    #[serde(default)]
    pub pods: BTreeMap<String, ClusterBucket<PodResource>>,
}

/// Per-cluster grouping. `items` stays `None` when the backend sent a bucket
/// without an item list, and such buckets pass through filtering untouched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClusterBucket<T> {
    pub items: Option<Vec<T>>,
}

impl<T> Default for ClusterBucket<T> {
    fn default() -> Self {
        Self { items: None }
    }
}

impl<T> ClusterBucket<T> {
    pub fn len(&self) -> usize {
        self.items.as_ref().map(Vec::len).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub owner_references: Vec<OwnerReference>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OwnerReference {
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeploymentResource {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: DeploymentSpec,
    #[serde(default)]
    pub status: DeploymentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeploymentSpec {
    #[serde(default)]
    pub template: PodTemplate,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PodTemplate {
    #[serde(default)]
    pub spec: PodSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<ContainerSpec>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    #[serde(default)]
    pub replicas: i32,
    #[serde(default)]
    pub ready_replicas: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PodResource {
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub spec: PodSpec,
    #[serde(default)]
    pub status: PodStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodStatus {
    #[serde(default)]
    pub container_statuses: Vec<ContainerStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerStatus {
    #[serde(default)]
    pub state: ContainerState,
}

/// Runtime state of one container. The orchestrator sets exactly one of the
/// three keys; the first one present names the phase.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerState {
    #[serde(default)]
    pub running: Option<Value>,
    #[serde(default)]
    pub waiting: Option<Value>,
    #[serde(default)]
    pub terminated: Option<Value>,
}

impl ContainerState {
    pub fn phase(&self) -> &'static str {
        if self.running.is_some() {
            "running"
        } else if self.waiting.is_some() {
            "waiting"
        } else if self.terminated.is_some() {
            "terminated"
        } else {
            "unknown"
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerSpec {
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub ports: Vec<ContainerPort>,
    #[serde(default)]
    pub resources: ContainerResources,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerPort {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub container_port: u16,
    #[serde(default)]
    pub protocol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ContainerResources {
    #[serde(default)]
    pub requests: QuantitySet,
    #[serde(default)]
    pub limits: QuantitySet,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct QuantitySet {
    #[serde(default)]
    pub cpu: Option<String>,
    #[serde(default)]
    pub memory: Option<String>,
}

impl QuantitySet {
    pub fn cpu(&self) -> &str {
        self.cpu.as_deref().unwrap_or("0")
    }

    pub fn memory(&self) -> &str {
        self.memory.as_deref().unwrap_or("0")
    }
}

/// Shared view over both workload kinds, driving search matching and the
/// failed-only filter without per-kind duplication.
pub trait Workload {
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
    fn containers(&self) -> &[ContainerSpec];
    fn is_healthy(&self) -> bool;

    fn matches_search(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }

        let query_lower = query.to_ascii_lowercase();

        if self.name().to_ascii_lowercase().contains(&query_lower) {
            return true;
        }

        if self.namespace().to_ascii_lowercase().contains(&query_lower) {
            return true;
        }

        self.containers()
            .iter()
            .any(|container| container.image.to_ascii_lowercase().contains(&query_lower))
    }
}

impl Workload for DeploymentResource {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    fn containers(&self) -> &[ContainerSpec] {
        &self.spec.template.spec.containers
    }

    // ready > desired counts as unhealthy too: the data is inconsistent and
    // the resource should surface under the failed-only filter.
    fn is_healthy(&self) -> bool {
        self.status.ready_replicas == self.status.replicas
    }
}

impl Workload for PodResource {
    fn name(&self) -> &str {
        &self.metadata.name
    }

    fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    fn containers(&self) -> &[ContainerSpec] {
        &self.spec.containers
    }

    fn is_healthy(&self) -> bool {
        self.phase() == "running"
    }
}

impl PodResource {
    /// Pod phase comes from the first container status; pods without any
    /// reported status read as "unknown".
    pub fn phase(&self) -> &'static str {
        self.status
            .container_statuses
            .first()
            .map(|status| status.state.phase())
            .unwrap_or("unknown")
    }

    pub fn owner(&self) -> Option<&OwnerReference> {
        self.metadata.owner_references.first()
    }

    pub fn is_orphaned(&self) -> bool {
        self.metadata.owner_references.is_empty()
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ClusterSelector {
    All,
    Named(String),
}

impl ClusterSelector {
    pub fn selects(&self, key: &str) -> bool {
        match self {
            Self::All => true,
            Self::Named(cluster) => cluster == key,
        }
    }

    pub fn label(&self) -> String {
        match self {
            Self::All => "*".to_string(),
            Self::Named(cluster) => cluster.clone(),
        }
    }

    pub fn from_token(token: &str) -> Self {
        match token.trim() {
            "" | "*" | "all" => Self::All,
            cluster => Self::Named(cluster.to_string()),
        }
    }
}

impl Default for ClusterSelector {
    fn default() -> Self {
        Self::All
    }
}

impl Display for ClusterSelector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => write!(f, "*"),
            Self::Named(cluster) => write!(f, "{cluster}"),
        }
    }
}

/// User-chosen constraints deriving the display subset from the snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterCriteria {
    pub cluster: ClusterSelector,
    pub search: String,
    pub failed_only: bool,
}
