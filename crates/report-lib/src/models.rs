//! Core data models for the report pipeline

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Tag holding the Kubernetes cluster name
pub const CLUSTER_TAG: &str = "kube_cluster_name";
/// Tag holding the Kubernetes namespace
pub const NAMESPACE_TAG: &str = "kube_namespace";
/// Tag holding the pod name
pub const POD_TAG: &str = "pod_name";

/// Value reported for identity fields the backend did not tag
pub const UNKNOWN: &str = "unknown";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;
const NANOCORES_PER_CORE: f64 = 1e9;

/// Identity of a monitored pod as reported by the backend
///
/// Tags are held in a sorted set, so two series with the same tags in a
/// different order refer to the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityKey {
    pub scope: String,
    pub tags: BTreeSet<String>,
}

impl EntityKey {
    pub fn new<I, S>(scope: impl Into<String>, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            scope: scope.into(),
            tags: tags.into_iter().map(Into::into).collect(),
        }
    }

    /// Value of the first `name:value` tag with the given name
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.iter().find_map(|tag| match tag.split_once(':') {
            Some((key, value)) if key == name => Some(value),
            _ => None,
        })
    }

    pub fn cluster(&self) -> &str {
        self.tag(CLUSTER_TAG).unwrap_or(UNKNOWN)
    }

    pub fn namespace(&self) -> &str {
        self.tag(NAMESPACE_TAG).unwrap_or(UNKNOWN)
    }

    pub fn pod(&self) -> &str {
        self.tag(POD_TAG).unwrap_or(UNKNOWN)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.cluster(), self.namespace(), self.pod())
    }
}

/// One sample of a series
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub timestamp_ms: i64,
    pub value: Option<f64>,
}

impl Point {
    pub fn new(timestamp_ms: i64, value: Option<f64>) -> Self {
        Self { timestamp_ms, value }
    }

    /// The value if it is a usable sample (present and finite)
    pub fn sample(&self) -> Option<f64> {
        self.value.filter(|v| v.is_finite())
    }
}

/// Resource type tracked per pod
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    Memory,
    Cpu,
}

/// Backend time aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Max,
    Avg,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Max => "max",
            Aggregation::Avg => "avg",
        }
    }
}

/// One of the eight series fetched per report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalMetric {
    MemoryMax,
    MemoryAvg,
    MemoryLimit,
    MemoryRequest,
    CpuMax,
    CpuAvg,
    CpuLimit,
    CpuRequest,
}

impl LogicalMetric {
    pub const ALL: [LogicalMetric; 8] = [
        LogicalMetric::MemoryMax,
        LogicalMetric::MemoryAvg,
        LogicalMetric::MemoryLimit,
        LogicalMetric::MemoryRequest,
        LogicalMetric::CpuMax,
        LogicalMetric::CpuAvg,
        LogicalMetric::CpuLimit,
        LogicalMetric::CpuRequest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            LogicalMetric::MemoryMax => "memory_max",
            LogicalMetric::MemoryAvg => "memory_avg",
            LogicalMetric::MemoryLimit => "memory_limit",
            LogicalMetric::MemoryRequest => "memory_request",
            LogicalMetric::CpuMax => "cpu_max",
            LogicalMetric::CpuAvg => "cpu_avg",
            LogicalMetric::CpuLimit => "cpu_limit",
            LogicalMetric::CpuRequest => "cpu_request",
        }
    }

    pub fn resource(&self) -> Resource {
        match self {
            LogicalMetric::MemoryMax
            | LogicalMetric::MemoryAvg
            | LogicalMetric::MemoryLimit
            | LogicalMetric::MemoryRequest => Resource::Memory,
            _ => Resource::Cpu,
        }
    }

    /// Aggregation applied by the backend
    ///
    /// Limits and requests are constant per pod, so `max` is used to collapse them.
    pub fn aggregation(&self) -> Aggregation {
        match self {
            LogicalMetric::MemoryAvg | LogicalMetric::CpuAvg => Aggregation::Avg,
            _ => Aggregation::Max,
        }
    }

    /// Backend metric namespace queried for this series
    pub fn backend_metric(&self) -> &'static str {
        match self {
            LogicalMetric::MemoryMax | LogicalMetric::MemoryAvg => "kubernetes.memory.usage",
            LogicalMetric::MemoryLimit => "kubernetes.memory.limits",
            LogicalMetric::MemoryRequest => "kubernetes.memory.requests",
            LogicalMetric::CpuMax | LogicalMetric::CpuAvg => "kubernetes.cpu.usage.total",
            LogicalMetric::CpuLimit => "kubernetes.cpu.limits",
            LogicalMetric::CpuRequest => "kubernetes.cpu.requests",
        }
    }

    /// Convert a raw backend value into the unit shown in reports
    ///
    /// Memory is reported in MB, CPU in cores. CPU usage arrives in nanocores
    /// while CPU limits and requests already arrive in cores.
    pub fn to_display_unit(&self, raw: f64) -> f64 {
        match self {
            LogicalMetric::MemoryMax
            | LogicalMetric::MemoryAvg
            | LogicalMetric::MemoryLimit
            | LogicalMetric::MemoryRequest => raw / BYTES_PER_MB,
            LogicalMetric::CpuMax | LogicalMetric::CpuAvg => raw / NANOCORES_PER_CORE,
            LogicalMetric::CpuLimit | LogicalMetric::CpuRequest => raw,
        }
    }
}

impl fmt::Display for LogicalMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw backend series for one entity, before merging
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub key: EntityKey,
    pub points: Vec<Point>,
}

/// Result of one (window, metric) query
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesSlice {
    Available(Vec<RawSeries>),
    Unavailable { reason: String },
}

impl SeriesSlice {
    pub fn is_available(&self) -> bool {
        matches!(self, SeriesSlice::Available(_))
    }
}

/// Liveness classification based on recent CPU activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PodStatus {
    Active,
    Completed,
}

impl PodStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PodStatus::Active => "Active",
            PodStatus::Completed => "Completed",
        }
    }
}

impl fmt::Display for PodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest values of one resource for a pod
///
/// Memory fields are in MB, CPU fields in cores. `percent` is
/// `max / limit * 100` and only present when the limit is positive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceUsage {
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub request: Option<f64>,
    pub limit: Option<f64>,
    pub percent: Option<f64>,
}

impl ResourceUsage {
    pub fn new(max: Option<f64>, avg: Option<f64>, request: Option<f64>, limit: Option<f64>) -> Self {
        let percent = match (max, limit) {
            (Some(max), Some(limit)) if limit > 0.0 => Some(max / limit * 100.0),
            _ => None,
        };
        Self {
            max,
            avg,
            request,
            limit,
            percent,
        }
    }
}

/// One reduced row per pod
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PodRow {
    pub cluster: String,
    pub namespace: String,
    pub pod: String,
    pub base_name: String,
    pub memory: ResourceUsage,
    pub cpu: ResourceUsage,
    pub status: PodStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cpu_sample_ms: Option<i64>,
}

impl PodRow {
    /// Memory max in MB; every emitted row has one
    pub fn memory_max(&self) -> f64 {
        self.memory.max.unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_key_ignores_tag_order() {
        let a = EntityKey::new("pod_name:web", ["kube_namespace:prod", "pod_name:web"]);
        let b = EntityKey::new("pod_name:web", ["pod_name:web", "kube_namespace:prod"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_entity_key_fields() {
        let key = EntityKey::new(
            "scope",
            [
                "kube_cluster_name:prod-eu",
                "kube_namespace:payments",
                "pod_name:api-7d6cf8d579-x2nds",
                "image:repo:tag",
            ],
        );
        assert_eq!(key.cluster(), "prod-eu");
        assert_eq!(key.namespace(), "payments");
        assert_eq!(key.pod(), "api-7d6cf8d579-x2nds");
        assert_eq!(key.tag("image"), Some("repo:tag"));
    }

    #[test]
    fn test_entity_key_defaults_to_unknown() {
        let key = EntityKey::new("scope", ["no-colon-tag"]);
        assert_eq!(key.cluster(), UNKNOWN);
        assert_eq!(key.namespace(), UNKNOWN);
        assert_eq!(key.pod(), UNKNOWN);
    }

    #[test]
    fn test_point_sample_skips_null_and_nan() {
        assert_eq!(Point::new(1, Some(2.0)).sample(), Some(2.0));
        assert_eq!(Point::new(1, None).sample(), None);
        assert_eq!(Point::new(1, Some(f64::NAN)).sample(), None);
    }

    #[test]
    fn test_metric_units() {
        let mb = LogicalMetric::MemoryMax.to_display_unit(100.0 * 1024.0 * 1024.0);
        assert!((mb - 100.0).abs() < 1e-9);
        assert!((LogicalMetric::CpuAvg.to_display_unit(5e8) - 0.5).abs() < 1e-12);
        assert_eq!(LogicalMetric::CpuLimit.to_display_unit(2.0), 2.0);
    }

    #[test]
    fn test_metric_query_shape() {
        assert_eq!(LogicalMetric::MemoryAvg.aggregation(), Aggregation::Avg);
        assert_eq!(LogicalMetric::MemoryLimit.aggregation(), Aggregation::Max);
        assert_eq!(LogicalMetric::CpuMax.backend_metric(), "kubernetes.cpu.usage.total");
        assert_eq!(LogicalMetric::ALL.len(), 8);
    }

    #[test]
    fn test_resource_usage_percent() {
        let usage = ResourceUsage::new(Some(50.0), None, None, Some(200.0));
        assert_eq!(usage.percent, Some(25.0));

        let no_limit = ResourceUsage::new(Some(50.0), None, None, None);
        assert_eq!(no_limit.percent, None);

        let zero_limit = ResourceUsage::new(Some(50.0), None, None, Some(0.0));
        assert_eq!(zero_limit.percent, None);

        let no_max = ResourceUsage::new(None, None, None, Some(2.0));
        assert_eq!(no_max.percent, None);
    }
}
