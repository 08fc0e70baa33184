//! Row ordering for presentation
//!
//! All modes use a stable sort, so rows comparing equal keep their
//! relative order from the reducer.

use crate::models::PodRow;
use serde::Serialize;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Presentation order chosen by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SortMode {
    #[default]
    MemoryDesc,
    MemoryAsc,
    CpuDesc,
    CpuAsc,
    Name,
    Namespace,
}

impl SortMode {
    pub const ALL: [SortMode; 6] = [
        SortMode::MemoryDesc,
        SortMode::MemoryAsc,
        SortMode::CpuDesc,
        SortMode::CpuAsc,
        SortMode::Name,
        SortMode::Namespace,
    ];

    /// Identifier accepted on the command line
    pub fn key(&self) -> &'static str {
        match self {
            SortMode::MemoryDesc => "memory-desc",
            SortMode::MemoryAsc => "memory-asc",
            SortMode::CpuDesc => "cpu-desc",
            SortMode::CpuAsc => "cpu-asc",
            SortMode::Name => "name",
            SortMode::Namespace => "namespace",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortMode::MemoryDesc => "Memory (high to low)",
            SortMode::MemoryAsc => "Memory (low to high)",
            SortMode::CpuDesc => "CPU (high to low)",
            SortMode::CpuAsc => "CPU (low to high)",
            SortMode::Name => "Name",
            SortMode::Namespace => "Namespace",
        }
    }

    fn compare(&self, a: &PodRow, b: &PodRow) -> Ordering {
        match self {
            SortMode::MemoryDesc => b.memory_max().total_cmp(&a.memory_max()),
            SortMode::MemoryAsc => a.memory_max().total_cmp(&b.memory_max()),
            SortMode::CpuDesc => {
                let key = |r: &PodRow| r.cpu.max.unwrap_or(0.0);
                key(b).total_cmp(&key(a))
            }
            SortMode::CpuAsc => {
                let key = |r: &PodRow| r.cpu.max.unwrap_or(f64::INFINITY);
                key(a).total_cmp(&key(b))
            }
            SortMode::Name => a.base_name.cmp(&b.base_name),
            SortMode::Namespace => b
                .namespace
                .cmp(&a.namespace)
                .then_with(|| b.memory_max().total_cmp(&a.memory_max())),
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for SortMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SortMode::ALL
            .into_iter()
            .find(|mode| mode.key() == wanted || mode.label().to_ascii_lowercase() == wanted)
            .ok_or_else(|| {
                let keys: Vec<&str> = SortMode::ALL.iter().map(SortMode::key).collect();
                format!("unknown sort mode '{}', expected one of: {}", s, keys.join(", "))
            })
    }
}

/// Sort rows in place
pub fn sort_rows(rows: &mut [PodRow], mode: SortMode) {
    rows.sort_by(|a, b| mode.compare(a, b));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PodStatus, ResourceUsage};

    fn row(pod: &str, namespace: &str, memory: f64, cpu: Option<f64>) -> PodRow {
        PodRow {
            cluster: "prod".to_string(),
            namespace: namespace.to_string(),
            pod: pod.to_string(),
            base_name: crate::naming::base_name(pod),
            memory: ResourceUsage::new(Some(memory), None, None, None),
            cpu: ResourceUsage::new(cpu, None, None, None),
            status: PodStatus::Completed,
            last_cpu_sample_ms: None,
        }
    }

    fn pods(rows: &[PodRow]) -> Vec<&str> {
        rows.iter().map(|r| r.pod.as_str()).collect()
    }

    #[test]
    fn test_memory_orders() {
        let mut rows = vec![row("a", "ns", 100.0, None), row("b", "ns", 10.0, None), row("c", "ns", 50.0, None)];

        sort_rows(&mut rows, SortMode::MemoryAsc);
        assert_eq!(pods(&rows), vec!["b", "c", "a"]);

        sort_rows(&mut rows, SortMode::MemoryDesc);
        assert_eq!(pods(&rows), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_cpu_orders_place_missing_values() {
        let mut rows = vec![
            row("none", "ns", 1.0, None),
            row("low", "ns", 1.0, Some(0.1)),
            row("high", "ns", 1.0, Some(2.0)),
        ];

        sort_rows(&mut rows, SortMode::CpuDesc);
        assert_eq!(pods(&rows), vec!["high", "low", "none"]);

        sort_rows(&mut rows, SortMode::CpuAsc);
        assert_eq!(pods(&rows), vec!["low", "high", "none"]);
    }

    #[test]
    fn test_name_uses_base_name() {
        let mut rows = vec![row("x", "ns", 1.0, None), row("y", "ns", 1.0, None)];
        rows[0].base_name = "api-7".to_string();
        rows[1].base_name = "api-2".to_string();
        sort_rows(&mut rows, SortMode::Name);
        assert_eq!(pods(&rows), vec!["y", "x"]);

        // Both strip to "api", so the input order is kept
        let mut rows = vec![row("api-7", "ns", 1.0, None), row("api-2", "ns", 1.0, None)];
        sort_rows(&mut rows, SortMode::Name);
        assert_eq!(pods(&rows), vec!["api-7", "api-2"]);
    }

    #[test]
    fn test_namespace_composite_descending() {
        let mut rows = vec![
            row("a", "alpha", 10.0, None),
            row("b", "beta", 5.0, None),
            row("c", "alpha", 20.0, None),
            row("d", "beta", 50.0, None),
        ];
        sort_rows(&mut rows, SortMode::Namespace);
        assert_eq!(pods(&rows), vec!["d", "b", "c", "a"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut rows = vec![
            row("first", "ns", 10.0, None),
            row("second", "ns", 10.0, None),
            row("third", "ns", 10.0, None),
        ];
        for mode in SortMode::ALL {
            let mut sorted = rows.clone();
            sort_rows(&mut sorted, mode);
            assert_eq!(pods(&sorted), vec!["first", "second", "third"], "{:?}", mode);
        }
        sort_rows(&mut rows, SortMode::MemoryDesc);
        assert_eq!(pods(&rows), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_parse_sort_mode() {
        assert_eq!("memory-asc".parse::<SortMode>().unwrap(), SortMode::MemoryAsc);
        assert_eq!("CPU (high to low)".parse::<SortMode>().unwrap(), SortMode::CpuDesc);
        assert_eq!(" Namespace ".parse::<SortMode>().unwrap(), SortMode::Namespace);
        assert!("size".parse::<SortMode>().is_err());
    }
}
