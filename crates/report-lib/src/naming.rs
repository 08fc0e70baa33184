//! Pod base name derivation
//!
//! Controllers append generated suffixes to pod names. The rules below are
//! evaluated in order and only the first match is stripped.

use regex::Regex;
use std::sync::OnceLock;

/// Ordered suffix patterns, most specific first
const SUFFIX_RULES: &[(&str, &str)] = &[
    ("replicaset-pod", r"-[0-9a-f]{8,10}-[0-9a-z]{5,7}$"),
    ("hash", r"-[0-9a-f]{8,16}$"),
    ("ordinal", r"-[0-9]+$"),
    ("random", r"-[a-z0-9]{5,10}$"),
];

static COMPILED_RULES: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();

fn rules() -> &'static [(&'static str, Regex)] {
    COMPILED_RULES.get_or_init(|| {
        SUFFIX_RULES
            .iter()
            .filter_map(|(name, pattern)| Regex::new(pattern).ok().map(|re| (*name, re)))
            .collect()
    })
}

/// Name of the first suffix rule matching `pod`, if any
pub fn matching_rule(pod: &str) -> Option<&'static str> {
    rules()
        .iter()
        .find(|(_, re)| re.is_match(pod))
        .map(|(name, _)| *name)
}

/// Strip at most one generated suffix from a pod name
pub fn base_name(pod: &str) -> String {
    for (_, re) in rules() {
        if let Some(m) = re.find(pod) {
            return pod[..m.start()].to_string();
        }
    }
    pod.to_string()
}
