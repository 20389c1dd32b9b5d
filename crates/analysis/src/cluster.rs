use std::collections::{BTreeMap, BTreeSet};

use once_cell::sync::Lazy;
use regex::Regex;
use runsight_protocol::{ExecutionRecord, FailureCluster, TestStatus};

static HEX_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"0x[0-9a-f]+|[0-9a-f]{8}-[0-9a-f-]{27,}").expect("static regex"));
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+").expect("static regex"));
static PATH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S*/\S+").expect("static regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

/// Normalize raw failure text into a comparable signature.
///
/// Run-specific identifiers (hex addresses, uuids, numbers, file paths) are
/// stripped so the same underlying failure lands on the same signature
/// across runs.
pub fn normalize_signature(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    let replaced = HEX_ID.replace_all(&lowered, "<id>");
    let replaced = PATH.replace_all(&replaced, "<path>");
    let replaced = NUMBER.replace_all(&replaced, "<n>");
    WHITESPACE.replace_all(&replaced, " ").trim().to_owned()
}

fn token_overlap(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() && tb.is_empty() {
        return 1.0;
    }
    let intersection = ta.intersection(&tb).count() as f64;
    let union = ta.union(&tb).count() as f64;
    intersection / union
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, i: usize) -> usize {
        if self.parent[i] != i {
            let root = self.find(self.parent[i]);
            self.parent[i] = root;
        }
        self.parent[i]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Smaller index wins so the representative is order-independent.
            let (keep, fold) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[fold] = keep;
        }
    }
}

/// Group failed executions into clusters of similar signatures.
///
/// The partition is the transitive closure of pairwise similarity over the
/// sorted set of distinct signatures, so it is independent of record
/// enumeration order.
pub(crate) fn cluster_failures(
    records: &[ExecutionRecord],
    similarity_threshold: f64,
) -> Vec<FailureCluster> {
    let mut by_signature: BTreeMap<String, (BTreeSet<String>, usize)> = BTreeMap::new();
    for record in records {
        if record.status != TestStatus::Failed {
            continue;
        }
        let signature = record
            .error_signature
            .as_deref()
            .map(normalize_signature)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unclassified failure".to_owned());
        let entry = by_signature.entry(signature).or_default();
        entry.0.insert(record.test_id.clone());
        entry.1 += 1;
    }

    // BTreeMap iteration gives the signatures in lexicographic order.
    let signatures: Vec<&String> = by_signature.keys().collect();
    let mut groups = UnionFind::new(signatures.len());
    for i in 0..signatures.len() {
        for j in (i + 1)..signatures.len() {
            if token_overlap(signatures[i], signatures[j]) >= similarity_threshold {
                groups.union(i, j);
            }
        }
    }

    let mut merged: BTreeMap<usize, FailureCluster> = BTreeMap::new();
    for (idx, (signature, (test_ids, count))) in by_signature.iter().enumerate() {
        let root = groups.find(idx);
        let cluster = merged.entry(root).or_insert_with(|| FailureCluster {
            // First signature reaching a root is the lexicographically
            // smallest member, because iteration is sorted and roots are
            // minimal indices.
            signature: signature.clone(),
            test_ids: Vec::new(),
            count: 0,
        });
        cluster.count += count;
        // Duplicates across merged signatures fall out in the sort+dedup below.
        cluster.test_ids.extend(test_ids.iter().cloned());
    }

    let mut clusters: Vec<FailureCluster> = merged.into_values().collect();
    for cluster in &mut clusters {
        cluster.test_ids.sort();
        cluster.test_ids.dedup();
    }
    clusters.sort_by(|a, b| b.count.cmp(&a.count).then(a.signature.cmp(&b.signature)));
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn failure(test_id: &str, run_id: &str, message: &str) -> ExecutionRecord {
        ExecutionRecord {
            test_id: test_id.to_owned(),
            test_name: test_id.to_owned(),
            run_id: run_id.to_owned(),
            status: TestStatus::Failed,
            duration_ms: None,
            platform: None,
            owner: None,
            timestamp: Utc::now(),
            error_signature: Some(message.to_owned()),
        }
    }

    #[test]
    fn identifiers_are_stripped_from_signatures() {
        let a = normalize_signature("ConnectionError at 0xdeadbeef: retry 3 of 5");
        let b = normalize_signature("connectionerror at 0xcafe:  retry 4 of 5");
        assert_eq!(a, b);
    }

    #[test]
    fn similar_failures_merge_dissimilar_stay_apart() {
        let records = vec![
            failure("t1", "r1", "Timeout waiting for node 12 to boot"),
            failure("t2", "r2", "Timeout waiting for node 99 to boot"),
            failure("t3", "r3", "AssertionError: wrong checksum"),
        ];
        let clusters = cluster_failures(&records, 0.6);
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].count, 2);
        assert_eq!(clusters[0].test_ids, vec!["t1".to_owned(), "t2".to_owned()]);
        assert_eq!(clusters[1].count, 1);
    }

    #[test]
    fn partition_is_input_order_insensitive() {
        let mut records = vec![
            failure("t1", "r1", "Timeout waiting for node 12 to boot"),
            failure("t2", "r2", "Timeout waiting for node 99 to boot"),
            failure("t3", "r3", "AssertionError: wrong checksum"),
            failure("t4", "r4", "assertionerror: wrong checksum"),
        ];
        let forward = cluster_failures(&records, 0.6);
        records.rotate_left(2);
        records.swap(0, 1);
        let shuffled = cluster_failures(&records, 0.6);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn failures_without_text_still_appear() {
        let mut record = failure("t1", "r1", "");
        record.error_signature = None;
        let clusters = cluster_failures(&[record], 0.6);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].signature, "unclassified failure");
    }
}
