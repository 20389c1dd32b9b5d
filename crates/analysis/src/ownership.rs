use std::collections::BTreeMap;

use runsight_protocol::ExecutionRecord;

/// External ownership lookup capability.
///
/// May be a static mapping or an adapter over a directory service; the
/// analysis engine only requires that lookups are deterministic for the
/// duration of one analysis.
pub trait OwnerResolver: Send + Sync {
    fn owner_of(&self, test_id: &str) -> Option<String>;
}

/// Resolver backed by a fixed map.
#[derive(Debug, Clone, Default)]
pub struct StaticOwnerMap {
    owners: BTreeMap<String, String>,
}

impl StaticOwnerMap {
    pub fn new(owners: BTreeMap<String, String>) -> Self {
        Self { owners }
    }
}

impl OwnerResolver for StaticOwnerMap {
    fn owner_of(&self, test_id: &str) -> Option<String> {
        self.owners.get(test_id).cloned()
    }
}

/// Map every test id seen in the records to an owner.
///
/// Resolution order: resolver, then the owner attribute on the record
/// itself, then `"unknown"`. Unmapped tests are reported, never omitted.
pub(crate) fn attribute(
    records: &[ExecutionRecord],
    resolver: &dyn OwnerResolver,
) -> BTreeMap<String, String> {
    let mut ownership = BTreeMap::new();
    for record in records {
        ownership
            .entry(record.test_id.clone())
            .or_insert_with(|| {
                resolver
                    .owner_of(&record.test_id)
                    .or_else(|| record.owner.clone())
                    .unwrap_or_else(|| "unknown".to_owned())
            });
    }
    ownership
}
