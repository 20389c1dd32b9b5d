//! Fixed filter vocabularies.
//!
//! Filter values coming out of interpretation are checked against these
//! tables; anything unknown is rejected instead of being passed upstream.

/// Platforms the upstream service tags executions with.
pub const PLATFORMS: &[&str] = &["aws", "gcp", "azure", "vsphere", "openstack"];

/// Aliases seen in user phrasing, normalized to the canonical platform name.
const PLATFORM_ALIASES: &[(&str, &str)] = &[
    ("amazon", "aws"),
    ("ec2", "aws"),
    ("google", "gcp"),
    ("google cloud", "gcp"),
    ("microsoft", "azure"),
    ("vmware", "vsphere"),
];

/// Normalize a platform name to the fixed vocabulary.
///
/// Returns `None` for values outside the vocabulary; the caller surfaces
/// those as an invalid-filter error rather than guessing.
pub fn normalize_platform(raw: &str) -> Option<&'static str> {
    let lowered = raw.trim().to_ascii_lowercase();
    if let Some(p) = PLATFORMS.iter().find(|p| **p == lowered) {
        return Some(p);
    }
    PLATFORM_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lowered)
        .map(|(_, canonical)| *canonical)
}
