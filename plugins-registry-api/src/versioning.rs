use std::cmp::Ordering;

use semver::Version;

use crate::error::{RegistryError, RegistryResult};
use crate::models::PluginVersion;

/// Parse a strict SemVer 2.0 version string
///
/// # Errors
///
/// [`RegistryError::InvalidVersion`] for anything that is not
/// `major.minor.patch[-pre][+build]`, including `v1.0.0`, `1.0` and `latest`.
pub fn parse_version(raw: &str) -> RegistryResult<Version> {
    Version::parse(raw).map_err(|e| RegistryError::InvalidVersion {
        version: raw.to_string(),
        reason: e.to_string(),
    })
}

/// Oldest-first ordering used by retention
///
/// Valid versions order by SemVer precedence (build metadata ignored), ties
/// broken by creation time. Records whose version string does not parse sort
/// ahead of every valid version, among themselves by creation time, so they
/// are the first to be pruned. Record id is the final tie-break, which keeps
/// the order total.
pub fn compare_versions(a: &PluginVersion, b: &PluginVersion) -> Ordering {
    let by_age = a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id));
    match (Version::parse(&a.version), Version::parse(&b.version)) {
        (Ok(left), Ok(right)) => left.cmp_precedence(&right).then(by_age),
        (Err(_), Ok(_)) => Ordering::Less,
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Err(_)) => by_age,
    }
}

/// Sort oldest first in place
pub fn sort_oldest_first(versions: &mut [PluginVersion]) {
    versions.sort_by(compare_versions);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReleaseChannel;
    use chrono::{Duration, TimeZone, Utc};
    use proptest::prelude::*;
    use serde_json::json;

    fn version_record(id: i64, version: &str, age_secs: i64) -> PluginVersion {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let created = base + Duration::seconds(age_secs);
        PluginVersion {
            id,
            plugin_id: 1,
            version: version.to_string(),
            readme_content: None,
            config_schema: json!({}),
            config_values: None,
            object_key: format!("plugins/p/{version}/p-{version}.tgz"),
            download_url: String::new(),
            file_size: 0,
            checksum: String::new(),
            channel: ReleaseChannel::Stable,
            download_count: 0,
            security_scan_result: None,
            created_at: created,
            updated_at: created,
        }
    }

    #[test]
    fn test_parse_accepts_semver() {
        assert!(parse_version("1.0.0").is_ok());
        assert!(parse_version("2.1.0-beta.3+build.7").is_ok());
    }

    #[test]
    fn test_parse_rejects_loose_versions() {
        for raw in ["v1.0", "1.0", "latest", "", "v1.0.0", "1.0.0.0"] {
            let err = parse_version(raw).unwrap_err();
            assert!(
                matches!(&err, RegistryError::InvalidVersion { version, .. } if version == raw),
                "{raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_precedence_ordering() {
        let older = version_record(1, "1.10.0", 0);
        let newer = version_record(2, "1.9.0", 10);
        // Numeric, not lexical, and independent of creation time
        assert_eq!(compare_versions(&newer, &older), Ordering::Less);

        let pre = version_record(3, "2.0.0-rc.1", 0);
        let release = version_record(4, "2.0.0", 0);
        assert_eq!(compare_versions(&pre, &release), Ordering::Less);
    }

    #[test]
    fn test_build_metadata_ties_fall_back_to_age() {
        let first = version_record(1, "1.0.0+a", 0);
        let second = version_record(2, "1.0.0+b", 5);
        assert_eq!(compare_versions(&first, &second), Ordering::Less);
        assert_eq!(compare_versions(&second, &first), Ordering::Greater);
    }

    #[test]
    fn test_unparseable_sorts_first_by_age() {
        let mut versions = vec![
            version_record(1, "1.0.0", 0),
            version_record(2, "garbage", 50),
            version_record(3, "also-bad", 20),
        ];
        sort_oldest_first(&mut versions);
        let order: Vec<&str> = versions.iter().map(|v| v.version.as_str()).collect();
        assert_eq!(order, vec!["also-bad", "garbage", "1.0.0"]);
    }

    fn version_string() -> impl Strategy<Value = String> {
        prop_oneof![
            (0u64..5, 0u64..5, 0u64..5).prop_map(|(a, b, c)| format!("{a}.{b}.{c}")),
            (0u64..3, 0u64..3).prop_map(|(a, b)| format!("{a}.{b}.0-rc.{b}")),
            "[a-z]{1,6}".prop_map(|s| s),
        ]
    }

    proptest! {
        #[test]
        fn prop_ordering_is_total_and_antisymmetric(
            raw in proptest::collection::vec((version_string(), 0i64..100), 1..20)
        ) {
            let records: Vec<PluginVersion> = raw
                .iter()
                .enumerate()
                .map(|(i, (v, age))| version_record(i as i64, v, *age))
                .collect();

            for a in &records {
                for b in &records {
                    prop_assert_eq!(compare_versions(a, b), compare_versions(b, a).reverse());
                }
            }

            let mut sorted = records.clone();
            sort_oldest_first(&mut sorted);
            for pair in sorted.windows(2) {
                prop_assert_ne!(compare_versions(&pair[0], &pair[1]), Ordering::Greater);
            }
        }

        #[test]
        fn prop_valid_versions_follow_semver(
            a in (0u64..20, 0u64..20, 0u64..20),
            b in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let left = version_record(1, &format!("{}.{}.{}", a.0, a.1, a.2), 0);
            let right = version_record(2, &format!("{}.{}.{}", b.0, b.1, b.2), 0);
            if a != b {
                prop_assert_eq!(compare_versions(&left, &right), a.cmp(&b));
            }
        }
    }
}
