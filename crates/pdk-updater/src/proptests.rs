//! Property-based tests for version ordering and manifest parsing.

#![cfg(test)]

use std::cmp::Ordering;

use proptest::prelude::*;

use crate::manifest::{UpdateManifest, MAX_DIGEST_LEN, MIN_DIGEST_LEN};
use crate::version;

// ============================================================================
// Generators
// ============================================================================

fn arb_prerelease() -> impl Strategy<Value = Option<String>> {
    let tag = prop_oneof![
        Just("dev"),
        Just("alpha"),
        Just("a"),
        Just("beta"),
        Just("b"),
        Just("rc"),
        Just("pre"),
        Just("nightly"),
        Just("snapshot"),
    ];
    prop_oneof![
        Just(None),
        (tag, prop::option::of(0u32..50)).prop_map(|(tag, n)| {
            Some(match n {
                Some(n) => format!("{}.{}", tag, n),
                None => tag.to_string(),
            })
        }),
    ]
}

fn arb_version_core() -> impl Strategy<Value = String> {
    (0u64..50, 0u64..50, 0u64..50).prop_map(|(a, b, c)| format!("{}.{}.{}", a, b, c))
}

fn arb_version() -> impl Strategy<Value = String> {
    (arb_version_core(), arb_prerelease(), prop::option::of(0u32..999)).prop_map(
        |(core, pre, build)| {
            let mut v = core;
            if let Some(pre) = pre {
                v.push('-');
                v.push_str(&pre);
            }
            if let Some(build) = build {
                v.push('+');
                v.push_str(&build.to_string());
            }
            v
        },
    )
}

fn arb_file_name() -> impl Strategy<Value = String> {
    "[A-Za-z0-9]{1,12}".prop_map(|stem| format!("PaperDeck-Setup-{}.exe", stem))
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn prop_compare_is_reflexive(v in arb_version()) {
        prop_assert_eq!(version::compare(&v, &v), Ordering::Equal);
    }

    #[test]
    fn prop_compare_is_antisymmetric(a in arb_version(), b in arb_version()) {
        prop_assert_eq!(
            version::compare(&a, &b),
            version::compare(&b, &a).reverse()
        );
    }

    #[test]
    fn prop_compare_is_transitive(
        a in arb_version(),
        b in arb_version(),
        c in arb_version(),
    ) {
        let ab = version::compare(&a, &b);
        let bc = version::compare(&b, &c);
        if ab != Ordering::Greater && bc != Ordering::Greater {
            prop_assert_ne!(version::compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn prop_is_newer_is_strict(a in arb_version(), b in arb_version()) {
        // at most one direction can claim an update
        prop_assert!(!(version::is_newer(&a, &b) && version::is_newer(&b, &a)));
        prop_assert!(!version::is_newer(&a, &a));
    }

    #[test]
    fn prop_build_metadata_never_orders(v in arb_version_core(), build in 0u32..999) {
        let with_build = format!("{}+{}", v, build);
        prop_assert_eq!(version::compare(&v, &with_build), Ordering::Equal);
    }

    #[test]
    fn prop_v_prefix_never_orders(v in arb_version()) {
        let prefixed = format!("v{}", v);
        prop_assert_eq!(version::compare(&v, &prefixed), Ordering::Equal);
    }

    #[test]
    fn prop_stable_outranks_any_prerelease(
        core in arb_version_core(),
        pre in arb_prerelease().prop_filter("needs a suffix", Option::is_some),
    ) {
        let pre = format!("{}-{}", core, pre.unwrap());
        prop_assert_eq!(version::compare(&pre, &core), Ordering::Less);
    }

    #[test]
    fn prop_manifest_round_trips_fields(
        ver in arb_version_core(),
        file_name in arb_file_name(),
        size in 1u64..100_000_000,
    ) {
        let digest = "D".repeat(88);
        let text = format!(
            "version: {}\nfiles:\n  - url: {}\n    sha512: {}\n    size: {}\n",
            ver, file_name, digest, size
        );
        let manifest = UpdateManifest::parse(&text).unwrap();
        prop_assert_eq!(manifest.version, ver);
        prop_assert_eq!(manifest.file_name, file_name);
        prop_assert_eq!(manifest.sha512, digest);
        prop_assert_eq!(manifest.size, size);
    }

    #[test]
    fn prop_manifest_without_digest_never_parses(
        ver in arb_version_core(),
        file_name in arb_file_name(),
    ) {
        let text = format!(
            "version: {}\nfiles:\n  - url: {}\n    size: 1000\npath: {}\n",
            ver, file_name, file_name
        );
        prop_assert!(UpdateManifest::parse(&text).is_err());
    }

    #[test]
    fn prop_digest_length_gate(len in 0usize..200) {
        let digest = "A".repeat(len);
        let text = format!("version: 1.0.0\npath: app.exe\nsha512: {}\n", digest);
        let accepted = UpdateManifest::parse(&text).is_ok();
        prop_assert_eq!(accepted, (MIN_DIGEST_LEN..=MAX_DIGEST_LEN).contains(&len));
    }
}
