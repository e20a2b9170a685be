//! Lenient version comparison.
//!
//! Release feeds are not always strict semver, so parsing here is
//! tolerant: a leading `v` is stripped, build metadata after `+` is
//! ignored, missing numeric components count as zero, and unrecognized
//! prerelease tags still order deterministically.

use std::cmp::Ordering;

/// Prerelease maturity, least stable first. Tags that are not
/// recognized sort after every known tag but still before the stable
/// release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum PreRank {
    Dev,
    Alpha,
    Beta,
    Rc,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ParsedVersion {
    numbers: Vec<u64>,
    prerelease: Option<(PreRank, u64)>,
}

/// Compare two version strings.
///
/// Numeric components are compared left to right, then a stable version
/// outranks any prerelease of the same numeric core, then prereleases
/// order by tag maturity and numeric tail (`beta.2` > `beta.1`).
pub fn compare(a: &str, b: &str) -> Ordering {
    let a = parse(a);
    let b = parse(b);

    let len = a.numbers.len().max(b.numbers.len());
    for i in 0..len {
        let na = a.numbers.get(i).copied().unwrap_or(0);
        let nb = b.numbers.get(i).copied().unwrap_or(0);
        match na.cmp(&nb) {
            Ordering::Equal => continue,
            other => return other,
        }
    }

    match (a.prerelease, b.prerelease) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(pa), Some(pb)) => pa.0.cmp(&pb.0).then(pa.1.cmp(&pb.1)),
    }
}

/// True when `candidate` is strictly newer than `current`.
pub fn is_newer(current: &str, candidate: &str) -> bool {
    compare(current, candidate) == Ordering::Less
}

fn parse(version: &str) -> ParsedVersion {
    let s = version.trim();
    let s = s.strip_prefix('v').or_else(|| s.strip_prefix('V')).unwrap_or(s);
    // build metadata never participates in ordering
    let s = match s.split_once('+') {
        Some((head, _)) => head,
        None => s,
    };
    let (core, pre) = match s.split_once('-') {
        Some((head, tail)) => (head, Some(tail)),
        None => (s, None),
    };
    ParsedVersion {
        numbers: core.split('.').map(leading_number).collect(),
        prerelease: pre.map(parse_prerelease),
    }
}

/// Numeric prefix of a component, zero when there is none or it does
/// not fit in a u64.
fn leading_number(component: &str) -> u64 {
    let digits = component
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .count();
    component[..digits].parse().unwrap_or(0)
}

fn parse_prerelease(pre: &str) -> (PreRank, u64) {
    let (token, token_end) = match pre.find(|c: char| c.is_ascii_alphabetic()) {
        Some(start) => {
            let rest = &pre[start..];
            let len = rest
                .find(|c: char| !c.is_ascii_alphabetic())
                .unwrap_or(rest.len());
            (&rest[..len], start + len)
        }
        None => ("", 0),
    };
    let rank = match token.to_ascii_lowercase().as_str() {
        "dev" => PreRank::Dev,
        "a" | "alpha" => PreRank::Alpha,
        "b" | "beta" => PreRank::Beta,
        "rc" | "pre" => PreRank::Rc,
        _ => PreRank::Unknown,
    };
    let after_token = &pre[token_end..];
    let tail = after_token
        .find(|c: char| c.is_ascii_digit())
        .map(|i| leading_number(&after_token[i..]))
        .unwrap_or(0);
    (rank, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering() {
        assert_eq!(compare("1.2.3", "1.2.4"), Ordering::Less);
        assert_eq!(compare("1.2.4", "1.2.3"), Ordering::Greater);
        assert_eq!(compare("1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare("2.0.0", "1.99.99"), Ordering::Greater);
    }

    #[test]
    fn test_missing_components_are_zero() {
        assert_eq!(compare("1.2", "1.2.0"), Ordering::Equal);
        assert_eq!(compare("1", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.2", "1.2.1"), Ordering::Less);
    }

    #[test]
    fn test_v_prefix_stripped() {
        assert_eq!(compare("v1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare("V1.2.3", "1.2.3"), Ordering::Equal);
        assert_eq!(compare("v1.2.3", "v1.2.4"), Ordering::Less);
    }

    #[test]
    fn test_build_metadata_ignored() {
        assert_eq!(compare("1.0.0+20240101", "1.0.0"), Ordering::Equal);
        assert_eq!(compare("1.0.0+abc", "1.0.0+def"), Ordering::Equal);
        assert_eq!(compare("1.0.1+old", "1.0.0+new"), Ordering::Greater);
    }

    #[test]
    fn test_stable_outranks_prerelease() {
        assert_eq!(compare("2.0.0-beta.1", "2.0.0"), Ordering::Less);
        assert_eq!(compare("2.0.0", "2.0.0-rc.3"), Ordering::Greater);
        // but a prerelease of a higher core still wins
        assert_eq!(compare("2.0.1-beta.1", "2.0.0"), Ordering::Greater);
    }

    #[test]
    fn test_prerelease_tag_ordering() {
        assert_eq!(compare("1.0.0-dev", "1.0.0-alpha"), Ordering::Less);
        assert_eq!(compare("1.0.0-alpha", "1.0.0-beta"), Ordering::Less);
        assert_eq!(compare("1.0.0-beta", "1.0.0-rc"), Ordering::Less);
        assert_eq!(compare("1.0.0-rc", "1.0.0"), Ordering::Less);
        // short forms are aliases
        assert_eq!(compare("1.0.0-a.1", "1.0.0-alpha.1"), Ordering::Equal);
        assert_eq!(compare("1.0.0-b.1", "1.0.0-beta.1"), Ordering::Equal);
        assert_eq!(compare("1.0.0-pre.1", "1.0.0-rc.1"), Ordering::Equal);
    }

    #[test]
    fn test_unknown_tags_sort_after_known_but_before_stable() {
        assert_eq!(compare("1.0.0-nightly", "1.0.0-rc"), Ordering::Greater);
        assert_eq!(compare("1.0.0-snapshot", "1.0.0-beta"), Ordering::Greater);
        assert_eq!(compare("1.0.0-nightly", "1.0.0"), Ordering::Less);
    }

    #[test]
    fn test_prerelease_numeric_tail() {
        assert_eq!(compare("1.0.0-beta.2", "1.0.0-beta.1"), Ordering::Greater);
        assert_eq!(compare("1.0.0-beta.2", "1.0.0-beta.10"), Ordering::Less);
        assert_eq!(compare("1.0.0-rc1", "1.0.0-rc2"), Ordering::Less);
        assert_eq!(compare("1.0.0-beta", "1.0.0-beta.1"), Ordering::Less);
    }

    #[test]
    fn test_tag_case_insensitive() {
        assert_eq!(compare("1.0.0-BETA.1", "1.0.0-beta.1"), Ordering::Equal);
        assert_eq!(compare("1.0.0-RC", "1.0.0-rc"), Ordering::Equal);
    }

    #[test]
    fn test_garbage_components_degrade_to_zero() {
        assert_eq!(compare("x.y.z", "0.0.0"), Ordering::Equal);
        assert_eq!(compare("1.two.3", "1.0.3"), Ordering::Equal);
        assert_eq!(compare("", "0.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_is_newer() {
        assert!(is_newer("1.2.3", "1.2.4"));
        assert!(is_newer("1.2.3", "2.0.0-beta.1"));
        assert!(!is_newer("1.2.3", "1.2.3"));
        assert!(!is_newer("1.2.4", "1.2.3"));
        assert!(!is_newer("2.0.0", "2.0.0-rc.1"));
    }
}
