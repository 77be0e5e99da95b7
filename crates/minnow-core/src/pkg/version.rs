//! Version range resolution using semver.
//!
//! npm range syntax is wider than what the `semver` crate accepts, so ranges
//! are normalized first:
//! - `1.2.3` means exactly that version (the crate would read it as `^1.2.3`)
//! - hyphen ranges: `1.0.0 - 2.0.0`
//! - x-ranges: `1.x`, `1.2.x`, `*`
//! - space-separated comparators: `>= 2.1.2 < 3.0.0`
//! - `||` alternatives

use super::error::PkgError;
use semver::{Comparator, Op, Version, VersionReq};

/// The tag that resolves to the registry's `dist-tags.latest`.
pub const LATEST_TAG: &str = "latest";

/// A parsed npm-style version range: a union of semver requirements.
#[derive(Debug, Clone)]
pub struct Range {
    alternatives: Vec<VersionReq>,
}

impl Range {
    /// Parse a range expression.
    ///
    /// # Errors
    /// Returns `PKG_SPEC_INVALID` if no alternative parses.
    pub fn parse(range: &str) -> Result<Self, PkgError> {
        let alternatives: Vec<VersionReq> = if range.contains("||") {
            // Unparseable alternatives are dropped as long as one survives
            range
                .split("||")
                .map(str::trim)
                .filter(|alt| !alt.is_empty())
                .filter_map(|alt| parse_single(alt).ok())
                .collect()
        } else {
            vec![parse_single(range)?]
        };

        if alternatives.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid version range '{range}': no valid alternatives"
            )));
        }

        Ok(Self { alternatives })
    }

    /// Whether `version` satisfies any alternative.
    #[must_use]
    pub fn matches(&self, version: &Version) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }

    /// The lowest version this range admits, if any.
    ///
    /// Mirrors npm's `minVersion`: every alternative contributes the tightest
    /// lower bound of its comparators, and the smallest of those wins.
    #[must_use]
    pub fn floor(&self) -> Option<Version> {
        self.alternatives.iter().filter_map(req_floor).min()
    }
}

/// Resolve a range against a set of published versions.
///
/// Returns the highest version satisfying `range` under semver precedence.
/// Unparseable published versions are ignored.
///
/// # Errors
/// Returns `PKG_VERSION_NOT_FOUND` if nothing satisfies the range, or
/// `PKG_SPEC_INVALID` if the range does not parse.
pub fn resolve_version<'a, I>(name: &str, available: I, range: &str) -> Result<String, PkgError>
where
    I: IntoIterator<Item = &'a str>,
{
    let parsed_range = Range::parse(range)?;

    available
        .into_iter()
        .filter_map(|v| Version::parse(v).ok())
        .filter(|v| parsed_range.matches(v))
        .max()
        .map(|v| v.to_string())
        .ok_or_else(|| PkgError::version_not_found(name, range))
}

/// Check whether a concrete version satisfies a range.
///
/// Returns `false` if either side fails to parse.
#[must_use]
pub fn version_satisfies(version: &str, range: &str) -> bool {
    let Ok(version) = Version::parse(version) else {
        return false;
    };
    Range::parse(range).is_ok_and(|r| r.matches(&version))
}

/// Lowest version admitted by `range`, or `None` if it has no computable floor.
#[must_use]
pub fn range_floor(range: &str) -> Option<Version> {
    Range::parse(range).ok()?.floor()
}

/// Whether the range string names one exact version.
#[must_use]
pub fn is_exact_version(range: &str) -> bool {
    Version::parse(strip_exact_prefix(range.trim())).is_ok()
}

fn strip_exact_prefix(range: &str) -> &str {
    range
        .strip_prefix('=')
        .or_else(|| range.strip_prefix('v'))
        .unwrap_or(range)
        .trim()
}

fn parse_single(range: &str) -> Result<VersionReq, PkgError> {
    let range = range.trim();
    let invalid = |e: semver::Error| {
        PkgError::spec_invalid(format!("Invalid version range '{range}': {e}"))
    };

    if range.is_empty() {
        return Ok(VersionReq::STAR);
    }

    if let Ok(exact) = Version::parse(strip_exact_prefix(range)) {
        return VersionReq::parse(&format!("={exact}")).map_err(invalid);
    }

    if let Some((start, end)) = parse_hyphen_range(range) {
        return VersionReq::parse(&format!(">={start}, <={end}")).map_err(invalid);
    }

    if range.contains('x') || range.contains('X') || range == "*" {
        return VersionReq::parse(&convert_x_range(range)).map_err(invalid);
    }

    VersionReq::parse(&convert_space_separated_comparators(range)).map_err(invalid)
}

/// Parse a hyphen range like "1.0.0 - 2.0.0".
fn parse_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    (!start.is_empty() && !end.is_empty()).then_some((start, end))
}

/// Convert x-range to semver range.
fn convert_x_range(range: &str) -> String {
    if range == "*" || range == "x" || range == "X" {
        return ">=0.0.0".to_string();
    }

    let parts: Vec<&str> = range.split('.').collect();

    match parts.as_slice() {
        [major, "x" | "X" | "*"] | [major, "x" | "X" | "*", "x" | "X" | "*"] => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, "x" | "X" | "*"] => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    range.replace(['x', 'X'], "0")
}

/// Convert npm's space-separated comparators (`>= 2.1.2 < 3.0.0`) to the
/// comma-separated form the semver crate parses (`>=2.1.2, <3.0.0`).
fn convert_space_separated_comparators(range: &str) -> String {
    let mut comparators: Vec<String> = Vec::new();
    let mut pending_op = String::new();

    for token in range.split_whitespace() {
        let token = token.trim_end_matches(',');
        if token.is_empty() {
            continue;
        }
        if token.chars().any(|c| c.is_ascii_digit()) {
            comparators.push(format!("{pending_op}{token}"));
            pending_op.clear();
        } else {
            // Operator separated from its version by a space
            pending_op.push_str(token);
        }
    }

    if !pending_op.is_empty() {
        comparators.push(pending_op);
    }

    comparators.join(", ")
}

/// Tightest lower bound of one requirement, checked against the requirement.
fn req_floor(req: &VersionReq) -> Option<Version> {
    let floor = req
        .comparators
        .iter()
        .map(comparator_floor)
        .max()
        .unwrap_or_else(|| Version::new(0, 0, 0));

    req.matches(&floor).then_some(floor)
}

fn comparator_floor(cmp: &Comparator) -> Version {
    let minor = cmp.minor.unwrap_or(0);
    let patch = cmp.patch.unwrap_or(0);

    match cmp.op {
        Op::Greater => match (cmp.minor, cmp.patch) {
            (Some(minor), Some(patch)) if cmp.pre.is_empty() => {
                Version::new(cmp.major, minor, patch + 1)
            }
            (Some(minor), Some(patch)) => {
                // >1.0.0-beta admits 1.0.0-beta.0
                let mut v = Version::new(cmp.major, minor, patch);
                v.pre = semver::Prerelease::new(&format!("{}.0", cmp.pre))
                    .unwrap_or(semver::Prerelease::EMPTY);
                v
            }
            (Some(minor), None) => Version::new(cmp.major, minor + 1, 0),
            _ => Version::new(cmp.major + 1, 0, 0),
        },
        Op::Less | Op::LessEq => Version::new(0, 0, 0),
        _ => {
            let mut v = Version::new(cmp.major, minor, patch);
            v.pre = cmp.pre.clone();
            v
        }
    }
}
