//! Per-run record of accepted package resolutions.

use super::version::{is_exact_version, range_floor, version_satisfies, LATEST_TAG};
use semver::Version;
use std::collections::BTreeMap;

/// What was accepted for one package name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledEntry {
    /// Range string as it was requested (e.g. `^1.0.0`, `latest`).
    pub requested: String,
    /// Concrete version the entry is compared as.
    pub baseline: Version,
    /// Version placed on disk.
    pub resolved: Version,
}

impl InstalledEntry {
    /// Build an entry for `requested` that resolved to `resolved`.
    ///
    /// Exact versions and `latest` compare as the resolved version; other
    /// ranges compare as their floor.
    #[must_use]
    pub fn new(requested: impl Into<String>, resolved: Version) -> Self {
        let requested = requested.into();
        let baseline = if requested == LATEST_TAG || is_exact_version(&requested) {
            resolved.clone()
        } else {
            range_floor(&requested).unwrap_or_else(|| resolved.clone())
        };

        Self {
            requested,
            baseline,
            resolved,
        }
    }

    /// Whether this entry already answers a request for `requested`, whose
    /// effective range (with `latest` substituted) is `effective_range`.
    #[must_use]
    pub fn satisfies(&self, requested: &str, effective_range: &str) -> bool {
        self.requested == requested
            || version_satisfies(&self.baseline.to_string(), effective_range)
    }
}

/// Name → accepted resolution. At most one entry per name.
///
/// Created empty for each install run and passed to the installer
/// explicitly.
#[derive(Debug, Clone, Default)]
pub struct InstalledSet {
    entries: BTreeMap<String, InstalledEntry>,
}

impl InstalledSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested range recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|e| e.requested.as_str())
    }

    /// Full entry recorded for `name`.
    #[must_use]
    pub fn entry(&self, name: &str) -> Option<&InstalledEntry> {
        self.entries.get(name)
    }

    /// Record an accepted resolution, replacing any earlier one.
    pub fn record(&mut self, name: impl Into<String>, entry: InstalledEntry) {
        self.entries.insert(name.into(), entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &InstalledEntry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }
}
