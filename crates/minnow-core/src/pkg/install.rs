//! Recursive package installation.
//!
//! Requests are processed one at a time from an explicit worklist. A
//! package's dependencies are pushed on top of the stack when it installs,
//! so its whole subtree drains before the next sibling starts.
//!
//! Repeated requests for one name are settled against the [`InstalledSet`]:
//!
//! | recorded entry                          | outcome                      |
//! |-----------------------------------------|------------------------------|
//! | none                                    | install                      |
//! | satisfies the request                   | skip (already satisfied)     |
//! | resolved version older than the entry   | skip with a warning          |
//! | resolved version same or newer          | overwrite with a warning     |
//!
//! A request for a package whose subtree is still draining is a cycle and is
//! skipped without touching the registry.

use super::error::PkgError;
use super::installed::{InstalledEntry, InstalledSet};
use super::manifest::Manifest;
use super::registry::Registry;
use super::spec::DependencySpec;
use super::tarball::unpack_tarball;
use super::version::{resolve_version, LATEST_TAG};
use crate::paths::{node_modules_dir, package_dir};
use semver::Version;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Why a request did not install anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The recorded entry already satisfies the request.
    AlreadySatisfied,
    /// The request resolved older than the version on disk.
    NewerInstalled { installed: Version },
    /// The package is an ancestor of this request.
    Cycle,
}

/// Result of processing one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    Installed {
        version: Version,
        /// Version that was on disk before, if this overwrote one.
        replaced: Option<Version>,
    },
    Skipped(SkipReason),
}

/// One processed request, in processing order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRecord {
    pub name: String,
    pub requested: String,
    pub outcome: InstallOutcome,
}

/// Summary of a whole install run.
#[derive(Debug, Clone, Default)]
pub struct InstallReport {
    pub records: Vec<InstallRecord>,
    pub installed: InstalledSet,
    /// Manifest entries that were ignored.
    pub warnings: Vec<PkgError>,
}

impl InstallReport {
    /// Number of requests that placed files on disk.
    #[must_use]
    pub fn installed_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| matches!(r.outcome, InstallOutcome::Installed { .. }))
            .count()
    }

    /// Number of requests that were skipped.
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.records.len() - self.installed_count()
    }
}

enum Work {
    Request(DependencySpec),
    /// Marks the end of a package's subtree.
    Finish(String),
}

enum Step {
    Installed {
        version: Version,
        replaced: Option<Version>,
        dependencies: Vec<DependencySpec>,
    },
    Skipped(SkipReason),
}

/// Installs packages from a [`Registry`] into an install root
/// (`<project>/node_modules`).
#[derive(Debug)]
pub struct PackageInstaller<R> {
    registry: R,
    install_root: PathBuf,
}

impl<R: Registry> PackageInstaller<R> {
    /// Create an installer that extracts into `install_root`.
    pub fn new(registry: R, install_root: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            install_root: install_root.into(),
        }
    }

    /// Create an installer for a project's `node_modules`.
    pub fn for_project(registry: R, project_dir: &Path) -> Self {
        Self::new(registry, node_modules_dir(project_dir))
    }

    #[must_use]
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    #[must_use]
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Install one request and its transitive dependencies.
    ///
    /// # Errors
    /// Aborts on the first network, resolution, or extraction failure.
    pub async fn install(
        &self,
        dep: &DependencySpec,
        installed: &mut InstalledSet,
    ) -> Result<Vec<InstallRecord>, PkgError> {
        self.install_all(std::slice::from_ref(dep), installed).await
    }

    /// Install a list of requests in order, each with its transitive
    /// dependencies.
    ///
    /// # Errors
    /// Aborts on the first network, resolution, or extraction failure.
    /// Entries recorded before the failure stay in `installed`.
    pub async fn install_all(
        &self,
        deps: &[DependencySpec],
        installed: &mut InstalledSet,
    ) -> Result<Vec<InstallRecord>, PkgError> {
        let mut stack: Vec<Work> = deps.iter().rev().cloned().map(Work::Request).collect();
        let mut in_progress: HashSet<String> = HashSet::new();
        let mut records = Vec::new();

        while let Some(work) = stack.pop() {
            let dep = match work {
                Work::Request(dep) => dep,
                Work::Finish(name) => {
                    in_progress.remove(&name);
                    continue;
                }
            };

            let step = if in_progress.contains(&dep.name) {
                Step::Skipped(Self::cycle(&dep, installed))
            } else {
                self.process(&dep, installed).await?
            };

            let outcome = match step {
                Step::Installed {
                    version,
                    replaced,
                    dependencies,
                } => {
                    in_progress.insert(dep.name.clone());
                    stack.push(Work::Finish(dep.name.clone()));
                    stack.extend(dependencies.into_iter().rev().map(Work::Request));
                    InstallOutcome::Installed { version, replaced }
                }
                Step::Skipped(reason) => InstallOutcome::Skipped(reason),
            };

            records.push(InstallRecord {
                name: dep.name,
                requested: dep.range,
                outcome,
            });
        }

        Ok(records)
    }

    fn cycle(dep: &DependencySpec, installed: &InstalledSet) -> SkipReason {
        let satisfied = installed
            .entry(&dep.name)
            .is_some_and(|entry| entry.satisfies(&dep.range, &dep.range));

        if satisfied {
            debug!(name = %dep.name, range = %dep.range, "Cycle already satisfied");
        } else {
            warn!(
                name = %dep.name,
                range = %dep.range,
                installed = ?installed.get(&dep.name),
                "Dependency cycle; keeping the version being installed"
            );
        }

        SkipReason::Cycle
    }

    async fn process(
        &self,
        dep: &DependencySpec,
        installed: &mut InstalledSet,
    ) -> Result<Step, PkgError> {
        let name = dep.name.as_str();
        debug!(name = %name, range = %dep.range, "Processing request");

        let metadata = self.registry.fetch_metadata(name).await?;

        let effective_range = if dep.range == LATEST_TAG {
            metadata
                .latest()
                .ok_or_else(|| PkgError::version_not_found(name, LATEST_TAG))?
                .to_string()
        } else {
            dep.range.clone()
        };

        let resolved_str = resolve_version(name, metadata.version_strings(), &effective_range)?;
        let resolved = Version::parse(&resolved_str).map_err(|e| {
            PkgError::registry(format!("Invalid version '{resolved_str}' for {name}: {e}"))
        })?;
        debug!(name = %name, version = %resolved, "Resolved version");

        let mut replaced = None;
        if let Some(entry) = installed.entry(name) {
            if entry.satisfies(&dep.range, &effective_range) || resolved == entry.resolved {
                if entry.requested == dep.range {
                    debug!(name = %name, installed = %entry.requested, "Already satisfied");
                } else {
                    warn!(
                        name = %name,
                        requested = %dep.range,
                        installed = %entry.requested,
                        version = %entry.resolved,
                        "Installed version already satisfies request; skipping"
                    );
                }
                return Ok(Step::Skipped(SkipReason::AlreadySatisfied));
            }

            // Never downgrade what is on disk.
            if resolved < entry.resolved {
                warn!(
                    name = %name,
                    requested = %dep.range,
                    installed = %entry.requested,
                    "Newer version already installed; skipping"
                );
                return Ok(Step::Skipped(SkipReason::NewerInstalled {
                    installed: entry.resolved.clone(),
                }));
            }

            warn!(
                name = %name,
                requested = %dep.range,
                installed = %entry.requested,
                version = %resolved,
                "Conflicting version requested; replacing installed package"
            );
            replaced = Some(entry.resolved.clone());
        }

        let tarball_url = metadata.tarball_url(&resolved_str).ok_or_else(|| {
            PkgError::registry(format!("No tarball URL for {name}@{resolved_str}"))
        })?;

        debug!(url = %tarball_url, "Downloading tarball");
        let bytes = self.registry.fetch_tarball(tarball_url).await?;
        debug!(size = bytes.len(), "Downloaded tarball");

        let dest = package_dir(&self.install_root, name);
        unpack_tarball(&bytes, &dest)?;
        info!(name = %name, version = %resolved, path = %dest.display(), "Installed package");

        installed.record(name, InstalledEntry::new(dep.range.clone(), resolved.clone()));

        let dependencies = metadata
            .dependencies_of(&resolved_str)
            .into_iter()
            .map(|(name, range)| DependencySpec::new(name, range))
            .collect();

        Ok(Step::Installed {
            version: resolved,
            replaced,
            dependencies,
        })
    }
}

/// Install everything a project's manifest declares into its `node_modules`.
///
/// The manifest is read before any registry access, so a missing manifest
/// fails without network activity.
///
/// # Errors
/// Returns the manifest error, or the first install failure.
pub async fn install_project<R: Registry>(
    registry: R,
    project_dir: &Path,
) -> Result<InstallReport, PkgError> {
    let manifest = Manifest::load(project_dir)?;
    let declared = manifest.dependencies();

    for error in &declared.errors {
        warn!(code = error.code(), "{}", error.message());
    }

    let installer = PackageInstaller::for_project(registry, project_dir);
    let mut installed = InstalledSet::new();
    let records = installer.install_all(&declared.deps, &mut installed).await?;

    Ok(InstallReport {
        records,
        installed,
        warnings: declared.errors,
    })
}
