//! Package manager functionality.
//!
//! Provides:
//! - Parsing package specifications (name@range)
//! - Reading and updating `package.json`
//! - Fetching package metadata and tarballs from an npm registry
//! - Resolving version ranges using semver
//! - Extracting tarballs into `node_modules`
//! - Recursive installation of the dependency closure

pub mod error;
pub mod install;
pub mod installed;
pub mod manifest;
pub mod npmrc;
pub mod registry;
pub mod spec;
pub mod tarball;
pub mod version;

pub use error::{codes as pkg_codes, PkgError};
pub use install::{
    install_project, InstallOutcome, InstallRecord, InstallReport, PackageInstaller, SkipReason,
};
pub use installed::{InstalledEntry, InstalledSet};
pub use manifest::{add_dependency, Manifest, ManifestDeps};
pub use npmrc::NpmrcConfig;
pub use registry::{
    PackageMetadata, Registry, RegistryClient, VersionRecord, DEFAULT_REGISTRY, REGISTRY_ENV,
};
pub use spec::{DependencySpec, PackageSpec};
pub use tarball::{download_tarball, extract_tgz_file, unpack_tarball, MAX_TARBALL_SIZE};
pub use version::{resolve_version, version_satisfies, LATEST_TAG};
