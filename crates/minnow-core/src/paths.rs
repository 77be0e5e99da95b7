//! Project-relative filesystem layout.

use std::path::{Path, PathBuf};

/// Manifest file name, read from the project directory.
pub const MANIFEST_NAME: &str = "package.json";

/// Directory packages are extracted into, relative to the project directory.
pub const NODE_MODULES: &str = "node_modules";

/// Per-user config file name, looked up in project ancestors and the home directory.
pub const NPMRC_NAME: &str = ".npmrc";

/// Path to the project's manifest.
#[must_use]
pub fn manifest_path(project: &Path) -> PathBuf {
    project.join(MANIFEST_NAME)
}

/// Path to the project's `node_modules` directory.
#[must_use]
pub fn node_modules_dir(project: &Path) -> PathBuf {
    project.join(NODE_MODULES)
}

/// Directory a package is extracted into.
///
/// Scoped names (`@scope/name`) become nested directories, matching the
/// layout Node's resolver expects.
#[must_use]
pub fn package_dir(install_root: &Path, name: &str) -> PathBuf {
    name.split('/')
        .fold(install_root.to_path_buf(), |dir, part| dir.join(part))
}

/// Path to the user's home `.npmrc`, if a home directory is known.
#[must_use]
pub fn home_npmrc() -> Option<PathBuf> {
    dirs_next::home_dir().map(|home| home.join(NPMRC_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_path() {
        let p = manifest_path(Path::new("/proj"));
        assert_eq!(p, PathBuf::from("/proj/package.json"));
    }

    #[test]
    fn test_node_modules_dir() {
        let p = node_modules_dir(Path::new("/proj"));
        assert_eq!(p, PathBuf::from("/proj/node_modules"));
    }

    #[test]
    fn test_package_dir_unscoped() {
        let p = package_dir(Path::new("/proj/node_modules"), "left-pad");
        assert_eq!(p, PathBuf::from("/proj/node_modules/left-pad"));
    }

    #[test]
    fn test_package_dir_scoped() {
        let p = package_dir(Path::new("/proj/node_modules"), "@types/node");
        assert_eq!(p, PathBuf::from("/proj/node_modules/@types/node"));
    }
}
