//! `package.json` reading and the `add` write path.

use super::error::PkgError;
use super::spec::DependencySpec;
use crate::paths::manifest_path;
use minnow_util::fs::atomic_write;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const DEPENDENCIES: &str = "dependencies";

/// Declared dependencies extracted from a manifest.
#[derive(Debug, Clone, Default)]
pub struct ManifestDeps {
    /// Valid entries, sorted by name.
    pub deps: Vec<DependencySpec>,
    /// Entries that could not be used (non-string ranges, malformed section).
    pub errors: Vec<PkgError>,
}

/// A loaded `package.json`.
///
/// The whole document is kept so writes preserve fields this tool does
/// not understand.
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    root: Map<String, Value>,
}

impl Manifest {
    /// Load `package.json` from a project directory.
    ///
    /// # Errors
    /// `PKG_MANIFEST_NOT_FOUND` if the file is absent, `PKG_MANIFEST_INVALID`
    /// if it is unreadable or not a JSON object.
    pub fn load(project_dir: &Path) -> Result<Self, PkgError> {
        let path = manifest_path(project_dir);

        if !path.is_file() {
            return Err(PkgError::manifest_not_found(&path));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| PkgError::manifest_invalid(format!("Failed to read: {e}")))?;

        let value: Value = serde_json::from_str(&content)
            .map_err(|e| PkgError::manifest_invalid(format!("Invalid JSON: {e}")))?;

        let Value::Object(root) = value else {
            return Err(PkgError::manifest_invalid(
                "package.json must be a JSON object",
            ));
        };

        Ok(Self { path, root })
    }

    /// Path this manifest was loaded from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Extract the `dependencies` section.
    #[must_use]
    pub fn dependencies(&self) -> ManifestDeps {
        let mut result = ManifestDeps::default();

        let Some(section) = self.root.get(DEPENDENCIES) else {
            return result;
        };

        let Some(entries) = section.as_object() else {
            result.errors.push(PkgError::manifest_invalid(format!(
                "'{DEPENDENCIES}' must be an object, got {}",
                json_type_name(section)
            )));
            return result;
        };

        for (name, range) in entries {
            match range.as_str() {
                Some(range) => result.deps.push(DependencySpec::new(name, range)),
                None => result
                    .errors
                    .push(PkgError::dep_range_invalid(name, json_type_name(range))),
            }
        }

        result.deps.sort_by(|a, b| a.name.cmp(&b.name));
        result
    }

    /// Set `dependencies[name] = range`, replacing any earlier entry.
    ///
    /// A missing or non-object `dependencies` field is replaced by a fresh
    /// object.
    pub fn set_dependency(&mut self, name: &str, range: &str) {
        let section = self
            .root
            .entry(DEPENDENCIES)
            .or_insert_with(|| Value::Object(Map::new()));

        if !section.is_object() {
            *section = Value::Object(Map::new());
        }

        if let Value::Object(deps) = section {
            deps.insert(name.to_string(), Value::String(range.to_string()));
        }
    }

    /// Write the manifest back to disk atomically.
    ///
    /// # Errors
    /// Returns `PKG_INSTALL_IO` if the file cannot be written.
    pub fn save(&self) -> Result<(), PkgError> {
        let mut content = serde_json::to_string_pretty(&self.root)?;
        content.push('\n');

        atomic_write(&self.path, content.as_bytes()).map_err(|e| {
            PkgError::install_io(format!("Failed to write {}: {e}", self.path.display()))
        })
    }
}

/// Record `name@range` in the project's manifest and persist it.
///
/// # Errors
/// Returns an error if the manifest is missing, invalid, or unwritable.
pub fn add_dependency(project_dir: &Path, dep: &DependencySpec) -> Result<Manifest, PkgError> {
    let mut manifest = Manifest::load(project_dir)?;
    manifest.set_dependency(&dep.name, &dep.range);
    manifest.save()?;
    Ok(manifest)
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
