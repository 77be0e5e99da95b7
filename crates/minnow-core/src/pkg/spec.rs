//! Package spec parsing.
//!
//! Parses the `add` argument forms:
//! - `left-pad`
//! - `left-pad@1.3.0`
//! - `left-pad@^1.0.0`
//! - `@types/node`
//! - `@types/node@^20`

use super::error::PkgError;
use super::version::LATEST_TAG;

/// npm's limit on package name length.
const MAX_NAME_LEN: usize = 214;

/// A parsed `name[@range]` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSpec {
    /// Full package name (e.g., "@scope/name" or "name").
    pub name: String,
    /// Version range or tag (None means latest).
    pub range: Option<String>,
}

/// One declared dependency: a package name and the range requested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencySpec {
    pub name: String,
    pub range: String,
}

impl DependencySpec {
    #[must_use]
    pub fn new(name: impl Into<String>, range: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            range: range.into(),
        }
    }
}

impl PackageSpec {
    /// Parse a package specification string.
    ///
    /// # Errors
    /// Returns an error if the name is malformed or the range is empty.
    pub fn parse(input: &str) -> Result<Self, PkgError> {
        let input = input.trim();

        if input.is_empty() {
            return Err(PkgError::spec_invalid("Empty package spec"));
        }

        // A leading '@' belongs to the scope, so the version delimiter is
        // searched for after it.
        let delimiter = input
            .char_indices()
            .skip(1)
            .find_map(|(i, c)| (c == '@').then_some(i));
        let (name, range) = match delimiter {
            Some(i) => (&input[..i], Some(&input[i + 1..])),
            None => (input, None),
        };

        validate_name(name, input)?;

        if range.is_some_and(str::is_empty) {
            return Err(PkgError::spec_invalid(format!(
                "Invalid package spec: empty version range in '{input}'"
            )));
        }

        Ok(Self {
            name: name.to_string(),
            range: range.map(String::from),
        })
    }

    /// Check if this is a scoped package.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        self.name.starts_with('@')
    }

    /// The range to record in the manifest: the given range, or `latest`.
    #[must_use]
    pub fn range_or_latest(&self) -> &str {
        self.range.as_deref().unwrap_or(LATEST_TAG)
    }

    /// Convert into the manifest entry this spec adds.
    #[must_use]
    pub fn into_dependency(self) -> DependencySpec {
        let range = self.range_or_latest().to_string();
        DependencySpec {
            name: self.name,
            range,
        }
    }
}

fn validate_name(name: &str, input: &str) -> Result<(), PkgError> {
    if name.is_empty() {
        return Err(PkgError::spec_invalid(format!(
            "Invalid package spec: empty name in '{input}'"
        )));
    }

    if name.len() > MAX_NAME_LEN {
        return Err(PkgError::spec_invalid(format!(
            "Package name longer than {MAX_NAME_LEN} characters: '{name}'"
        )));
    }

    let parts: Vec<&str> = match name.strip_prefix('@') {
        Some(scoped) => {
            let Some((scope, pkg)) = scoped.split_once('/') else {
                return Err(PkgError::spec_invalid(format!(
                    "Invalid scoped package: missing '/' in '{input}'"
                )));
            };
            vec![scope, pkg]
        }
        None => vec![name],
    };

    for part in parts {
        if part.is_empty() {
            return Err(PkgError::spec_invalid(format!(
                "Invalid package spec: empty scope or name in '{input}'"
            )));
        }
        if part.starts_with('.') || part.starts_with('_') {
            return Err(PkgError::spec_invalid(format!(
                "Package name cannot start with '.' or '_': '{name}'"
            )));
        }
        if let Some(c) = part
            .chars()
            .find(|&c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~')))
        {
            return Err(PkgError::spec_invalid(format!(
                "Invalid character '{c}' in package name '{name}'"
            )));
        }
    }

    Ok(())
}
