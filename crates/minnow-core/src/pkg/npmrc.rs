//! `.npmrc` parsing for registry configuration.
//!
//! Recognized directives:
//! - `registry=URL` sets the default registry
//! - `@scope:registry=URL` routes a scope to another registry
//! - `//host/:_authToken=TOKEN` attaches a bearer token to requests for `host`
//!
//! `${ENV_VAR}` references in values are expanded.

use crate::error::Error;
use crate::paths::{home_npmrc, NPMRC_NAME};
use std::collections::HashMap;
use std::path::Path;
use url::Url;

/// Parsed `.npmrc` configuration.
#[derive(Debug, Clone, Default)]
pub struct NpmrcConfig {
    /// Default registry, if one was configured.
    pub registry: Option<Url>,
    /// Scope → registry URL (e.g. `@acme` → `https://npm.acme.dev/`).
    pub scoped_registries: HashMap<String, Url>,
    /// Host (optionally with path) → auth token.
    pub auth_tokens: HashMap<String, String>,
}

impl NpmrcConfig {
    /// Auth token for a URL, matching `host/path` first and then `host`.
    #[must_use]
    pub fn token_for(&self, url: &Url) -> Option<&str> {
        let host = url.host_str()?;
        let path = url.path().trim_end_matches('/');

        let with_path = if path.is_empty() {
            None
        } else {
            self.auth_tokens.get(&format!("{host}{path}"))
        };

        with_path
            .or_else(|| self.auth_tokens.get(host))
            .map(String::as_str)
    }
}

/// Parse a single `.npmrc` file's content.
///
/// # Errors
/// Returns an error if a registry URL does not parse.
pub fn parse_npmrc(content: &str, origin: &Path) -> Result<NpmrcConfig, Error> {
    let mut config = NpmrcConfig::default();

    for line in content.lines() {
        let line = line.trim();

        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        let value = expand_env_vars(value.trim());

        if key == "registry" {
            config.registry = Some(parse_registry_url(&value, origin)?);
        } else if key.starts_with('@') {
            if let Some((scope, "registry")) = key.split_once(':') {
                let url = parse_registry_url(&value, origin)?;
                config.scoped_registries.insert(scope.to_string(), url);
            }
        } else if let Some(host_part) = key
            .strip_prefix("//")
            .and_then(|k| k.strip_suffix(":_authToken"))
        {
            if !value.is_empty() {
                config
                    .auth_tokens
                    .insert(host_part.trim_end_matches('/').to_string(), value);
            }
        }
    }

    Ok(config)
}

/// Load and merge `.npmrc` files from `project_dir` upward, then `$HOME`.
///
/// The nearest file wins for every key.
///
/// # Errors
/// Returns an error if an existing file cannot be read or holds an invalid URL.
pub fn load_npmrc_files(project_dir: &Path) -> Result<NpmrcConfig, Error> {
    let mut merged = NpmrcConfig::default();

    let candidates = project_dir
        .ancestors()
        .map(|d| d.join(NPMRC_NAME))
        .chain(home_npmrc());

    for path in candidates {
        if !path.is_file() {
            continue;
        }
        let content = std::fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        let parsed = parse_npmrc(&content, &path)?;
        merge_config(&mut merged, parsed);
    }

    Ok(merged)
}

/// Normalize a registry URL so that joining a package name works.
fn parse_registry_url(value: &str, origin: &Path) -> Result<Url, Error> {
    let url_str = if value.ends_with('/') {
        value.to_string()
    } else {
        format!("{value}/")
    };

    Url::parse(&url_str).map_err(|source| Error::RegistryUrl {
        url: value.to_string(),
        origin: origin.display().to_string(),
        source,
    })
}

/// Merge `source` into `target`, keeping existing entries (first wins).
fn merge_config(target: &mut NpmrcConfig, source: NpmrcConfig) {
    if target.registry.is_none() {
        target.registry = source.registry;
    }
    for (scope, url) in source.scoped_registries {
        target.scoped_registries.entry(scope).or_insert(url);
    }
    for (host, token) in source.auth_tokens {
        target.auth_tokens.entry(host).or_insert(token);
    }
}

/// Expand `${ENV_VAR}` patterns. Unset variables expand to nothing, as npm does.
fn expand_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next();
            let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
            if let Ok(val) = std::env::var(&var_name) {
                result.push_str(&val);
            }
        } else {
            result.push(ch);
        }
    }

    result
}
