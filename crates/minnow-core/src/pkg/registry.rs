//! npm registry client.

use super::error::PkgError;
use super::npmrc::{load_npmrc_files, NpmrcConfig};
use super::tarball::{download_tarball, MAX_TARBALL_SIZE};
use crate::config::Config;
use crate::version::USER_AGENT;
use bytes::Bytes;
use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default npm registry URL.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org/";

/// Environment variable to override registry URL.
pub const REGISTRY_ENV: &str = "MINNOW_NPM_REGISTRY";

/// Published metadata for one package (the registry's "packument").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: DistTags,
    #[serde(default)]
    pub versions: BTreeMap<String, VersionRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DistTags {
    pub latest: Option<String>,
}

/// One published version.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionRecord {
    #[serde(default)]
    pub dist: Dist,
    #[serde(default, deserialize_with = "lenient_dependencies")]
    pub dependencies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Dist {
    pub tarball: Option<String>,
}

impl PackageMetadata {
    /// The version tagged `latest`.
    #[must_use]
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.latest.as_deref()
    }

    /// All published version strings.
    pub fn version_strings(&self) -> impl Iterator<Item = &str> {
        self.versions.keys().map(String::as_str)
    }

    /// Tarball URL for a specific version.
    #[must_use]
    pub fn tarball_url(&self, version: &str) -> Option<&str> {
        self.versions.get(version)?.dist.tarball.as_deref()
    }

    /// Declared dependencies of a specific version (empty if unknown).
    #[must_use]
    pub fn dependencies_of(&self, version: &str) -> Vec<(String, String)> {
        self.versions
            .get(version)
            .map(|record| {
                record
                    .dependencies
                    .iter()
                    .map(|(n, r)| (n.clone(), r.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Old packuments carry malformed `dependencies` (arrays, numbers). Keep the
/// string entries and ignore the rest instead of rejecting the whole document.
fn lenient_dependencies<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(value
        .as_object()
        .map(|obj| {
            obj.iter()
                .filter_map(|(name, range)| Some((name.clone(), range.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default())
}

/// Source of package metadata and archives.
///
/// The installer only talks to this trait, so tests can run it against an
/// in-memory registry.
#[allow(async_fn_in_trait)]
pub trait Registry {
    /// Fetch the metadata for a package.
    async fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, PkgError>;

    /// Fetch a tarball by URL.
    async fn fetch_tarball(&self, url: &str) -> Result<Bytes, PkgError>;
}

/// HTTP registry client.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: Url,
    npmrc: NpmrcConfig,
    http: Client,
}

impl RegistryClient {
    /// Create a new registry client with the given base URL.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client cannot be created.
    pub fn new(base_url: &str) -> Result<Self, PkgError> {
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| PkgError::registry(format!("Invalid registry URL '{base_url}': {e}")))?;

        let http = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| PkgError::registry(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            npmrc: NpmrcConfig::default(),
            http,
        })
    }

    /// Create a client for a project.
    ///
    /// Registry precedence: `config.registry`, then `MINNOW_NPM_REGISTRY`,
    /// then `registry=` from `.npmrc`, then the public npm registry. Scoped
    /// registries and auth tokens always come from `.npmrc`.
    ///
    /// # Errors
    /// Returns an error if `.npmrc` is unreadable or a URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self, PkgError> {
        let npmrc = load_npmrc_files(&config.cwd)?;

        let base = config
            .registry
            .clone()
            .or_else(|| std::env::var(REGISTRY_ENV).ok())
            .or_else(|| npmrc.registry.as_ref().map(ToString::to_string))
            .unwrap_or_else(|| DEFAULT_REGISTRY.to_string());

        debug!(registry = %base, scoped = npmrc.scoped_registries.len(), "Using registry");

        let mut client = Self::new(&base)?;
        client.npmrc = npmrc;
        Ok(client)
    }

    /// Get the base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Registry serving `name`: the scope's registry if configured, else the base.
    #[must_use]
    pub fn registry_for(&self, name: &str) -> &Url {
        name.split_once('/')
            .filter(|(scope, _)| scope.starts_with('@'))
            .and_then(|(scope, _)| self.npmrc.scoped_registries.get(scope))
            .unwrap_or(&self.base_url)
    }

    /// Metadata URL for a package. Scoped names have their `/` encoded.
    ///
    /// # Errors
    /// Returns an error if the URL cannot be built.
    pub fn metadata_url(&self, name: &str) -> Result<Url, PkgError> {
        let encoded_name = if name.starts_with('@') {
            name.replace('/', "%2F")
        } else {
            name.to_string()
        };

        self.registry_for(name)
            .join(&encoded_name)
            .map_err(|e| PkgError::registry(format!("Failed to build URL for '{name}': {e}")))
    }
}

impl Registry for RegistryClient {
    async fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata, PkgError> {
        let url = self.metadata_url(name)?;

        let mut request = self.http.get(url.as_str());
        if let Some(token) = self.npmrc.token_for(&url) {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PkgError::not_found(name));
        }

        if !response.status().is_success() {
            return Err(PkgError::registry(format!(
                "Registry returned status {} for '{name}'",
                response.status()
            )));
        }

        let body = response.bytes().await?;
        let metadata: PackageMetadata = serde_json::from_slice(&body)?;
        Ok(metadata)
    }

    async fn fetch_tarball(&self, url: &str) -> Result<Bytes, PkgError> {
        let token = Url::parse(url)
            .ok()
            .and_then(|u| self.npmrc.token_for(&u).map(String::from));
        download_tarball(&self.http, url, MAX_TARBALL_SIZE, token.as_deref()).await
    }
}
