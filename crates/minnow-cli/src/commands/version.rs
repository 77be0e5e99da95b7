//! `minnow version`: build identity and the registry this project would use.

use super::{fail, print_json};
use minnow_core::pkg::RegistryClient;
use minnow_core::version::{long_version, GIT_HASH, VERSION};
use minnow_core::Config;
use miette::Result;
use serde::Serialize;

#[derive(Serialize)]
struct VersionResult {
    ok: bool,
    version: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    git_hash: Option<&'static str>,
    registry: String,
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let registry = match RegistryClient::from_config(config) {
        Ok(client) => client.base_url().to_string(),
        Err(err) => return fail(&err, json),
    };

    if json {
        print_json(&VersionResult {
            ok: true,
            version: VERSION,
            git_hash: GIT_HASH,
            registry,
        })
    } else {
        println!("minnow {}", long_version());
        println!("registry: {registry}");
        Ok(())
    }
}
