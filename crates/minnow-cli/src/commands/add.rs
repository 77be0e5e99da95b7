//! `minnow add` command implementation.

use super::{fail, print_json};
use minnow_core::pkg::{add_dependency, DependencySpec, PackageSpec, PkgError};
use minnow_core::Config;
use miette::Result;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

#[derive(Serialize)]
struct AddResult {
    ok: bool,
    name: String,
    range: String,
    manifest: String,
}

pub fn run(config: &Config, spec: &str, json: bool) -> Result<()> {
    let (dep, manifest_path) = match add(config, spec) {
        Ok(added) => added,
        Err(err) => return fail(&err, json),
    };

    info!(name = %dep.name, range = %dep.range, "Added dependency");

    if json {
        print_json(&AddResult {
            ok: true,
            name: dep.name,
            range: dep.range,
            manifest: manifest_path.display().to_string(),
        })
    } else {
        println!("+ {}@{} (package.json)", dep.name, dep.range);
        Ok(())
    }
}

fn add(config: &Config, spec: &str) -> Result<(DependencySpec, PathBuf), PkgError> {
    let dep = PackageSpec::parse(spec)?.into_dependency();
    let manifest = add_dependency(&config.cwd, &dep)?;
    Ok((dep, manifest.path().to_path_buf()))
}
