//! `minnow install` command implementation.

use super::{fail, print_json, ErrorInfo};
use minnow_core::pkg::{
    install_project, InstallOutcome, InstallReport, PkgError, RegistryClient, SkipReason,
};
use minnow_core::Config;
use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

#[derive(Serialize)]
struct InstallJsonResult {
    ok: bool,
    /// InstalledSet at the end of the run: name → requested range.
    installed: BTreeMap<String, String>,
    packages: Vec<PackageJson>,
    warnings: Vec<ErrorInfo>,
}

#[derive(Serialize)]
struct PackageJson {
    name: String,
    requested: String,
    action: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replaced: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<&'static str>,
}

pub fn run(config: &Config, json: bool) -> Result<()> {
    let rt = tokio::runtime::Runtime::new().into_diagnostic()?;

    match rt.block_on(install(config)) {
        Ok(report) => {
            info!(
                installed = report.installed_count(),
                skipped = report.skipped_count(),
                "Install complete"
            );
            if json {
                print_json(&json_result(&report))
            } else {
                print_human(&report);
                Ok(())
            }
        }
        Err(err) => fail(&err, json),
    }
}

async fn install(config: &Config) -> Result<InstallReport, PkgError> {
    let registry = RegistryClient::from_config(config)?;
    install_project(registry, &config.cwd).await
}

fn reason_label(reason: &SkipReason) -> &'static str {
    match reason {
        SkipReason::AlreadySatisfied => "already-satisfied",
        SkipReason::NewerInstalled { .. } => "newer-installed",
        SkipReason::Cycle => "cycle",
    }
}

fn json_result(report: &InstallReport) -> InstallJsonResult {
    let packages = report
        .records
        .iter()
        .map(|record| {
            let (action, version, replaced, reason) = match &record.outcome {
                InstallOutcome::Installed { version, replaced } => (
                    "installed",
                    Some(version.to_string()),
                    replaced.as_ref().map(ToString::to_string),
                    None,
                ),
                InstallOutcome::Skipped(reason) => {
                    ("skipped", None, None, Some(reason_label(reason)))
                }
            };
            PackageJson {
                name: record.name.clone(),
                requested: record.requested.clone(),
                action,
                version,
                replaced,
                reason,
            }
        })
        .collect();

    InstallJsonResult {
        ok: true,
        installed: report
            .installed
            .iter()
            .map(|(name, entry)| (name.to_string(), entry.requested.clone()))
            .collect(),
        packages,
        warnings: report.warnings.iter().map(ErrorInfo::from).collect(),
    }
}

fn print_human(report: &InstallReport) {
    println!("minnow install");

    for record in &report.records {
        match &record.outcome {
            InstallOutcome::Installed {
                version,
                replaced: Some(old),
            } => println!("  + {}@{version} (replaced {old})", record.name),
            InstallOutcome::Installed { version, .. } => {
                println!("  + {}@{version}", record.name);
            }
            InstallOutcome::Skipped(SkipReason::NewerInstalled { installed }) => println!(
                "  = {}@{} (kept {installed})",
                record.name, record.requested
            ),
            InstallOutcome::Skipped(reason) => println!(
                "  = {}@{} ({})",
                record.name,
                record.requested,
                reason_label(reason)
            ),
        }
    }

    for warning in &report.warnings {
        eprintln!("  ! {}: {}", warning.code(), warning.message());
    }

    println!(
        "  packages: {} installed, {} skipped",
        report.installed_count(),
        report.skipped_count()
    );
}
