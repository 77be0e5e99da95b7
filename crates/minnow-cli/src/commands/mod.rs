pub mod add;
pub mod install;
pub mod version;

use minnow_core::pkg::PkgError;
use serde::Serialize;

/// Error shape shared by every command's JSON output.
#[derive(Debug, Serialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl From<&PkgError> for ErrorInfo {
    fn from(err: &PkgError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.message().to_string(),
        }
    }
}

/// Print a JSON result to stdout.
pub fn print_json<T: Serialize>(value: &T) -> miette::Result<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| miette::miette!("Failed to serialize output: {e}"))?;
    println!("{text}");
    Ok(())
}

#[derive(Serialize)]
struct FailureResult<'a> {
    ok: bool,
    error: &'a ErrorInfo,
}

/// Report a fatal package error and finish with a non-zero exit.
///
/// JSON mode prints `{ "ok": false, "error": {..} }` to stdout and exits 1;
/// otherwise the error is handed to miette.
pub fn fail(err: &PkgError, json: bool) -> miette::Result<()> {
    if json {
        let info = ErrorInfo::from(err);
        print_json(&FailureResult {
            ok: false,
            error: &info,
        })?;
        std::process::exit(1);
    }

    Err(miette::miette!(code = err.code(), "{}", err.message()))
}
