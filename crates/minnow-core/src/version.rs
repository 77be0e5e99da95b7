//! Build identity.

/// The current version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commit the binary was built from, when the build exported one.
pub const GIT_HASH: Option<&str> = option_env!("MINNOW_BUILD_GIT_HASH");

/// User agent sent with every registry request.
pub const USER_AGENT: &str = concat!("minnow/", env!("CARGO_PKG_VERSION"));

/// Version with the commit appended, e.g. `0.1.0 (abc1234)`.
#[must_use]
pub fn long_version() -> String {
    match GIT_HASH {
        Some(hash) => format!("{VERSION} ({hash})"),
        None => VERSION.to_string(),
    }
}
