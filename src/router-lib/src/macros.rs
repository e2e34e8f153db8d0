/// Expands to the crate version declared in this lib's `Cargo.toml`.
#[macro_export]
macro_rules! softrouter_version {
    () => {
        env!("CARGO_PKG_VERSION")
    };
}

/// Expands to a `"name vX.Y.Z"` string used in `--version` output and
/// the `/api/version` response.
#[macro_export]
macro_rules! full_version {
    () => {
        concat!("softrouter-agent v", env!("CARGO_PKG_VERSION"))
    };
}
