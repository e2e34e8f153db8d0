use serde::Serialize;

/// Build metadata returned verbatim by `GET /api/version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionBuildInfo {
    pub version: &'static str,
    pub name: &'static str,
}

pub static VERSION_BUILD_INFO: VersionBuildInfo = VersionBuildInfo {
    version: env!("CARGO_PKG_VERSION"),
    name: "softrouter-agent",
};
