use serde::Serialize;

/// Build metadata stamped in by the binary's build script
#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    pub repo_version: Option<&'static str>,
    pub build_profile: Option<&'static str>,
    pub build_features: Option<&'static str>,
    pub build_timestamp: Option<&'static str>,
    pub rust_version: Option<&'static str>,
    pub build_target: Option<&'static str>,
}

impl std::fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unknown = "unknown";
        write!(
            f,
            "{} ({}) profile={} features={} built={} {} target={}",
            self.version,
            self.repo_version.unwrap_or(unknown),
            self.build_profile.unwrap_or(unknown),
            self.build_features.unwrap_or(unknown),
            self.build_timestamp.unwrap_or(unknown),
            self.rust_version.unwrap_or(unknown),
            self.build_target.unwrap_or(unknown),
        )
    }
}

/// Capture [`BuildInfo`] from the calling crate's compile-time environment.
#[macro_export]
macro_rules! build_info {
    () => {
        $crate::version::BuildInfo {
            version: env!("CARGO_PKG_VERSION"),
            repo_version: option_env!("REPO_VERSION"),
            build_profile: option_env!("BUILD_PROFILE"),
            build_features: option_env!("BUILD_FEATURES"),
            build_timestamp: option_env!("BUILD_TIMESTAMP"),
            rust_version: option_env!("RUST_VERSION"),
            build_target: option_env!("BUILD_TARGET"),
        }
    };
}
