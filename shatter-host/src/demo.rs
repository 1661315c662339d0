//! Bundled demo content.

use shatter_core::memory::MemoryCatalog;

use crate::config::HostConfig;

/// Demo memory catalog (TOML).
pub const DEMO_CATALOG: &str = include_str!("../assets/demo_catalog.toml");

/// Demo host configuration (TOML).
pub const DEMO_HOST_CONFIG: &str = include_str!("../assets/demo_host.toml");

/// Parse the bundled demo catalog.
///
/// # Errors
/// Returns `ShatterError::Config` if the bundled TOML is invalid.
pub fn demo_catalog() -> shatter_core::Result<MemoryCatalog> {
    MemoryCatalog::from_toml(DEMO_CATALOG)
}

/// Parse the bundled demo host configuration.
///
/// # Errors
/// Returns `ShatterError::Config` if the bundled TOML is invalid.
pub fn demo_host_config() -> shatter_core::Result<HostConfig> {
    HostConfig::from_toml(DEMO_HOST_CONFIG)
}
