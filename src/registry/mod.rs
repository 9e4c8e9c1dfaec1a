//! Package index adapters for fetching release information
//!
//! This module provides:
//! - HTTP client shared foundation with retry logic
//! - PyPI JSON API adapter

mod client;
mod pypi;

pub use client::HttpClient;
pub use pypi::{PyPIAdapter, DEFAULT_INDEX_URL, INDEX_URL_ENV};

use crate::error::RegistryError;
use crate::update::VersionInfo;
use async_trait::async_trait;

/// Trait for package index adapters
#[async_trait]
pub trait RegistryAdapter: Send + Sync {
    /// Get the registry name
    fn registry_name(&self) -> &'static str;

    /// Fetch available releases for a package, sorted ascending
    async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError>;
}
