//! Application error types using thiserror
//!
//! Error hierarchy:
//! - ManifestError: Issues reading or writing manifest files
//! - SpecifierError: A version clause that does not follow PEP 440
//! - RegistryError: Issues with package index communication
//! - ConfigError: Issues with CLI options or the config file

use std::path::PathBuf;
use thiserror::Error;

/// Errors related to manifest file operations
#[derive(Error, Debug)]
pub enum ManifestError {
    /// Manifest file not found
    #[error("manifest file not found: {path}")]
    NotFound { path: PathBuf },

    /// Failed to read manifest file
    #[error("failed to read manifest file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to write manifest file
    #[error("failed to write manifest file {path}: {source}")]
    WriteError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No manifest could be found at the target
    #[error("no requirements files found in {path}")]
    NoManifests { path: PathBuf },

    /// Could not rewrite a requirement line
    #[error("could not update '{package}' in {path}: {message}")]
    UpdateFailed {
        path: PathBuf,
        package: String,
        message: String,
    },
}

/// Errors in a single version clause or clause list
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SpecifierError {
    #[error("missing comparison operator in '{text}'")]
    MissingOperator { text: String },

    #[error("invalid version in '{text}'")]
    InvalidVersion { text: String },

    #[error("wildcard '.*' is only allowed with == and != ('{text}')")]
    WildcardNotAllowed { text: String },

    #[error("local version labels are only allowed with == and != ('{text}')")]
    LocalNotAllowed { text: String },

    #[error("'~=' requires at least two release segments ('{text}')")]
    CompatibleTooShort { text: String },

    #[error("empty clause in '{text}'")]
    EmptyClause { text: String },
}

/// Errors related to package index communication
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Package not found in the index
    #[error("package '{package}' not found in {registry} registry")]
    PackageNotFound { package: String, registry: String },

    /// Network request failed
    #[error("failed to fetch package '{package}' from {registry}: {message}")]
    NetworkError {
        package: String,
        registry: String,
        message: String,
    },

    /// Rate limit exceeded
    #[error("rate limit exceeded for {registry} registry")]
    RateLimitExceeded { registry: String },

    /// Invalid response from the index
    #[error("invalid response from {registry} for '{package}': {message}")]
    InvalidResponse {
        package: String,
        registry: String,
        message: String,
    },

    /// Timeout
    #[error("timeout while fetching '{package}' from {registry}")]
    Timeout { package: String, registry: String },
}

/// Errors related to configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid duration format
    #[error("invalid duration format '{value}': expected format like '2w', '10d', '1m'")]
    InvalidDuration { value: String },

    /// Config file could not be read
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for this schema
    #[error("failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// Invalid path
    #[error("invalid path '{path}': {message}")]
    InvalidPath { path: PathBuf, message: String },

    /// Conflicting options
    #[error("conflicting options: {message}")]
    ConflictingOptions { message: String },
}

impl ManifestError {
    /// Creates a new NotFound error
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        ManifestError::NotFound { path: path.into() }
    }

    /// Creates a new ReadError, mapping a missing file to NotFound
    pub fn read_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            return ManifestError::NotFound { path };
        }
        ManifestError::ReadError { path, source }
    }

    /// Creates a new WriteError
    pub fn write_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ManifestError::WriteError {
            path: path.into(),
            source,
        }
    }

    /// Creates a new UpdateFailed error
    pub fn update_failed(
        path: impl Into<PathBuf>,
        package: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ManifestError::UpdateFailed {
            path: path.into(),
            package: package.into(),
            message: message.into(),
        }
    }
}

impl SpecifierError {
    pub fn missing_operator(text: impl Into<String>) -> Self {
        SpecifierError::MissingOperator { text: text.into() }
    }

    pub fn invalid_version(text: impl Into<String>) -> Self {
        SpecifierError::InvalidVersion { text: text.into() }
    }

    /// Returns true if the problem is the version token rather than the syntax
    pub fn is_version_problem(&self) -> bool {
        !matches!(
            self,
            SpecifierError::MissingOperator { .. } | SpecifierError::EmptyClause { .. }
        )
    }
}

impl RegistryError {
    /// Creates a new PackageNotFound error
    pub fn package_not_found(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::PackageNotFound {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Creates a new NetworkError
    pub fn network_error(
        package: impl Into<String>,
        registry: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RegistryError::NetworkError {
            package: package.into(),
            registry: registry.into(),
            message: message.into(),
        }
    }

    /// Creates a new RateLimitExceeded error
    pub fn rate_limit_exceeded(registry: impl Into<String>) -> Self {
        RegistryError::RateLimitExceeded {
            registry: registry.into(),
        }
    }

    /// Creates a new Timeout error
    pub fn timeout(package: impl Into<String>, registry: impl Into<String>) -> Self {
        RegistryError::Timeout {
            package: package.into(),
            registry: registry.into(),
        }
    }

    /// Returns true if retrying the request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegistryError::NetworkError { .. }
                | RegistryError::RateLimitExceeded { .. }
                | RegistryError::Timeout { .. }
                | RegistryError::InvalidResponse { .. }
        )
    }
}

impl ConfigError {
    pub fn parse_error(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ConfigError::ParseError {
            path: path.into(),
            message: message.into(),
        }
    }
}
