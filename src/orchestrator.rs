//! Update orchestrator for coordinating the entire update workflow
//!
//! This module provides:
//! - Workflow coordination: resolve → load → fetch → judge → write
//! - Parallel index queries, one per normalized package name
//! - Dry-run mode support
//! - Error handling with partial continuation

use crate::cli::UpdateArgs;
use crate::config::Config;
use crate::domain::{ManifestUpdateResult, SkipReason, UpdateResult, UpdateSummary};
use crate::error::{ConfigError, RegistryError};
use crate::manifest::{resolve_manifests, unique_files, Loader, ManifestWriter, WriteResult};
use crate::progress::Progress;
use crate::registry::{HttpClient, PyPIAdapter, RegistryAdapter};
use crate::update::{UpdateFilter, UpdateJudge, VersionInfo};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Default concurrency limit for index requests
const DEFAULT_CONCURRENCY: usize = 10;

/// Orchestrator for coordinating the update workflow
pub struct Orchestrator {
    /// `update` arguments
    args: UpdateArgs,
    /// Settings from reqcheck.toml
    config: Config,
    /// Index adapter shared by fetch tasks
    adapter: Arc<dyn RegistryAdapter>,
    /// Limits requests in flight
    semaphore: Arc<Semaphore>,
}

/// Result of running the orchestrator
pub struct OrchestratorResult {
    /// Update summary with all results
    pub summary: UpdateSummary,
    /// Write results for each manifest
    pub write_results: Vec<WriteResult>,
    /// Errors encountered during processing
    pub errors: Vec<OrchestratorError>,
}

impl OrchestratorResult {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Errors that can occur during orchestration
#[derive(Debug)]
pub enum OrchestratorError {
    /// Failed to create HTTP client
    HttpClientError(String),
    /// Invalid settings
    ConfigError(String),
    /// Failed to find manifests
    ManifestDetectionError(String),
    /// Failed to read a root manifest
    ManifestParseError { path: String, message: String },
    /// Failed to fetch versions from the index
    RegistryError { package: String, message: String },
    /// Failed to write manifest
    WriteError { path: String, message: String },
}

impl OrchestratorError {
    /// Errors that stop the run before any manifest is processed
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            OrchestratorError::HttpClientError(_)
                | OrchestratorError::ConfigError(_)
                | OrchestratorError::ManifestDetectionError(_)
        )
    }
}

impl std::fmt::Display for OrchestratorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrchestratorError::HttpClientError(msg) => write!(f, "HTTP client error: {}", msg),
            OrchestratorError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            OrchestratorError::ManifestDetectionError(msg) => {
                write!(f, "Manifest detection error: {}", msg)
            }
            OrchestratorError::ManifestParseError { path, message } => {
                write!(f, "Failed to load {}: {}", path, message)
            }
            OrchestratorError::RegistryError { package, message } => {
                write!(f, "Failed to fetch {}: {}", package, message)
            }
            OrchestratorError::WriteError { path, message } => {
                write!(f, "Failed to write {}: {}", path, message)
            }
        }
    }
}

impl std::error::Error for OrchestratorError {}

impl From<ConfigError> for OrchestratorError {
    fn from(e: ConfigError) -> Self {
        OrchestratorError::ConfigError(e.to_string())
    }
}

impl Orchestrator {
    /// Create a new orchestrator against the configured index
    pub fn new(args: UpdateArgs, config: Config) -> Result<Self, OrchestratorError> {
        let client =
            HttpClient::new().map_err(|e| OrchestratorError::HttpClientError(e.to_string()))?;
        Ok(Self::with_client(args, config, client))
    }

    /// Create an orchestrator with a custom HTTP client (for testing)
    pub fn with_client(args: UpdateArgs, config: Config, client: HttpClient) -> Self {
        let adapter = PyPIAdapter::new(client).with_index_url(config.index_url());
        Self::with_adapter(args, config, Arc::new(adapter))
    }

    /// Create an orchestrator over any index adapter
    pub fn with_adapter(args: UpdateArgs, config: Config, adapter: Arc<dyn RegistryAdapter>) -> Self {
        Self {
            args,
            config,
            adapter,
            semaphore: Arc::new(Semaphore::new(DEFAULT_CONCURRENCY)),
        }
    }

    /// Run the update workflow with progress display
    pub async fn run(&self) -> Result<OrchestratorResult, OrchestratorError> {
        self.run_with_progress(true).await
    }

    /// Run the update workflow with optional progress display
    ///
    /// Returns Err only for fatal problems; per-package and per-file
    /// failures are collected in the result.
    pub async fn run_with_progress(
        &self,
        show_progress: bool,
    ) -> Result<OrchestratorResult, OrchestratorError> {
        let mut progress = Progress::new(show_progress);
        let mut summary = UpdateSummary::new(self.args.dry_run);
        let mut errors = Vec::new();

        let judge = UpdateJudge::new(self.build_filter()?);

        // Step 1: Find and load manifests
        progress.spinner("Loading manifests...");
        let manifests = resolve_manifests(&self.args.path, &self.config.files)
            .map_err(|e| OrchestratorError::ManifestDetectionError(e.to_string()))?;

        let mut loader = Loader::new();
        let mut sets = Vec::new();
        for info in &manifests {
            match loader.load(info) {
                Ok(set) => sets.push(set),
                Err(e) => errors.push(OrchestratorError::ManifestParseError {
                    path: info.path.display().to_string(),
                    message: e.to_string(),
                }),
            }
        }
        let files = unique_files(&sets);
        progress.finish_and_clear();

        for file in files.iter().filter(|f| !f.errors.is_empty()) {
            warn!(
                path = %file.path.display(),
                invalid_lines = file.errors.len(),
                "manifest has lines that do not parse; run `reqcheck check`"
            );
        }

        // Step 2: Collect the names worth a request
        let mut pending: BTreeMap<String, String> = BTreeMap::new();
        for requirement in files.iter().flat_map(|f| f.requirements()) {
            if judge.should_skip(requirement).is_none() {
                pending
                    .entry(requirement.name.normalized.clone())
                    .or_insert_with(|| requirement.name.raw.clone());
            }
        }

        // Step 3: Fetch releases concurrently
        progress.start(pending.len() as u64, "Fetching releases");
        let fetched = self.fetch_all(pending, &progress).await;
        progress.finish_and_clear();

        let mut failed: Vec<(&String, &RegistryError)> = fetched
            .iter()
            .filter_map(|(name, result)| result.as_ref().err().map(|e| (name, e)))
            .collect();
        failed.sort_by(|a, b| a.0.cmp(b.0));
        for (name, e) in failed {
            errors.push(OrchestratorError::RegistryError {
                package: name.clone(),
                message: e.to_string(),
            });
        }

        // Step 4: Judge each requirement
        for file in &files {
            let mut manifest_result = ManifestUpdateResult::new(&file.path, file.is_constraint);
            for requirement in file.requirements() {
                let result = match fetched.get(&requirement.name.normalized) {
                    Some(Ok(versions)) => judge.judge(requirement, versions),
                    Some(Err(e)) => UpdateResult::skip(
                        requirement.clone(),
                        SkipReason::FetchFailed(e.to_string()),
                    ),
                    None => judge.judge(requirement, &[]),
                };
                manifest_result.add_result(result);
            }
            summary.add_manifest(manifest_result);
        }

        // Step 5: Apply updates (unless dry-run)
        if !self.args.dry_run {
            progress.spinner("Writing updates...");
        }
        let writer = ManifestWriter::new(self.args.dry_run);
        let write_results = writer.apply_all_updates(&summary.manifests);
        progress.finish_and_clear();

        for result in &write_results {
            for error in &result.errors {
                errors.push(OrchestratorError::WriteError {
                    path: result.path.display().to_string(),
                    message: error.clone(),
                });
            }
        }

        Ok(OrchestratorResult {
            summary,
            write_results,
            errors,
        })
    }

    /// Build an UpdateFilter from CLI arguments layered over the config file
    fn build_filter(&self) -> Result<UpdateFilter, ConfigError> {
        let exclude: Vec<String> = self
            .config
            .exclude
            .iter()
            .chain(&self.args.exclude)
            .cloned()
            .collect();
        let only: Vec<String> = self
            .config
            .only
            .iter()
            .chain(&self.args.only)
            .cloned()
            .collect();

        let mut filter = UpdateFilter::new()
            .with_exclude(exclude)
            .with_only(only)
            .with_include_pinned(self.args.include_pinned || self.config.include_pinned);

        // CLI --age wins over the config key
        let age = match self.args.age {
            Some(age) => Some(age),
            None => self.config.min_age()?,
        };
        if let Some(age) = age {
            filter = filter.with_min_age(age);
        }

        Ok(filter)
    }

    /// Fetch every pending package once, at most DEFAULT_CONCURRENCY at a time
    ///
    /// Keys are normalized names; values are the spelling used for the request.
    async fn fetch_all(
        &self,
        pending: BTreeMap<String, String>,
        progress: &Progress,
    ) -> HashMap<String, Result<Vec<VersionInfo>, RegistryError>> {
        let mut join_set = JoinSet::new();
        for (key, name) in pending {
            let adapter = Arc::clone(&self.adapter);
            let semaphore = Arc::clone(&self.semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let result = adapter.fetch_versions(&name).await;
                (key, result)
            });
        }

        let mut fetched = HashMap::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((key, result)) => {
                    progress.set_message(&format!("Fetched {}", key));
                    progress.inc();
                    fetched.insert(key, result);
                }
                Err(e) => warn!(error = %e, "fetch task failed"),
            }
        }
        debug!(
            registry = self.adapter.registry_name(),
            packages = fetched.len(),
            "fetched releases"
        );
        fetched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};
    use crate::domain::{normalize, Version};
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use clap::Parser;
    use std::fs;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// In-memory index that records each request
    struct FakeIndex {
        releases: HashMap<String, Vec<&'static str>>,
        requests: Mutex<Vec<String>>,
    }

    impl FakeIndex {
        fn new(entries: &[(&str, Vec<&'static str>)]) -> Arc<Self> {
            Arc::new(Self {
                releases: entries
                    .iter()
                    .map(|(name, versions)| (name.to_string(), versions.clone()))
                    .collect(),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn requests(&self) -> Vec<String> {
            let mut requests = self.requests.lock().unwrap().clone();
            requests.sort();
            requests
        }
    }

    #[async_trait]
    impl RegistryAdapter for FakeIndex {
        fn registry_name(&self) -> &'static str {
            "fake"
        }

        async fn fetch_versions(&self, package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
            self.requests.lock().unwrap().push(package.to_string());
            let released = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
            match self.releases.get(&normalize(package)) {
                Some(versions) => Ok(versions
                    .iter()
                    .filter_map(|v| Version::parse(v))
                    .map(|v| VersionInfo::new(v, released))
                    .collect()),
                None => Err(RegistryError::package_not_found(package, "fake")),
            }
        }
    }

    fn update_args(path: &Path, extra: &[&str]) -> UpdateArgs {
        let mut argv = vec!["reqcheck", "update"];
        argv.extend(extra);
        let path = path.to_str().unwrap().to_string();
        argv.push(&path);
        match Cli::parse_from(argv).command {
            Command::Update(args) => args,
            _ => unreachable!(),
        }
    }

    fn orchestrator(path: &Path, extra: &[&str], index: Arc<FakeIndex>) -> Orchestrator {
        Orchestrator::with_adapter(update_args(path, extra), Config::default(), index)
    }

    #[test]
    fn test_build_filter_merges_config_and_cli() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            exclude: vec!["six".to_string()],
            include_pinned: true,
            age: Some("10d".to_string()),
            ..Config::default()
        };
        let orchestrator = Orchestrator::with_adapter(
            update_args(dir.path(), &["--exclude", "pytz"]),
            config,
            FakeIndex::new(&[]),
        );
        let filter = orchestrator.build_filter().unwrap();
        assert!(!filter.should_process_package("six"));
        assert!(!filter.should_process_package("pytz"));
        assert!(filter.should_process_package("requests"));
        assert!(filter.include_pinned);
        assert_eq!(filter.min_age, Some(Duration::from_secs(10 * 24 * 60 * 60)));
    }

    #[test]
    fn test_build_filter_cli_age_overrides_config() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            age: Some("10d".to_string()),
            ..Config::default()
        };
        let orchestrator = Orchestrator::with_adapter(
            update_args(dir.path(), &["--age", "2w"]),
            config,
            FakeIndex::new(&[]),
        );
        let filter = orchestrator.build_filter().unwrap();
        assert_eq!(filter.min_age, Some(Duration::from_secs(14 * 24 * 60 * 60)));
    }

    #[test]
    fn test_build_filter_invalid_config_age() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            age: Some("later".to_string()),
            ..Config::default()
        };
        let orchestrator =
            Orchestrator::with_adapter(update_args(dir.path(), &[]), config, FakeIndex::new(&[]));
        assert!(orchestrator.build_filter().is_err());
    }

    #[tokio::test]
    async fn test_run_updates_and_writes() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "pytz>=2024.1  # tz\nrequests==2.31.0\n").unwrap();

        let index = FakeIndex::new(&[("pytz", vec!["2024.1", "2024.2"])]);
        let result = orchestrator(dir.path(), &[], index.clone())
            .run_with_progress(false)
            .await
            .unwrap();

        assert!(!result.has_errors());
        assert_eq!(result.summary.total_updates(), 1);
        assert_eq!(result.summary.total_skips(), 1);
        assert_eq!(
            fs::read_to_string(&manifest).unwrap(),
            "pytz>=2024.2  # tz\nrequests==2.31.0\n"
        );
        // The pinned requirement is never requested
        assert_eq!(index.requests(), vec!["pytz"]);
    }

    #[tokio::test]
    async fn test_run_dry_run_leaves_file() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "pytz>=2024.1\n").unwrap();

        let index = FakeIndex::new(&[("pytz", vec!["2024.2"])]);
        let result = orchestrator(dir.path(), &["--dry-run"], index)
            .run_with_progress(false)
            .await
            .unwrap();

        assert!(result.summary.dry_run);
        assert_eq!(result.summary.total_updates(), 1);
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "pytz>=2024.1\n");
        let write = &result.write_results[0];
        assert!(!write.file_modified);
        assert_eq!(write.new_content.as_deref(), Some("pytz>=2024.2\n"));
    }

    #[tokio::test]
    async fn test_run_fetches_each_name_once() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("requirements.txt"),
            "-r requirements-dev.txt\nFlask_Login>=0.6\n",
        )
        .unwrap();
        fs::write(dir.path().join("requirements-dev.txt"), "flask-login>=0.6.2\n").unwrap();

        let index = FakeIndex::new(&[("flask-login", vec!["0.6.2", "0.6.3"])]);
        let result = orchestrator(dir.path(), &[], index.clone())
            .run_with_progress(false)
            .await
            .unwrap();

        assert_eq!(index.requests().len(), 1);
        // requirements-dev.txt is both a root and an include, processed once
        assert_eq!(result.summary.files_processed(), 2);
        assert_eq!(result.summary.total_updates(), 2);
    }

    #[tokio::test]
    async fn test_run_collects_fetch_errors() {
        let dir = TempDir::new().unwrap();
        let manifest = dir.path().join("requirements.txt");
        fs::write(&manifest, "ghost-pkg>=1.0\npytz>=2024.1\n").unwrap();

        let index = FakeIndex::new(&[("pytz", vec!["2024.2"])]);
        let result = orchestrator(dir.path(), &[], index)
            .run_with_progress(false)
            .await
            .unwrap();

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].to_string().contains("Failed to fetch ghost-pkg"));
        assert!(!result.errors[0].is_fatal());
        assert_eq!(result.summary.total_updates(), 1);
        let skip = result.summary.manifests[0].skips().next().unwrap();
        assert!(matches!(
            skip,
            UpdateResult::Skip { reason: SkipReason::FetchFailed(_), .. }
        ));
        assert_eq!(fs::read_to_string(&manifest).unwrap(), "ghost-pkg>=1.0\npytz>=2024.2\n");
    }

    /// Index that tracks how many fetches are in flight at once
    #[derive(Default)]
    struct CountingIndex {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
        total: AtomicUsize,
    }

    #[async_trait]
    impl RegistryAdapter for CountingIndex {
        fn registry_name(&self) -> &'static str {
            "counting"
        }

        async fn fetch_versions(&self, _package: &str) -> Result<Vec<VersionInfo>, RegistryError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.total.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_run_bounds_concurrent_fetches() {
        let dir = TempDir::new().unwrap();
        let content: String = (0..30).map(|i| format!("pkg{}>=1.0\n", i)).collect();
        fs::write(dir.path().join("requirements.txt"), content).unwrap();

        let index = Arc::new(CountingIndex::default());
        let result = Orchestrator::with_adapter(
            update_args(dir.path(), &["--dry-run"]),
            Config::default(),
            Arc::clone(&index) as Arc<dyn RegistryAdapter>,
        )
        .run_with_progress(false)
        .await
        .unwrap();

        assert!(result.errors.is_empty());
        assert_eq!(index.total.load(Ordering::SeqCst), 30);
        let peak = index.peak.load(Ordering::SeqCst);
        assert!(peak <= DEFAULT_CONCURRENCY, "peak was {}", peak);
        assert!(peak > 1, "fetches never overlapped");
    }

    #[tokio::test]
    async fn test_run_only_filter_skips_requests() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("requirements.txt"), "pytz>=2024.1\nsix>=1.15\n").unwrap();

        let index = FakeIndex::new(&[("pytz", vec!["2024.2"]), ("six", vec!["1.16.0"])]);
        let result = orchestrator(dir.path(), &["--only", "six"], index.clone())
            .run_with_progress(false)
            .await
            .unwrap();

        assert_eq!(index.requests(), vec!["six"]);
        assert_eq!(result.summary.total_updates(), 1);
    }

    #[tokio::test]
    async fn test_run_missing_target_is_fatal() {
        let dir = TempDir::new().unwrap();
        let err = orchestrator(&dir.path().join("missing"), &[], FakeIndex::new(&[]))
            .run_with_progress(false)
            .await
            .err()
            .unwrap();
        assert!(err.is_fatal());

        let err = orchestrator(dir.path(), &[], FakeIndex::new(&[]))
            .run_with_progress(false)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, OrchestratorError::ManifestDetectionError(_)));
    }

    #[test]
    fn test_orchestrator_error_display() {
        let err = OrchestratorError::HttpClientError("connection failed".to_string());
        assert!(err.to_string().contains("HTTP client error"));
        assert!(err.is_fatal());

        let err = OrchestratorError::RegistryError {
            package: "pytz".to_string(),
            message: "not found".to_string(),
        };
        assert!(err.to_string().contains("Failed to fetch pytz"));
        assert!(!err.is_fatal());

        let err = OrchestratorError::WriteError {
            path: "/path/to/requirements.txt".to_string(),
            message: "permission denied".to_string(),
        };
        assert!(err.to_string().contains("Failed to write"));

        let err: OrchestratorError = ConfigError::InvalidDuration {
            value: "x".to_string(),
        }
        .into();
        assert!(err.is_fatal());
    }
}
