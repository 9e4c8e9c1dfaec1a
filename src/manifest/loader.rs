//! Loading manifests and following `-r` / `-c` includes

use super::detector::ManifestInfo;
use super::lines::logical_lines;
use super::parser::{parse_line, Entry, LineError};
use crate::domain::{Diagnostic, Requirement, RuleCode};
use crate::error::ManifestError;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A single parsed manifest file
#[derive(Debug, Clone)]
pub struct ManifestFile {
    /// Path as reached from the root
    pub path: PathBuf,
    /// Raw file content
    pub content: String,
    /// Successfully parsed entries in file order
    pub entries: Vec<Entry>,
    /// Lines that failed to parse
    pub errors: Vec<LineError>,
    /// Whether the file was reached through `-c`
    pub is_constraint: bool,
}

impl ManifestFile {
    /// Parse manifest content without touching the filesystem
    pub fn parse(path: impl Into<PathBuf>, content: impl Into<String>, is_constraint: bool) -> Self {
        let path = path.into();
        let content = content.into();
        let mut entries = Vec::new();
        let mut errors = Vec::new();

        for line in logical_lines(&content) {
            match parse_line(&line, &path) {
                Ok(entry) => entries.push(entry),
                Err(e) => errors.push(e),
            }
        }

        Self {
            path,
            content,
            entries,
            errors,
            is_constraint,
        }
    }

    /// Requirement entries in file order
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.entries.iter().filter_map(Entry::as_requirement)
    }
}

/// A root manifest and every file it includes
#[derive(Debug, Clone)]
pub struct ManifestSet {
    pub root: PathBuf,
    /// Files in depth-first load order, root first
    pub files: Vec<ManifestFile>,
    /// Include problems found while loading
    pub problems: Vec<Diagnostic>,
}

impl ManifestSet {
    /// Requirements from non-constraint files, in load order
    pub fn requirements(&self) -> impl Iterator<Item = &Requirement> {
        self.files
            .iter()
            .filter(|f| !f.is_constraint)
            .flat_map(ManifestFile::requirements)
    }

    /// Entries from constraint files, in load order
    pub fn constraints(&self) -> impl Iterator<Item = &Requirement> {
        self.files
            .iter()
            .filter(|f| f.is_constraint)
            .flat_map(ManifestFile::requirements)
    }

    pub fn file(&self, path: &Path) -> Option<&ManifestFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

/// Loads manifests, parsing each file at most once across roots
#[derive(Debug, Default)]
pub struct Loader {
    cache: HashMap<PathBuf, ManifestFile>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a root manifest and its include closure
    pub fn load(&mut self, info: &ManifestInfo) -> Result<ManifestSet, ManifestError> {
        let root = self.read(&info.path, info.is_constraint)?;
        let mut set = ManifestSet {
            root: info.path.clone(),
            files: Vec::new(),
            problems: Vec::new(),
        };
        let mut seen = HashSet::new();
        let mut stack = Vec::new();
        self.visit(root, &mut set, &mut seen, &mut stack);
        debug!(
            root = %info.path.display(),
            files = set.files.len(),
            problems = set.problems.len(),
            "loaded manifest set"
        );
        Ok(set)
    }

    /// Load several roots
    pub fn load_all(&mut self, infos: &[ManifestInfo]) -> Result<Vec<ManifestSet>, ManifestError> {
        infos.iter().map(|info| self.load(info)).collect()
    }

    fn read(&mut self, path: &Path, is_constraint: bool) -> Result<ManifestFile, ManifestError> {
        let key = identity(path);
        if let Some(cached) = self.cache.get(&key) {
            let mut file = cached.clone();
            // The same file may be reached under another spelling
            file.path = path.to_path_buf();
            file.is_constraint = is_constraint;
            for entry in &mut file.entries {
                if let Entry::Requirement(req) = entry {
                    req.source.path = path.to_path_buf();
                }
            }
            return Ok(file);
        }

        debug!(path = %path.display(), "reading manifest");
        let content =
            fs::read_to_string(path).map_err(|e| ManifestError::read_error(path, e))?;
        let file = ManifestFile::parse(path, content, is_constraint);
        self.cache.insert(key, file.clone());
        Ok(file)
    }

    fn visit(
        &mut self,
        file: ManifestFile,
        set: &mut ManifestSet,
        seen: &mut HashSet<PathBuf>,
        stack: &mut Vec<PathBuf>,
    ) {
        let key = identity(&file.path);
        seen.insert(key.clone());
        stack.push(key);

        let base = file
            .path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let includes: Vec<(PathBuf, bool, usize)> = file
            .entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Include { target, line } => {
                    Some((base.join(target), file.is_constraint, *line))
                }
                Entry::Constraint { target, line } => Some((base.join(target), true, *line)),
                _ => None,
            })
            .collect();
        let from = file.path.clone();
        set.files.push(file);

        for (target, is_constraint, line) in includes {
            let target_key = identity(&target);
            if stack.contains(&target_key) {
                set.problems.push(Diagnostic::new(
                    &from,
                    line,
                    RuleCode::IncludeCycle,
                    format!("include cycle: {} is already being loaded", target.display()),
                ));
                continue;
            }
            if seen.contains(&target_key) {
                debug!(path = %target.display(), "already loaded, skipping");
                continue;
            }
            match self.read(&target, is_constraint) {
                Ok(included) => {
                    debug!(from = %from.display(), to = %target.display(), "following include");
                    self.visit(included, set, seen, stack);
                }
                Err(e) => set.problems.push(Diagnostic::new(
                    &from,
                    line,
                    RuleCode::IncludeNotFound,
                    format!("cannot read included file {}: {}", target.display(), e),
                )),
            }
        }

        stack.pop();
    }
}

/// Stable identity for a path, used for cycle and duplicate detection
fn identity(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Files across several sets, first occurrence wins
///
/// A file reached from two roots appears once.
pub fn unique_files(sets: &[ManifestSet]) -> Vec<&ManifestFile> {
    let mut seen = HashSet::new();
    sets.iter()
        .flat_map(|set| &set.files)
        .filter(|file| seen.insert(identity(&file.path)))
        .collect()
}

/// Load a single manifest file and its includes
pub fn load(path: &Path) -> Result<ManifestSet, ManifestError> {
    Loader::new().load(&ManifestInfo::from_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_manifest_file_parse_collects_errors() {
        let file = ManifestFile::parse(
            "requirements.txt",
            "pytz>=2024.1\nnot a valid line\n--pre\n",
            false,
        );
        assert_eq!(file.entries.len(), 2);
        assert_eq!(file.errors.len(), 1);
        assert_eq!(file.errors[0].line, 2);
        assert_eq!(file.requirements().count(), 1);
    }

    #[test]
    fn test_load_follows_includes() {
        let dir = TempDir::new().unwrap();
        write(&dir, "base.txt", "requests>=2.31\n");
        write(&dir, "constraints.txt", "urllib3<3\n");
        let root = write(
            &dir,
            "requirements.txt",
            "-r base.txt\n-c constraints.txt\npytz>=2024.1\n",
        );

        let set = load(&root).unwrap();
        assert_eq!(set.files.len(), 3);
        assert!(set.problems.is_empty());

        let names: Vec<_> = set.requirements().map(|r| r.name.raw.as_str()).collect();
        assert_eq!(names, vec!["pytz", "requests"]);

        let constraints: Vec<_> = set.constraints().map(|r| r.name.raw.as_str()).collect();
        assert_eq!(constraints, vec!["urllib3"]);
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(&dir, "reqs/common.txt", "six\n");
        write(&dir, "reqs/dev.txt", "-r common.txt\npytest\n");
        let root = write(&dir, "requirements.txt", "-r reqs/dev.txt\n");

        let set = load(&root).unwrap();
        assert!(set.problems.is_empty());
        assert_eq!(set.requirements().count(), 2);
    }

    #[test]
    fn test_include_not_found() {
        let dir = TempDir::new().unwrap();
        let root = write(&dir, "requirements.txt", "flask\n-r missing.txt\n");

        let set = load(&root).unwrap();
        assert_eq!(set.problems.len(), 1);
        assert_eq!(set.problems[0].rule, RuleCode::IncludeNotFound);
        assert_eq!(set.problems[0].line, 2);
    }

    #[test]
    fn test_include_cycle() {
        let dir = TempDir::new().unwrap();
        write(&dir, "a.txt", "-r b.txt\n");
        write(&dir, "b.txt", "-r a.txt\n");
        let root = dir.path().join("a.txt");

        let set = load(&root).unwrap();
        assert_eq!(set.files.len(), 2);
        assert_eq!(set.problems.len(), 1);
        assert_eq!(set.problems[0].rule, RuleCode::IncludeCycle);
        assert!(set.problems[0].path.ends_with("b.txt"));
    }

    #[test]
    fn test_diamond_loads_once() {
        let dir = TempDir::new().unwrap();
        write(&dir, "common.txt", "six\n");
        write(&dir, "a.txt", "-r common.txt\n");
        write(&dir, "b.txt", "-r common.txt\n");
        let root = write(&dir, "requirements.txt", "-r a.txt\n-r b.txt\n");

        let set = load(&root).unwrap();
        assert_eq!(set.files.len(), 4);
        assert!(set.problems.is_empty());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = load(&dir.path().join("requirements.txt"));
        assert!(matches!(result, Err(ManifestError::NotFound { .. })));
    }

    #[test]
    fn test_loader_reuses_parsed_files() {
        let dir = TempDir::new().unwrap();
        write(&dir, "requirements.txt", "flask\n");
        let dev = write(&dir, "requirements-dev.txt", "-r requirements.txt\npytest\n");
        let root = dir.path().join("requirements.txt");

        let mut loader = Loader::new();
        let sets = loader
            .load_all(&[ManifestInfo::from_path(&dev), ManifestInfo::from_path(&root)])
            .unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].files.len(), 2);
        assert_eq!(sets[1].files.len(), 1);
        assert_eq!(loader.cache.len(), 2);
    }

    #[test]
    fn test_unique_files_across_roots() {
        let dir = TempDir::new().unwrap();
        let base = write(&dir, "requirements.txt", "flask\n");
        let dev = write(&dir, "requirements-dev.txt", "-r requirements.txt\npytest\n");

        let sets = Loader::new()
            .load_all(&[ManifestInfo::from_path(&dev), ManifestInfo::from_path(&base)])
            .unwrap();
        let paths: Vec<&Path> = unique_files(&sets).iter().map(|f| f.path.as_path()).collect();
        assert_eq!(paths, vec![dev.as_path(), base.as_path()]);
    }
}
