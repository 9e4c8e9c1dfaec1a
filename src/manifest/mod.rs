//! Requirements file detection, parsing and writing
//!
//! This module provides functionality to:
//! - Detect requirements files in a directory
//! - Split files into logical lines and parse each line
//! - Follow `-r` and `-c` includes with cycle detection
//! - Rewrite version constraints in place

mod detector;
mod lines;
mod loader;
mod parser;
mod writer;

pub use detector::{detect_manifests, resolve_manifests, ManifestInfo};
pub use lines::{logical_lines, LogicalLine};
pub use loader::{load, unique_files, Loader, ManifestFile, ManifestSet};
pub use parser::{parse_line, Entry, LineError};
pub use writer::{read_manifest, write_manifest, ChangedLine, ManifestWriter, WriteResult};
