//! reqcheck - validator and updater for pip requirements manifests
//!
//! This library provides:
//! - PEP 440 versions and specifiers, PEP 503 name normalization
//! - requirements.txt parsing with `-r` / `-c` include resolution
//! - Lint rules for malformed, duplicate and conflicting declarations
//! - Constraint updates against a PyPI-compatible JSON index

pub mod cli;
pub mod commands;
pub mod config;
pub mod domain;
pub mod error;
pub mod lint;
pub mod logging;
pub mod manifest;
pub mod orchestrator;
pub mod output;
pub mod progress;
pub mod registry;
pub mod update;
