//! # Project Types
//!
//! The kinds of Arduino project the linter understands. Each project type
//! carries its own rule-mode defaults and its own schema set, so every
//! `match` on [`ProjectType`] is exhaustive: adding a type forces each
//! consumer to decide how to treat it.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;

/// A lintable Arduino project type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    /// A sketch folder (`.ino` sources, optional `sketch.yaml`).
    Sketch,
    /// A library (`library.properties`, `src/`).
    Library,
    /// A boards platform (`boards.txt`, `platform.txt`, `programmers.txt`).
    Platform,
    /// A Boards Manager package index (`package_*_index.json`).
    PackageIndex,
}

impl ProjectType {
    /// Returns every concrete project type.
    pub fn all() -> &'static [ProjectType] {
        &[
            Self::Sketch,
            Self::Library,
            Self::Platform,
            Self::PackageIndex,
        ]
    }

    /// Returns the kebab-case identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sketch => "sketch",
            Self::Library => "library",
            Self::Platform => "platform",
            Self::PackageIndex => "package-index",
        }
    }
}

impl std::fmt::Display for ProjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProjectType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sketch" => Ok(Self::Sketch),
            "library" => Ok(Self::Library),
            "platform" => Ok(Self::Platform),
            "package-index" => Ok(Self::PackageIndex),
            _ => Err(ConfigError::InvalidProjectType(s.to_string())),
        }
    }
}

/// The `--project-type` filter: a single type, or every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectTypeFilter {
    /// Lint every detected project type.
    #[default]
    All,
    /// Lint only projects of this type.
    Only(ProjectType),
}

impl ProjectTypeFilter {
    /// Whether a project of the given type passes the filter.
    pub fn matches(&self, project_type: ProjectType) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => *only == project_type,
        }
    }
}

impl FromStr for ProjectTypeFilter {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse().map(Self::Only)
    }
}

impl std::fmt::Display for ProjectTypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(project_type) => project_type.fmt(f),
        }
    }
}
