//! # Rule-Mode Matrix
//!
//! Decides which rule categories are active for a run. A rule-mode is a
//! named boolean axis; the final value of each axis for a project comes
//! from, in order of precedence:
//!
//! 1. an explicit override for this run ([`RuleModeOverrides`]),
//! 2. the project type's built-in default ([`RuleModeDefaults`]).
//!
//! A rule-mode the defaults table does not define for a project type is
//! always false for that type, whatever the overrides say.
//!
//! ## Single-select axes
//!
//! The compliance tiers (strict / specification / permissive) and the
//! Library Manager modes (submission / indexed / indexing) are each
//! single-select groups. Overriding one member of a group to true turns
//! the rest of the group off. After resolution the compliance group has
//! exactly one true member and the Library Manager group at most one;
//! anything else is a [`ConfigError`].

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::project::ProjectType;

/// A named rule-mode axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleMode {
    /// Strict compliance tier.
    Strict,
    /// Specification compliance tier.
    Specification,
    /// Permissive compliance tier.
    Permissive,
    /// Linting a library for submission to the Library Manager index.
    LibraryManagerSubmission,
    /// Linting an update of a library already in the Library Manager index.
    LibraryManagerIndexed,
    /// Linting a library release during Library Manager indexing.
    LibraryManagerIndexing,
    /// Linting an official Arduino project.
    Official,
    /// Always-on pseudo-mode, used by rule configurations as "otherwise".
    Default,
}

impl RuleMode {
    /// The compliance tier group.
    pub const COMPLIANCE: [RuleMode; 3] = [Self::Strict, Self::Specification, Self::Permissive];

    /// The Library Manager group.
    pub const LIBRARY_MANAGER: [RuleMode; 3] = [
        Self::LibraryManagerSubmission,
        Self::LibraryManagerIndexed,
        Self::LibraryManagerIndexing,
    ];

    /// Returns the kebab-case identifier of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Specification => "specification",
            Self::Permissive => "permissive",
            Self::LibraryManagerSubmission => "library-manager-submission",
            Self::LibraryManagerIndexed => "library-manager-indexed",
            Self::LibraryManagerIndexing => "library-manager-indexing",
            Self::Official => "official",
            Self::Default => "default",
        }
    }
}

impl std::fmt::Display for RuleMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A compliance tier. Selects which schema variant validates a document.
///
/// Ordered from most lenient to most demanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComplianceLevel {
    /// Only what the Arduino tools need to function.
    Permissive,
    /// Everything the Arduino specifications require.
    Specification,
    /// Specification plus best practices.
    Strict,
}

impl ComplianceLevel {
    /// Returns all tiers, most lenient first.
    pub fn all() -> &'static [ComplianceLevel] {
        &[Self::Permissive, Self::Specification, Self::Strict]
    }

    /// Returns the lowercase identifier of the tier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Permissive => "permissive",
            Self::Specification => "specification",
            Self::Strict => "strict",
        }
    }

    /// The rule-mode that represents this tier.
    pub fn rule_mode(&self) -> RuleMode {
        match self {
            Self::Permissive => RuleMode::Permissive,
            Self::Specification => RuleMode::Specification,
            Self::Strict => RuleMode::Strict,
        }
    }
}

impl std::fmt::Display for ComplianceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComplianceLevel {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "permissive" => Ok(Self::Permissive),
            "specification" => Ok(Self::Specification),
            "strict" => Ok(Self::Strict),
            _ => Err(ConfigError::InvalidCompliance(s.to_string())),
        }
    }
}

/// The `--library-manager` selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryManagerMode {
    /// The library is being submitted to the index.
    Submit,
    /// The library is already in the index.
    Update,
    /// The library has nothing to do with the Library Manager.
    False,
}

impl LibraryManagerMode {
    /// The rule-mode this selection enables, if any.
    pub fn rule_mode(&self) -> Option<RuleMode> {
        match self {
            Self::Submit => Some(RuleMode::LibraryManagerSubmission),
            Self::Update => Some(RuleMode::LibraryManagerIndexed),
            Self::False => None,
        }
    }
}

impl FromStr for LibraryManagerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "submit" => Ok(Self::Submit),
            "update" => Ok(Self::Update),
            "false" => Ok(Self::False),
            _ => Err(ConfigError::InvalidLibraryManagerMode(s.to_string())),
        }
    }
}

/// User-supplied rule-mode values for this run.
///
/// Populated once at startup from flags and environment variables, then
/// read-only. Use the group setters to keep single-select axes coherent;
/// [`RuleModeOverrides::insert`] sets one axis in isolation and leaves the
/// single-select discipline to [`resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleModeOverrides {
    modes: BTreeMap<RuleMode, bool>,
}

impl RuleModeOverrides {
    /// Creates an empty override set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides a single rule-mode.
    pub fn insert(&mut self, mode: RuleMode, value: bool) {
        self.modes.insert(mode, value);
    }

    /// Returns the override for a mode, if one was given.
    pub fn get(&self, mode: RuleMode) -> Option<bool> {
        self.modes.get(&mode).copied()
    }

    /// Returns true if nothing was overridden.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// Iterates over the overridden modes in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleMode, bool)> + '_ {
        self.modes.iter().map(|(mode, value)| (*mode, *value))
    }

    /// Selects a compliance tier, turning the other two off.
    pub fn set_compliance(&mut self, level: ComplianceLevel) {
        for mode in RuleMode::COMPLIANCE {
            self.modes.insert(mode, mode == level.rule_mode());
        }
    }

    /// Applies a `--library-manager` selection to the whole group.
    pub fn set_library_manager(&mut self, selection: LibraryManagerMode) {
        let selected = selection.rule_mode();
        for mode in RuleMode::LIBRARY_MANAGER {
            self.modes.insert(mode, Some(mode) == selected);
        }
    }

    /// Forces Library Manager indexing mode, whatever was selected before.
    pub fn set_library_manager_indexing(&mut self) {
        for mode in RuleMode::LIBRARY_MANAGER {
            self.modes
                .insert(mode, mode == RuleMode::LibraryManagerIndexing);
        }
    }

    /// Overrides the official-project mode.
    pub fn set_official(&mut self, official: bool) {
        self.modes.insert(RuleMode::Official, official);
    }

    /// Returns the compliance tier selected by these overrides, if any.
    pub fn compliance(&self) -> Option<ComplianceLevel> {
        ComplianceLevel::all()
            .iter()
            .copied()
            .find(|level| self.get(level.rule_mode()) == Some(true))
    }
}

/// The built-in per-project-type default rule-modes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleModeDefaults {
    table: BTreeMap<ProjectType, BTreeMap<RuleMode, bool>>,
}

impl RuleModeDefaults {
    /// Creates a table with no project types defined.
    pub fn empty() -> Self {
        Self {
            table: BTreeMap::new(),
        }
    }

    /// Sets the default for one mode of one project type.
    pub fn with(mut self, project_type: ProjectType, mode: RuleMode, value: bool) -> Self {
        self.table
            .entry(project_type)
            .or_default()
            .insert(mode, value);
        self
    }

    /// The defaults defined for a project type. Empty for unknown types.
    pub fn for_project(&self, project_type: ProjectType) -> impl Iterator<Item = (RuleMode, bool)> + '_ {
        self.table
            .get(&project_type)
            .into_iter()
            .flat_map(|modes| modes.iter().map(|(mode, value)| (*mode, *value)))
    }
}

impl Default for RuleModeDefaults {
    /// The Arduino Lint defaults.
    ///
    /// Every project type runs at specification compliance as an
    /// unofficial project. Only libraries have Library Manager modes.
    fn default() -> Self {
        let mut defaults = Self::empty();
        for project_type in ProjectType::all() {
            defaults = defaults
                .with(*project_type, RuleMode::Strict, false)
                .with(*project_type, RuleMode::Specification, true)
                .with(*project_type, RuleMode::Permissive, false)
                .with(*project_type, RuleMode::Official, false);
        }
        for mode in RuleMode::LIBRARY_MANAGER {
            defaults = defaults.with(ProjectType::Library, mode, false);
        }
        defaults
    }
}

/// The resolved rule-mode mapping for one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleModes {
    project_type: ProjectType,
    modes: BTreeMap<RuleMode, bool>,
}

impl RuleModes {
    /// The project type these modes were resolved for.
    pub fn project_type(&self) -> ProjectType {
        self.project_type
    }

    /// The value of a mode. Modes undefined for the project type are false.
    pub fn get(&self, mode: RuleMode) -> bool {
        self.modes.get(&mode).copied().unwrap_or(false)
    }

    /// Whether the mode is defined at all for the project type.
    pub fn is_defined(&self, mode: RuleMode) -> bool {
        self.modes.contains_key(&mode)
    }

    /// The active compliance tier.
    pub fn compliance(&self) -> ComplianceLevel {
        ComplianceLevel::all()
            .iter()
            .copied()
            .find(|level| self.get(level.rule_mode()))
            // resolve() guarantees one tier is set.
            .unwrap_or(ComplianceLevel::Specification)
    }

    /// The active Library Manager mode, if any.
    pub fn library_manager(&self) -> Option<RuleMode> {
        RuleMode::LIBRARY_MANAGER
            .into_iter()
            .find(|mode| self.get(*mode))
    }

    /// Iterates over the defined modes in a stable order.
    pub fn iter(&self) -> impl Iterator<Item = (RuleMode, bool)> + '_ {
        self.modes.iter().map(|(mode, value)| (*mode, *value))
    }
}

/// Resolves the final rule-mode mapping for a project type.
///
/// # Errors
///
/// Returns [`ConfigError::ConflictingModes`] if more than one member of a
/// single-select group ends up true, and [`ConfigError::NoComplianceTier`]
/// if no compliance tier does.
pub fn resolve(
    defaults: &RuleModeDefaults,
    overrides: &RuleModeOverrides,
    project_type: ProjectType,
) -> Result<RuleModes, ConfigError> {
    let mut modes = BTreeMap::new();
    for (mode, default_value) in defaults.for_project(project_type) {
        let value = match overrides.get(mode) {
            Some(value) => value,
            None => {
                tracing::trace!(
                    project_type = %project_type,
                    mode = %mode,
                    value = default_value,
                    "using default rule mode"
                );
                default_value
            }
        };
        modes.insert(mode, value);
    }

    apply_single_select(&mut modes, overrides, &RuleMode::COMPLIANCE, "compliance")?;
    apply_single_select(
        &mut modes,
        overrides,
        &RuleMode::LIBRARY_MANAGER,
        "library manager",
    )?;

    if !RuleMode::COMPLIANCE
        .iter()
        .any(|mode| modes.get(mode).copied().unwrap_or(false))
    {
        return Err(ConfigError::NoComplianceTier);
    }

    modes.insert(RuleMode::Default, true);

    Ok(RuleModes {
        project_type,
        modes,
    })
}

/// Enforces the single-select discipline on one group of modes.
///
/// An override to true wins over every other member's default or
/// override. Two overrides to true, or two true defaults, conflict.
fn apply_single_select(
    modes: &mut BTreeMap<RuleMode, bool>,
    overrides: &RuleModeOverrides,
    group: &[RuleMode],
    axis: &'static str,
) -> Result<(), ConfigError> {
    let selected: Vec<RuleMode> = group
        .iter()
        .copied()
        .filter(|mode| modes.contains_key(mode) && overrides.get(*mode) == Some(true))
        .collect();

    match selected.as_slice() {
        [] => {}
        [winner] => {
            for mode in group {
                if let Some(value) = modes.get_mut(mode) {
                    *value = mode == winner;
                }
            }
        }
        _ => return Err(conflict(axis, &selected)),
    }

    let enabled: Vec<RuleMode> = group
        .iter()
        .copied()
        .filter(|mode| modes.get(mode).copied().unwrap_or(false))
        .collect();
    if enabled.len() > 1 {
        return Err(conflict(axis, &enabled));
    }
    Ok(())
}

fn conflict(axis: &'static str, modes: &[RuleMode]) -> ConfigError {
    ConfigError::ConflictingModes {
        axis,
        modes: modes
            .iter()
            .map(RuleMode::as_str)
            .collect::<Vec<_>>()
            .join(", "),
    }
}
