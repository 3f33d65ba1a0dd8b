//! Content schema types
//!
//! This module defines the lab, step, scenario, and rank tier types that
//! make up a `CyberLabs` content pack. These types are deserialized from
//! YAML content files and persisted as JSON by the stores.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Content Pack
// ============================================================================

/// Root document of a content file.
///
/// A pack may carry labs, scenarios, and an optional rank tier override.
/// Any section may be omitted; the built-in pack is assembled from the
/// embedded catalog and the embedded scenario files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentPack {
    /// Lab catalog in display order
    #[serde(default)]
    pub labs: Vec<Lab>,

    /// Scenario definitions
    #[serde(default)]
    pub scenarios: Vec<ScenarioDefinition>,

    /// Rank tier override (defaults to the built-in ladder)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_tiers: Option<Vec<RankTier>>,
}

// ============================================================================
// Labs
// ============================================================================

/// One training exercise, composed of ordered steps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lab {
    /// Unique positive identifier
    pub id: u64,

    /// URL-friendly identifier
    #[serde(default)]
    pub slug: String,

    /// Display title
    pub title: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Track grouping label
    #[serde(default)]
    pub module: String,

    /// Ordered steps; empty for labs created through authoring
    #[serde(default)]
    pub steps: Vec<Step>,

    /// Points awarded on first completion
    #[serde(default)]
    pub points: u64,

    /// Difficulty rating
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Guided walkthrough or capture-the-flag
    #[serde(rename = "type", default)]
    pub lab_type: LabType,

    /// Free-form tags
    #[serde(default)]
    pub tags: Vec<String>,

    /// Thumbnail image reference
    #[serde(default)]
    pub thumbnail: String,
}

impl Lab {
    /// Returns the step at `index`, if any.
    #[must_use]
    pub fn step(&self, index: usize) -> Option<&Step> {
        self.steps.get(index)
    }

    /// Returns `true` if `index` is the last step of this lab.
    #[must_use]
    pub const fn is_final_step(&self, index: usize) -> bool {
        !self.steps.is_empty() && index == self.steps.len() - 1
    }

    /// Returns the flag: the canonical answer of the final step.
    #[must_use]
    pub fn flag(&self) -> Option<&str> {
        self.steps.last().map(|s| s.answer.as_str())
    }
}

/// One question/answer unit within a lab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// Step title
    pub title: String,

    /// Instructional text (markdown)
    #[serde(default)]
    pub content: String,

    /// Question the learner must answer
    pub question: String,

    /// Canonical answer
    pub answer: String,

    /// Optional hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Lab difficulty rating.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    /// Beginner
    #[default]
    Easy,
    /// Intermediate
    Medium,
    /// Advanced
    Hard,
    /// Insane
    Insane,
}

impl Difficulty {
    /// Returns the human-readable title-case label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Easy => "Easy",
            Self::Medium => "Medium",
            Self::Hard => "Hard",
            Self::Insane => "Insane",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Lab format.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LabType {
    /// Guided, step-by-step exercise
    #[default]
    Walkthrough,
    /// Capture the flag
    #[value(name = "ctf")]
    Ctf,
}

impl fmt::Display for LabType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Walkthrough => write!(f, "Walkthrough"),
            Self::Ctf => write!(f, "Capture The Flag"),
        }
    }
}

// ============================================================================
// Scenarios
// ============================================================================

/// Simulated filesystem and command-output knowledge base for a lab.
///
/// Both maps keep authoring order; lookups that scan for a partial match
/// return the first hit in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    /// Path → file content
    #[serde(default)]
    pub file_system: IndexMap<String, String>,

    /// Exact command text → output
    #[serde(default)]
    pub network: IndexMap<String, String>,
}

impl Scenario {
    /// Returns `true` if both maps are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.file_system.is_empty() && self.network.is_empty()
    }
}

/// A named scenario together with the labs it backs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDefinition {
    /// Unique name (e.g. "linux")
    pub name: String,

    /// Short description
    #[serde(default)]
    pub description: String,

    /// Lab ids served by this scenario
    #[serde(default)]
    pub labs: Vec<u64>,

    /// The knowledge base itself
    #[serde(flatten)]
    pub scenario: Scenario,
}

// ============================================================================
// Rank Tiers
// ============================================================================

/// A named rank bracket keyed by a minimum score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankTier {
    /// Tier title (e.g. "Script Kiddie")
    pub title: String,

    /// Minimum score to hold this tier
    pub min_score: u64,
}

impl RankTier {
    /// Creates a tier.
    #[must_use]
    pub fn new(title: impl Into<String>, min_score: u64) -> Self {
        Self {
            title: title.into(),
            min_score,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
