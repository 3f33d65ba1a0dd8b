//! Built-in lab scenarios
//!
//! Simulated filesystems and command-output tables embedded in the binary
//! at compile time, plus the registry that maps lab ids to the scenario
//! backing them.
//!
//! Scenarios are shared: every lab mapped to `linux` holds the same
//! `Arc<Scenario>`. Labs with no mapping get the shared empty scenario, so
//! the interpreter answers them from builtins and the fallback only.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use indexmap::IndexMap;

use crate::config::schema::{Scenario, ScenarioDefinition};
use crate::error::ConfigError;

// ============================================================================
// Embedded Scenarios
// ============================================================================

/// A built-in scenario embedded in the binary.
pub struct BuiltinScenario {
    /// Unique identifier (e.g. "linux").
    pub name: &'static str,

    /// Short human-readable description.
    pub description: &'static str,

    /// Raw YAML content (embedded at compile time).
    pub yaml: &'static str,
}

static BUILTIN_SCENARIOS: LazyLock<Vec<BuiltinScenario>> = LazyLock::new(|| {
    vec![
        BuiltinScenario {
            name: "linux",
            description: "Home directory with notes, hidden config, logs and a flag in /tmp",
            yaml: include_str!("../../scenarios/linux.yaml"),
        },
        BuiltinScenario {
            name: "network",
            description: "Target host 192.168.1.10 with web, SSH and MySQL services",
            yaml: include_str!("../../scenarios/network.yaml"),
        },
        BuiltinScenario {
            name: "web",
            description: "Web target 10.10.10.5 with robots.txt, an admin portal and XSS",
            yaml: include_str!("../../scenarios/web.yaml"),
        },
        BuiltinScenario {
            name: "privesc",
            description: "Misconfigured sudo, SUID binaries and a root-owned cron job",
            yaml: include_str!("../../scenarios/privesc.yaml"),
        },
    ]
});

/// Returns all built-in scenarios in registry order.
#[must_use]
pub fn builtin_scenarios() -> &'static [BuiltinScenario] {
    &BUILTIN_SCENARIOS
}

/// Looks up a built-in scenario by exact name.
#[must_use]
pub fn find_builtin(name: &str) -> Option<&'static BuiltinScenario> {
    BUILTIN_SCENARIOS.iter().find(|s| s.name == name)
}

/// Suggest a similar built-in scenario name for typo correction.
///
/// Returns the closest match if its Damerau-Levenshtein distance is ≤ 3.
#[must_use]
pub fn suggest_scenario(input: &str) -> Option<String> {
    BUILTIN_SCENARIOS
        .iter()
        .map(|s| (s.name, strsim::damerau_levenshtein(input, s.name)))
        .filter(|(_, dist)| *dist <= 3)
        .min_by_key(|(_, dist)| *dist)
        .map(|(name, _)| name.to_string())
}

// ============================================================================
// Registry
// ============================================================================

/// A named scenario held by the registry.
#[derive(Debug, Clone)]
pub struct RegisteredScenario {
    /// Scenario name
    pub name: String,

    /// Short description
    pub description: String,

    /// Lab ids served by this scenario, in authoring order
    pub labs: Vec<u64>,

    /// Shared knowledge base
    pub scenario: Arc<Scenario>,
}

/// Lab id → scenario lookup.
#[derive(Debug, Clone)]
pub struct ScenarioRegistry {
    by_name: IndexMap<String, RegisteredScenario>,
    by_lab: HashMap<u64, Arc<Scenario>>,
    empty: Arc<Scenario>,
}

impl ScenarioRegistry {
    /// Builds a registry from validated scenario definitions.
    ///
    /// A lab listed by more than one definition keeps its first owner; the
    /// content validator reports such overlaps as errors before this runs.
    #[must_use]
    pub fn from_definitions(definitions: &[ScenarioDefinition]) -> Self {
        let mut by_name = IndexMap::new();
        let mut by_lab = HashMap::new();

        for def in definitions {
            let scenario = Arc::new(def.scenario.clone());
            for lab_id in &def.labs {
                by_lab.entry(*lab_id).or_insert_with(|| Arc::clone(&scenario));
            }
            by_name.insert(
                def.name.clone(),
                RegisteredScenario {
                    name: def.name.clone(),
                    description: def.description.clone(),
                    labs: def.labs.clone(),
                    scenario,
                },
            );
        }

        Self {
            by_name,
            by_lab,
            empty: Arc::new(Scenario::default()),
        }
    }

    /// Builds the registry of embedded scenarios.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` if an embedded scenario is malformed.
    pub fn builtin() -> Result<Self, ConfigError> {
        let definitions = BUILTIN_SCENARIOS
            .iter()
            .map(|builtin| {
                serde_yaml::from_str::<ScenarioDefinition>(builtin.yaml).map_err(|e| {
                    ConfigError::ParseError {
                        path: format!("<builtin>/{}", builtin.name).into(),
                        line: e.location().map(|l| l.line()),
                        message: e.to_string(),
                    }
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_definitions(&definitions))
    }

    /// Returns the scenario backing `lab_id`, or the shared empty scenario.
    #[must_use]
    pub fn scenario_for(&self, lab_id: u64) -> Arc<Scenario> {
        self.by_lab
            .get(&lab_id)
            .map_or_else(|| Arc::clone(&self.empty), Arc::clone)
    }

    /// Returns `true` if some scenario backs `lab_id`.
    #[must_use]
    pub fn has_scenario(&self, lab_id: u64) -> bool {
        self.by_lab.contains_key(&lab_id)
    }

    /// Looks up a scenario by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&RegisteredScenario> {
        self.by_name.get(name)
    }

    /// Iterates registered scenarios in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredScenario> {
        self.by_name.values()
    }

    /// Returns the registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.by_name.keys().map(String::as_str).collect()
    }

    /// Suggests the closest registered name for a misspelled one.
    #[must_use]
    pub fn suggest(&self, input: &str) -> Option<String> {
        self.by_name
            .keys()
            .map(|name| (name, strsim::damerau_levenshtein(input, name)))
            .filter(|(_, dist)| *dist <= 3)
            .min_by_key(|(_, dist)| *dist)
            .map(|(name, _)| name.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
