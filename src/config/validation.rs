//! Content validation
//!
//! Schema and semantic validation for content packs. Validation runs on the
//! fully deserialized `ContentPack` and collects ALL issues rather than
//! stopping at the first one.
//!
//! Scenario network tables are matched by exact text first and then by
//! "first key (in authoring order) contained in the command line". The
//! validator reports the two ways an author can make that lookup surprising:
//! keys that can never be reached because a builtin command answers first,
//! and an earlier key that is a substring of a later one, which steals every
//! non-exact match of the later key.

use std::collections::{HashMap, HashSet};

use crate::config::loader::ContentLimits;
use crate::config::schema::{ContentPack, Lab, RankTier, ScenarioDefinition};
use crate::error::{Severity, ValidationIssue};
use crate::terminal::interpreter::is_builtin;

// ============================================================================
// Public API
// ============================================================================

/// Result of content validation.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// Validation errors (prevent loading).
    pub errors: Vec<ValidationIssue>,

    /// Validation warnings (informational).
    pub warnings: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Returns `true` if there are any errors.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Returns `true` if validation passed (no errors).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Content validator.
///
/// In strict mode, overlapping scenario network keys are errors instead of
/// warnings.
#[derive(Debug, Default)]
pub struct Validator {
    strict: bool,
    errors: Vec<ValidationIssue>,
    warnings: Vec<ValidationIssue>,
}

impl Validator {
    /// Creates a new validator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a validator that rejects ambiguous scenario tables.
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Validates a content pack and returns the result.
    pub fn validate(&mut self, pack: &ContentPack, limits: &ContentLimits) -> ValidationResult {
        self.errors.clear();
        self.warnings.clear();

        self.validate_labs(&pack.labs, limits);
        if let Some(tiers) = &pack.rank_tiers {
            self.validate_rank_tiers(tiers);
        }
        self.validate_scenarios(&pack.scenarios, &pack.labs);

        ValidationResult {
            errors: std::mem::take(&mut self.errors),
            warnings: std::mem::take(&mut self.warnings),
        }
    }

    // ========================================================================
    // Labs
    // ========================================================================

    fn validate_labs(&mut self, labs: &[Lab], limits: &ContentLimits) {
        if labs.len() > limits.max_labs {
            self.add_error(
                "labs",
                &format!(
                    "Too many labs: {} (maximum: {}). \
                     Set CYBERLABS_MAX_LABS to increase the limit.",
                    labs.len(),
                    limits.max_labs
                ),
            );
        }

        let mut ids = HashSet::new();
        let mut slugs = HashSet::new();

        for (i, lab) in labs.iter().enumerate() {
            let path = format!("labs[{i}]");

            if lab.id == 0 {
                self.add_error(&format!("{path}.id"), "Lab id must be a positive integer");
            } else if !ids.insert(lab.id) {
                self.add_error(&format!("{path}.id"), &format!("Duplicate lab id {}", lab.id));
            }

            if lab.title.trim().is_empty() {
                self.add_error(&format!("{path}.title"), "Lab title is required");
            }

            if !lab.slug.is_empty() && !slugs.insert(lab.slug.as_str()) {
                self.add_warning(
                    &format!("{path}.slug"),
                    &format!("Duplicate lab slug '{}'", lab.slug),
                );
            }

            let mut tags = HashSet::new();
            for tag in &lab.tags {
                if !tags.insert(tag.as_str()) {
                    self.add_warning(&format!("{path}.tags"), &format!("Duplicate tag '{tag}'"));
                }
            }

            self.validate_steps(&path, lab, limits);
        }
    }

    fn validate_steps(&mut self, path: &str, lab: &Lab, limits: &ContentLimits) {
        if lab.steps.is_empty() {
            self.add_error(&format!("{path}.steps"), "Lab has no steps");
            return;
        }
        if lab.steps.len() > limits.max_steps {
            self.add_error(
                &format!("{path}.steps"),
                &format!(
                    "Too many steps: {} (maximum: {}). \
                     Set CYBERLABS_MAX_STEPS to increase the limit.",
                    lab.steps.len(),
                    limits.max_steps
                ),
            );
        }

        for (j, step) in lab.steps.iter().enumerate() {
            let step_path = format!("{path}.steps[{j}]");
            if step.question.trim().is_empty() {
                self.add_error(&format!("{step_path}.question"), "Step question is required");
            }
            if step.answer.trim().is_empty() {
                self.add_error(&format!("{step_path}.answer"), "Step answer is required");
            }
        }
    }

    // ========================================================================
    // Rank Tiers
    // ========================================================================

    fn validate_rank_tiers(&mut self, tiers: &[RankTier]) {
        let Some(first) = tiers.first() else {
            self.add_error("rankTiers", "At least one rank tier is required");
            return;
        };
        if first.min_score != 0 {
            self.add_error(
                "rankTiers[0].minScore",
                "The first rank tier must start at score 0",
            );
        }

        for (i, tier) in tiers.iter().enumerate() {
            if tier.title.trim().is_empty() {
                self.add_error(&format!("rankTiers[{i}].title"), "Tier title is required");
            }
        }

        for (i, pair) in tiers.windows(2).enumerate() {
            if pair[1].min_score <= pair[0].min_score {
                self.add_error(
                    &format!("rankTiers[{}].minScore", i + 1),
                    &format!(
                        "Tier '{}' must have a higher minScore than '{}'",
                        pair[1].title, pair[0].title
                    ),
                );
            }
        }
    }

    // ========================================================================
    // Scenarios
    // ========================================================================

    fn validate_scenarios(&mut self, scenarios: &[ScenarioDefinition], labs: &[Lab]) {
        let known_labs: HashSet<u64> = labs.iter().map(|l| l.id).collect();
        let mut names = HashSet::new();
        let mut owners: HashMap<u64, &str> = HashMap::new();

        for (i, def) in scenarios.iter().enumerate() {
            let path = format!("scenarios[{i}]");

            if def.name.trim().is_empty() {
                self.add_error(&format!("{path}.name"), "Scenario name is required");
            } else if !names.insert(def.name.as_str()) {
                self.add_error(
                    &format!("{path}.name"),
                    &format!("Duplicate scenario name '{}'", def.name),
                );
            }

            for lab_id in &def.labs {
                if let Some(previous) = owners.insert(*lab_id, def.name.as_str()) {
                    self.add_error(
                        &format!("{path}.labs"),
                        &format!(
                            "Lab {lab_id} is already assigned to scenario '{previous}'"
                        ),
                    );
                }
                if !known_labs.is_empty() && !known_labs.contains(lab_id) {
                    self.add_warning(
                        &format!("{path}.labs"),
                        &format!("Scenario references unknown lab {lab_id}"),
                    );
                }
            }

            self.validate_network_table(&path, def);
        }
    }

    fn validate_network_table(&mut self, path: &str, def: &ScenarioDefinition) {
        let mut reachable: Vec<&str> = Vec::new();

        for key in def.scenario.network.keys() {
            let key_path = format!("{path}.network[{key:?}]");
            let trimmed = key.trim();
            if trimmed.is_empty() {
                self.add_error(&key_path, "Empty network key matches every command");
                continue;
            }

            let binary = trimmed.split_whitespace().next().unwrap_or_default();
            if is_builtin(binary) {
                self.add_warning(
                    &key_path,
                    &format!(
                        "Shadowed entry: input starting with '{binary}' runs the builtin command; \
                         this key only answers commands that contain it elsewhere"
                    ),
                );
            }

            for earlier in &reachable {
                if key.contains(*earlier) {
                    let message = format!(
                        "Ambiguous entry: earlier key {earlier:?} is a substring of {key:?} \
                         and wins every non-exact match; list the longer key first"
                    );
                    if self.strict {
                        self.add_error(&key_path, &message);
                    } else {
                        self.add_warning(&key_path, &message);
                    }
                }
            }
            reachable.push(key.as_str());
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn add_error(&mut self, path: &str, message: &str) {
        self.errors.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Error,
        });
    }

    fn add_warning(&mut self, path: &str, message: &str) {
        self.warnings.push(ValidationIssue {
            path: path.to_string(),
            message: message.to_string(),
            severity: Severity::Warning,
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{Scenario, Step};

    fn step(answer: &str) -> Step {
        Step {
            title: "Step".to_string(),
            content: String::new(),
            question: "What?".to_string(),
            answer: answer.to_string(),
            hint: None,
        }
    }

    fn lab(id: u64) -> Lab {
        Lab {
            id,
            slug: format!("lab-{id}"),
            title: format!("Lab {id}"),
            description: String::new(),
            module: "Module 1".to_string(),
            steps: vec![step("user")],
            points: 100,
            difficulty: crate::config::schema::Difficulty::Easy,
            lab_type: crate::config::schema::LabType::Walkthrough,
            tags: vec!["Linux".to_string()],
            thumbnail: String::new(),
        }
    }

    fn scenario(name: &str, labs: Vec<u64>, network: &[(&str, &str)]) -> ScenarioDefinition {
        ScenarioDefinition {
            name: name.to_string(),
            description: String::new(),
            labs,
            scenario: Scenario {
                file_system: indexmap::IndexMap::new(),
                network: network
                    .iter()
                    .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                    .collect(),
            },
        }
    }

    fn run(pack: &ContentPack) -> ValidationResult {
        Validator::new().validate(pack, &ContentLimits::default())
    }

    #[test]
    fn valid_pack_passes() {
        let pack = ContentPack {
            labs: vec![lab(1), lab(2)],
            scenarios: vec![scenario("linux", vec![1, 2], &[("whoami", "user")])],
            rank_tiers: None,
        };
        let result = run(&pack);
        assert!(result.is_valid(), "{:?}", result.errors);
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
    }

    #[test]
    fn collects_all_lab_errors() {
        let mut empty = lab(2);
        empty.steps.clear();
        let mut blank_answer = lab(3);
        blank_answer.steps = vec![step("   ")];
        let pack = ContentPack {
            labs: vec![lab(1), lab(1), empty, blank_answer, lab(0)],
            ..ContentPack::default()
        };

        let result = run(&pack);
        assert!(result.has_errors());
        let messages: Vec<&str> = result.errors.iter().map(|e| e.message.as_str()).collect();
        assert!(messages.contains(&"Duplicate lab id 1"));
        assert!(messages.contains(&"Lab has no steps"));
        assert!(messages.contains(&"Step answer is required"));
        assert!(messages.contains(&"Lab id must be a positive integer"));
    }

    #[test]
    fn duplicate_slug_and_tag_warn() {
        let mut second = lab(2);
        second.slug = "lab-1".to_string();
        second.tags = vec!["Web".to_string(), "Web".to_string()];
        let pack = ContentPack {
            labs: vec![lab(1), second],
            ..ContentPack::default()
        };
        let result = run(&pack);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn too_many_labs_rejected() {
        let pack = ContentPack {
            labs: vec![lab(1), lab(2), lab(3)],
            ..ContentPack::default()
        };
        let limits = ContentLimits {
            max_labs: 2,
            ..ContentLimits::default()
        };
        let result = Validator::new().validate(&pack, &limits);
        assert!(result.errors[0].message.contains("Too many labs"));
    }

    #[test]
    fn rank_tiers_must_start_at_zero_and_ascend() {
        let pack = ContentPack {
            rank_tiers: Some(vec![
                RankTier::new("Novice", 10),
                RankTier::new("Adept", 5),
            ]),
            ..ContentPack::default()
        };
        let result = run(&pack);
        assert_eq!(result.errors.len(), 2);

        let empty = ContentPack {
            rank_tiers: Some(vec![]),
            ..ContentPack::default()
        };
        assert!(run(&empty).has_errors());
    }

    #[test]
    fn lab_assigned_twice_is_an_error() {
        let pack = ContentPack {
            labs: vec![lab(1)],
            scenarios: vec![
                scenario("a", vec![1], &[]),
                scenario("b", vec![1], &[]),
            ],
            rank_tiers: None,
        };
        let result = run(&pack);
        assert!(result.errors[0].message.contains("already assigned to scenario 'a'"));
    }

    #[test]
    fn unknown_lab_reference_warns() {
        let pack = ContentPack {
            labs: vec![lab(1)],
            scenarios: vec![scenario("a", vec![1, 42], &[])],
            rank_tiers: None,
        };
        let result = run(&pack);
        assert!(result.is_valid());
        assert!(result.warnings[0].message.contains("unknown lab 42"));
    }

    #[test]
    fn builtin_shadowed_key_warns() {
        let pack = ContentPack {
            scenarios: vec![scenario("a", vec![], &[("ls -la", "A"), ("cat notes.txt", "B")])],
            ..ContentPack::default()
        };
        let result = run(&pack);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 2);
        let message = &result.warnings[0].message;
        assert!(message.starts_with("Shadowed entry"));
        assert!(message.contains("'ls'"));
        assert!(!message.contains("Unreachable"));
    }

    #[test]
    fn builtin_shadowed_key_still_takes_part_in_ordering() {
        // `sudo ls -la` resolves through the `ls -la` key, so it can shadow later keys.
        let pack = ContentPack {
            scenarios: vec![scenario(
                "a",
                vec![],
                &[("ls -la", "A"), ("sudo ls -la /root", "B")],
            )],
            ..ContentPack::default()
        };
        let result = run(&pack);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[1].message.contains("Ambiguous entry"));

        let strict = Validator::strict().validate(&pack, &ContentLimits::default());
        assert!(strict.has_errors());
    }

    #[test]
    fn overlapping_keys_warn_in_order() {
        // Longer key first: no ambiguity.
        let ordered = ContentPack {
            scenarios: vec![scenario(
                "web",
                vec![],
                &[("curl http://10.0.0.1/admin", "A"), ("curl http://10.0.0.1", "B")],
            )],
            ..ContentPack::default()
        };
        assert!(run(&ordered).warnings.is_empty());

        // Shorter key first: it steals non-exact matches of the longer key.
        let shadowing = ContentPack {
            scenarios: vec![scenario(
                "web",
                vec![],
                &[("curl http://10.0.0.1", "B"), ("curl http://10.0.0.1/admin", "A")],
            )],
            ..ContentPack::default()
        };
        let result = run(&shadowing);
        assert!(result.is_valid());
        assert!(result.warnings[0].message.contains("Ambiguous entry"));

        let strict = Validator::strict().validate(&shadowing, &ContentLimits::default());
        assert!(strict.has_errors());
    }

    #[test]
    fn empty_network_key_rejected() {
        let pack = ContentPack {
            scenarios: vec![scenario("a", vec![], &[("  ", "everything")])],
            ..ContentPack::default()
        };
        assert!(run(&pack).has_errors());
    }
}
