//! Content loader
//!
//! Loading pipeline for content packs:
//! 1. Size check against the configured limit
//! 2. UTF-8 BOM stripping
//! 3. YAML parsing (errors carry the line number)
//! 4. Validation (all issues collected)
//!
//! The built-in pack (embedded catalog + embedded scenarios) goes through
//! the same pipeline via [`ContentLoader::load_builtin`].

use std::path::Path;

use crate::config::schema::ContentPack;
use crate::config::validation::Validator;
use crate::error::{ConfigError, ValidationIssue};
use crate::scenarios;

/// Embedded seed catalog.
const BUILTIN_CATALOG: &str = include_str!("../../content/labs.yaml");

// ============================================================================
// Public API
// ============================================================================

/// Options for the content loader.
#[derive(Debug, Clone, Default)]
pub struct LoaderOptions {
    /// Limits for content size.
    pub limits: ContentLimits,

    /// Treat ambiguous scenario tables as errors.
    pub strict: bool,
}

/// Limits for content size to prevent resource exhaustion.
#[derive(Debug, Clone)]
pub struct ContentLimits {
    /// Maximum number of labs in one pack.
    pub max_labs: usize,

    /// Maximum number of steps in one lab.
    pub max_steps: usize,

    /// Maximum content file size in bytes.
    pub max_content_size: usize,
}

impl Default for ContentLimits {
    fn default() -> Self {
        Self {
            max_labs: env_or("CYBERLABS_MAX_LABS", 1000),
            max_steps: env_or("CYBERLABS_MAX_STEPS", 50),
            max_content_size: env_or("CYBERLABS_MAX_CONTENT_SIZE", 5 * 1024 * 1024),
        }
    }
}

/// Result of loading a content pack.
#[derive(Debug)]
pub struct LoadResult {
    /// The loaded and validated pack.
    pub pack: ContentPack,

    /// Warnings encountered during validation.
    pub warnings: Vec<ValidationIssue>,
}

/// Content loader.
#[derive(Debug, Default)]
pub struct ContentLoader {
    options: LoaderOptions,
}

impl ContentLoader {
    /// Creates a new content loader with the given options.
    #[must_use]
    pub const fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    /// Creates a new content loader with default options.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(LoaderOptions::default())
    }

    /// Loads a content file from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, exceeds the size limit,
    /// fails to parse, or fails validation.
    pub fn load(&self, path: &Path) -> Result<LoadResult, ConfigError> {
        let metadata = std::fs::metadata(path).map_err(|_| ConfigError::MissingFile {
            path: path.to_path_buf(),
        })?;

        let max = self.options.limits.max_content_size;
        let file_size = usize::try_from(metadata.len()).unwrap_or(max.saturating_add(1));
        if file_size > max {
            return Err(ConfigError::InvalidValue {
                field: "file_size".to_string(),
                value: format!("{file_size} bytes"),
                expected: format!("at most {max} bytes"),
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            line: None,
            message: e.to_string(),
        })?;

        self.load_named(&raw, path)
    }

    /// Loads a content pack from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or validation fails.
    pub fn load_from_str(&self, yaml: &str) -> Result<LoadResult, ConfigError> {
        self.load_named(yaml, Path::new("<string>"))
    }

    /// Loads the built-in catalog and scenarios.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded content fails to parse or validate.
    pub fn load_builtin(&self) -> Result<LoadResult, ConfigError> {
        let path = Path::new("<builtin>");
        let mut pack = parse(BUILTIN_CATALOG, path)?;
        for builtin in scenarios::builtin_scenarios() {
            let def = serde_yaml::from_str(builtin.yaml).map_err(|e| ConfigError::ParseError {
                path: path.join(builtin.name),
                line: e.location().map(|l| l.line()),
                message: e.to_string(),
            })?;
            pack.scenarios.push(def);
        }
        self.finish(pack, path)
    }

    fn load_named(&self, raw: &str, path: &Path) -> Result<LoadResult, ConfigError> {
        let raw = raw.strip_prefix('\u{feff}').unwrap_or(raw);
        if raw.trim().is_empty() {
            return Err(ConfigError::ParseError {
                path: path.to_path_buf(),
                line: None,
                message: "content file is empty".to_string(),
            });
        }
        let pack = parse(raw, path)?;
        self.finish(pack, path)
    }

    fn finish(&self, pack: ContentPack, path: &Path) -> Result<LoadResult, ConfigError> {
        let mut validator = if self.options.strict {
            Validator::strict()
        } else {
            Validator::new()
        };
        let result = validator.validate(&pack, &self.options.limits);
        if result.has_errors() {
            return Err(ConfigError::ValidationError {
                path: path.display().to_string(),
                errors: result.errors,
            });
        }

        tracing::debug!(
            path = %path.display(),
            labs = pack.labs.len(),
            scenarios = pack.scenarios.len(),
            warnings = result.warnings.len(),
            "content loaded"
        );

        Ok(LoadResult {
            pack,
            warnings: result.warnings,
        })
    }
}

fn parse(raw: &str, path: &Path) -> Result<ContentPack, ConfigError> {
    serde_yaml::from_str(raw).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        line: e.location().map(|l| l.line()),
        message: e.to_string(),
    })
}

/// Reads an environment variable and parses it, falling back to `default`.
fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

// ============================================================================
// Tests
// ============================================================================
