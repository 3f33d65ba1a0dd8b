//! Validate command handler
//!
//! Loads content packs through the full pipeline without touching the
//! data directory.

use std::path::Path;

use serde::Serialize;

use crate::cli::args::{OutputFormat, ValidateArgs};
use crate::cli::commands::print_json;
use crate::config::{ContentLoader, LoadResult, LoaderOptions};
use crate::error::{ConfigError, Result};

#[derive(Debug, Serialize)]
struct FileReport {
    file: String,
    valid: bool,
    labs: usize,
    scenarios: usize,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl FileReport {
    fn from_outcome(file: String, outcome: &std::result::Result<LoadResult, ConfigError>) -> Self {
        match outcome {
            Ok(loaded) => Self {
                file,
                valid: true,
                labs: loaded.pack.labs.len(),
                scenarios: loaded.pack.scenarios.len(),
                warnings: loaded.warnings.iter().map(ToString::to_string).collect(),
                errors: Vec::new(),
            },
            Err(ConfigError::ValidationError { errors, .. }) => Self {
                file,
                valid: false,
                labs: 0,
                scenarios: 0,
                warnings: Vec::new(),
                errors: errors.iter().map(ToString::to_string).collect(),
            },
            Err(other) => Self {
                file,
                valid: false,
                labs: 0,
                scenarios: 0,
                warnings: Vec::new(),
                errors: vec![other.to_string()],
            },
        }
    }
}

/// Validate content packs, or the built-in pack when no files are given.
///
/// Every file is checked; the first failure is returned after all reports
/// are printed.
///
/// # Errors
///
/// Returns a config error if any file fails to load.
#[allow(clippy::unused_async)]
pub async fn run(args: &ValidateArgs) -> Result<()> {
    let loader = ContentLoader::new(LoaderOptions {
        strict: args.strict,
        ..LoaderOptions::default()
    });

    let mut outcomes: Vec<(String, std::result::Result<LoadResult, ConfigError>)> = Vec::new();
    if args.files.is_empty() {
        outcomes.push(("<builtin>".to_string(), loader.load_builtin()));
    } else {
        for path in &args.files {
            outcomes.push((display(path), loader.load(path)));
        }
    }

    let reports: Vec<FileReport> = outcomes
        .iter()
        .map(|(file, outcome)| FileReport::from_outcome(file.clone(), outcome))
        .collect();

    match args.format {
        OutputFormat::Json => print_json(&reports)?,
        OutputFormat::Human => {
            for report in &reports {
                if report.valid {
                    println!(
                        "✓ {}: {} labs, {} scenarios ({} warnings)",
                        report.file,
                        report.labs,
                        report.scenarios,
                        report.warnings.len()
                    );
                    for warning in &report.warnings {
                        println!("    {warning}");
                    }
                } else {
                    println!("✗ {}", report.file);
                    for error in &report.errors {
                        println!("    {error}");
                    }
                }
            }
        }
    }

    match outcomes.into_iter().find_map(|(_, outcome)| outcome.err()) {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
