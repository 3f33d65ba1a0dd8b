//! Scenarios command handlers
//!
//! Implements `scenarios list` and `scenarios show`.

use std::fmt::Write as _;

use crate::cli::args::{FormatArgs, OutputFormat, ScenariosShowArgs};
use crate::cli::commands::{Context, print_json};
use crate::error::{CyberLabsError, Result};
use crate::scenarios::{self, ScenarioRegistry};

/// Renders lab ids as compact ranges, e.g. `1-6, 9`.
fn format_lab_ranges(labs: &[u64]) -> String {
    let mut sorted = labs.to_vec();
    sorted.sort_unstable();
    sorted.dedup();

    let mut parts = Vec::new();
    let mut iter = sorted.into_iter().peekable();
    while let Some(start) = iter.next() {
        let mut end = start;
        while iter.peek() == Some(&(end + 1)) {
            end += 1;
            iter.next();
        }
        if start == end {
            parts.push(start.to_string());
        } else {
            parts.push(format!("{start}-{end}"));
        }
    }
    parts.join(", ")
}

/// List scenarios of the active content pack.
///
/// # Errors
///
/// Returns a config error if the content pack fails to load.
#[allow(clippy::unused_async)]
pub async fn list(ctx: &Context, args: &FormatArgs) -> Result<()> {
    let pack = ctx.load_pack()?;
    let registry = if pack.scenarios.is_empty() {
        ScenarioRegistry::builtin()?
    } else {
        ScenarioRegistry::from_definitions(&pack.scenarios)
    };

    match args.format {
        OutputFormat::Json => {
            let entries: Vec<serde_json::Value> = registry
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "name": s.name,
                        "description": s.description,
                        "labs": s.labs,
                        "files": s.scenario.file_system.len(),
                        "commands": s.scenario.network.len(),
                    })
                })
                .collect();
            print_json(&entries)
        }
        OutputFormat::Human => {
            let total = registry.iter().count();
            println!("Scenarios ({total} available)\n");
            for s in registry.iter() {
                println!(
                    "  {:<12}labs {:<10}{:>3} files {:>3} commands  {}",
                    s.name,
                    format_lab_ranges(&s.labs),
                    s.scenario.file_system.len(),
                    s.scenario.network.len(),
                    s.description
                );
            }
            println!("\nView YAML: cyberlabs scenarios show <name>");
            Ok(())
        }
    }
}

/// Print the YAML of a built-in scenario.
///
/// # Errors
///
/// Returns a usage error if the scenario name is not found.
#[allow(clippy::unused_async)]
pub async fn show(args: &ScenariosShowArgs) -> Result<()> {
    let scenario = scenarios::find_builtin(&args.name).ok_or_else(|| {
        let mut message = format!("Unknown scenario '{}'", args.name);

        if let Some(suggestion) = scenarios::suggest_scenario(&args.name) {
            let _ = write!(message, "\n\nDid you mean '{suggestion}'?");
        }

        message.push_str("\n\nAvailable scenarios:");
        for s in scenarios::builtin_scenarios() {
            let _ = write!(message, "\n  {:<12}{}", s.name, s.description);
        }
        CyberLabsError::Usage(message)
    })?;

    print!("{}", scenario.yaml);
    Ok(())
}
