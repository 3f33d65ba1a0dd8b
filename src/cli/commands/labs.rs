//! Catalog command handlers
//!
//! Implements `labs list` and `labs show`. Answers are never printed.

use serde::Serialize;

use crate::cli::args::{LabsListArgs, LabsShowArgs, OutputFormat};
use crate::cli::commands::{Context, print_json};
use crate::config::schema::{Difficulty, Lab, LabType};
use crate::content::group_by_module;
use crate::error::{CyberLabsError, Result};
use crate::users::User;

/// Catalog entry without step answers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LabSummary<'a> {
    id: u64,
    slug: &'a str,
    title: &'a str,
    description: &'a str,
    module: &'a str,
    points: u64,
    difficulty: Difficulty,
    #[serde(rename = "type")]
    lab_type: LabType,
    tags: &'a [String],
    thumbnail: &'a str,
    steps: usize,
    has_scenario: bool,
    completed: bool,
}

/// Step as shown to a player.
#[derive(Debug, Serialize)]
struct StepSummary<'a> {
    title: &'a str,
    content: &'a str,
    question: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<&'a str>,
}

fn summarize<'a>(lab: &'a Lab, user: Option<&User>, has_scenario: bool) -> LabSummary<'a> {
    LabSummary {
        id: lab.id,
        slug: &lab.slug,
        title: &lab.title,
        description: &lab.description,
        module: &lab.module,
        points: lab.points,
        difficulty: lab.difficulty,
        lab_type: lab.lab_type,
        tags: &lab.tags,
        thumbnail: &lab.thumbnail,
        steps: lab.steps.len(),
        has_scenario,
        completed: user.is_some_and(|u| u.has_completed(lab.id)),
    }
}

/// List labs grouped by module.
///
/// # Errors
///
/// Returns a store error if the catalog cannot be read.
pub async fn list(ctx: &Context, args: &LabsListArgs) -> Result<()> {
    let range = ctx.range().await?;
    let labs = range.content().get_labs().await?;
    let user = range.users().get_current_user().await?;
    let filter = args.module.as_deref().map(str::to_lowercase);

    let groups: Vec<_> = group_by_module(&labs)
        .into_iter()
        .filter(|(module, _)| {
            filter
                .as_deref()
                .is_none_or(|f| module.to_lowercase().contains(f))
        })
        .collect();

    match args.format {
        OutputFormat::Json => {
            let summaries: Vec<_> = groups
                .iter()
                .flat_map(|(_, labs)| labs.iter())
                .map(|lab| {
                    summarize(lab, user.as_ref(), range.scenarios().has_scenario(lab.id))
                })
                .collect();
            print_json(&summaries)
        }
        OutputFormat::Human => {
            if groups.is_empty() {
                println!("No labs match the given filters.");
                return Ok(());
            }
            for (module, labs) in &groups {
                println!("{module}");
                for lab in labs {
                    let mark = if user.as_ref().is_some_and(|u| u.has_completed(lab.id)) {
                        "[x]"
                    } else {
                        "[ ]"
                    };
                    println!(
                        "  {mark} {:>3}  {:<40}{:<8}{:>6} pts",
                        lab.id,
                        lab.title,
                        lab.difficulty.label(),
                        lab.points
                    );
                }
                println!();
            }
            println!("Start a lab: cyberlabs play <id>");
            Ok(())
        }
    }
}

/// Show one lab with its steps and questions.
///
/// # Errors
///
/// Returns `LabNotFound` for an unknown id.
pub async fn show(ctx: &Context, args: &LabsShowArgs) -> Result<()> {
    let range = ctx.range().await?;
    let lab = range
        .content()
        .get_lab_by_id(args.id)
        .await?
        .ok_or(CyberLabsError::LabNotFound(args.id))?;
    let user = range.users().get_current_user().await?;
    let has_scenario = range.scenarios().has_scenario(lab.id);

    match args.format {
        OutputFormat::Json => {
            let steps: Vec<_> = lab
                .steps
                .iter()
                .map(|s| StepSummary {
                    title: &s.title,
                    content: &s.content,
                    question: &s.question,
                    hint: s.hint.as_deref(),
                })
                .collect();
            print_json(&serde_json::json!({
                "lab": summarize(&lab, user.as_ref(), has_scenario),
                "steps": steps,
            }))
        }
        OutputFormat::Human => {
            println!("#{} {}", lab.id, lab.title);
            println!(
                "  {} | {} | {} | {} pts",
                lab.module,
                lab.lab_type,
                lab.difficulty,
                lab.points
            );
            if !lab.tags.is_empty() {
                println!("  Tags: {}", lab.tags.join(", "));
            }
            if !lab.description.is_empty() {
                println!("\n{}", lab.description);
            }
            if lab.steps.is_empty() {
                println!("\nThis lab has no steps yet.");
            }
            for (i, step) in lab.steps.iter().enumerate() {
                println!("\nStep {}: {}", i + 1, step.title);
                println!("  Q: {}", step.question);
            }
            if !has_scenario {
                println!("\nNo terminal scenario is attached to this lab.");
            }
            Ok(())
        }
    }
}
