//! Authoring command handlers
//!
//! Implements `admin create-lab`.

use crate::cli::args::{CreateLabArgs, OutputFormat};
use crate::cli::commands::{Context, ensure, print_json};
use crate::content::{DEFAULT_MODULE, LabDraft};
use crate::error::Result;

/// Append a lab to the catalog.
///
/// The new lab has no steps, so it shows up in the catalog but cannot be
/// completed until steps are authored in a content pack.
///
/// # Errors
///
/// Returns a usage error unless an admin is logged in, or a store error.
pub async fn create_lab(ctx: &Context, args: &CreateLabArgs) -> Result<()> {
    let range = ctx.range().await?;
    let user = range.require_user().await?;
    ensure(
        user.is_admin(),
        format!("{} is not an admin; lab authoring requires the admin role", user.email),
    )?;

    let lab = range
        .content()
        .create_lab(LabDraft {
            title: args.title.clone(),
            description: args.description.clone(),
            module: args.module.clone(),
            points: args.points,
            difficulty: args.difficulty,
            lab_type: args.lab_type,
            tags: args.tags.clone(),
        })
        .await?;
    tracing::debug!(lab_id = lab.id, author = user.id, "authored by admin");

    match args.format {
        OutputFormat::Json => print_json(&lab),
        OutputFormat::Human => {
            println!("Created lab #{} '{}' ({})", lab.id, lab.title, lab.slug);
            let module = if lab.module.trim().is_empty() {
                DEFAULT_MODULE
            } else {
                &lab.module
            };
            println!("  Module: {module}");
            println!("  {} | {} | {} pts", lab.lab_type, lab.difficulty, lab.points);
            println!("Note: the lab has no steps and cannot be completed yet.");
            Ok(())
        }
    }
}
