//! Account command handlers
//!
//! Implements `login`, `logout`, `whoami`, and `leaderboard`.

use crate::cli::args::{FormatArgs, LoginArgs, OutputFormat};
use crate::cli::commands::{Context, print_json};
use crate::error::Result;
use crate::ledger::rank::RankView;
use crate::users::User;

/// Width of the tier progress bar.
const PROGRESS_BAR_WIDTH: usize = 20;

/// Log in, creating the account on first use.
///
/// # Errors
///
/// Returns a usage error for a blank email, or a store error.
pub async fn login(ctx: &Context, args: &LoginArgs) -> Result<()> {
    let range = ctx.range().await?;
    let session = range.login(&args.email).await?;
    let user = &session.user;
    if session.provisioned {
        println!("Welcome, {}! Account #{} created ({}).", user.name, user.id, user.role);
    } else {
        println!("Welcome back, {}.", user.name);
    }
    Ok(())
}

/// End the current session.
///
/// # Errors
///
/// Returns a store error if the session record cannot be removed.
pub async fn logout(ctx: &Context) -> Result<()> {
    let range = ctx.range().await?;
    range.users().logout().await?;
    println!("Logged out.");
    Ok(())
}

/// Show the logged-in user with tier, global rank, and tier progress.
///
/// # Errors
///
/// Returns a usage error when nobody is logged in.
pub async fn whoami(ctx: &Context, args: &FormatArgs) -> Result<()> {
    let range = ctx.range().await?;
    let user = range.require_user().await?;
    let all = range.users().all_users().await?;
    let view = range.compute_rank_view(&user, &all);

    match args.format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "user": user,
            "rankView": view,
        })),
        OutputFormat::Human => {
            print_profile(&user, &view, all.len());
            Ok(())
        }
    }
}

fn print_profile(user: &User, view: &RankView, population: usize) {
    println!("{} <{}>", user.name, user.email);
    println!("  Role:      {}", user.role);
    println!("  Score:     {} pts", user.score);
    println!("  Tier:      {}", view.tier_title);
    match view.global_rank {
        Some(rank) => println!("  Rank:      #{rank} of {population}"),
        None => println!("  Rank:      unranked"),
    }
    println!("  Completed: {} labs", user.completed_labs.len());
    match &view.next_tier {
        Some(next) => println!(
            "  Progress:  {} {:.0}% to {} ({} pts)",
            progress_bar(view.progress_percent),
            view.progress_percent,
            next.title,
            next.min_score
        ),
        None => println!("  Progress:  {} top tier reached", progress_bar(100.0)),
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn progress_bar(percent: f64) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * PROGRESS_BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}]",
        "#".repeat(filled),
        "-".repeat(PROGRESS_BAR_WIDTH - filled)
    )
}

/// Show all users ranked by score.
///
/// # Errors
///
/// Returns a store error if users cannot be read.
pub async fn leaderboard(ctx: &Context, args: &FormatArgs) -> Result<()> {
    let range = ctx.range().await?;
    let entries = range.leaderboard().await?;
    let current = range.users().get_current_user().await?.map(|u| u.id);

    match args.format {
        OutputFormat::Json => print_json(&entries),
        OutputFormat::Human => {
            if entries.is_empty() {
                println!("No users yet. Run `cyberlabs login <email>` to join.");
                return Ok(());
            }
            println!("{:>4}  {:<24}{:>8}  Tier", "#", "Name", "Score");
            for entry in &entries {
                let marker = if Some(entry.user_id) == current { "*" } else { " " };
                println!(
                    "{:>4}{marker} {:<24}{:>8}  {}",
                    entry.rank, entry.name, entry.score, entry.rank_title
                );
            }
            Ok(())
        }
    }
}
