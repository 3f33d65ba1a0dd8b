//! CLI argument definitions
//!
//! All Clap derive structs for `CyberLabs` command-line parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::{Difficulty, LabType};

// ============================================================================
// Root CLI
// ============================================================================

/// Hands-on cybersecurity training range with a simulated terminal.
#[derive(Parser, Debug)]
#[command(name = "cyberlabs", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "CYBERLABS_COLOR")]
    pub color: ColorChoice,

    /// Log line format on stderr.
    #[arg(long, default_value = "human", global = true)]
    pub log_format: OutputFormat,

    /// Directory holding users, sessions, and the lab catalog.
    #[arg(
        long,
        default_value = ".cyberlabs",
        global = true,
        env = "CYBERLABS_DATA_DIR"
    )]
    pub data_dir: PathBuf,

    /// Content pack (YAML) to use instead of the built-in catalog.
    #[arg(long, global = true, env = "CYBERLABS_CONTENT")]
    pub content: Option<PathBuf>,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in by email, creating the account on first use.
    Login(LoginArgs),

    /// End the current session.
    Logout,

    /// Show the logged-in user and their standing.
    Whoami(FormatArgs),

    /// Browse the lab catalog.
    Labs(LabsCommand),

    /// Open a lab in the interactive terminal.
    Play(PlayArgs),

    /// Show all users ranked by score.
    Leaderboard(FormatArgs),

    /// Authoring commands (admin role required).
    Admin(AdminCommand),

    /// Inspect the built-in scenarios.
    Scenarios(ScenariosCommand),

    /// Validate content packs without running them.
    Validate(ValidateArgs),

    /// Display version information.
    Version(FormatArgs),
}

/// Arguments for `login`.
#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Email identity.
    pub email: String,
}

/// Shared `--format` flag.
#[derive(Args, Debug)]
pub struct FormatArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Labs Command
// ============================================================================

/// Catalog commands.
#[derive(Args, Debug)]
pub struct LabsCommand {
    /// Labs subcommand.
    #[command(subcommand)]
    pub subcommand: LabsSubcommand,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
pub enum LabsSubcommand {
    /// List labs grouped by module.
    List(LabsListArgs),

    /// Show one lab and its questions.
    Show(LabsShowArgs),
}

/// Arguments for `labs list`.
#[derive(Args, Debug)]
pub struct LabsListArgs {
    /// Only modules whose name contains this text (case-insensitive).
    #[arg(long)]
    pub module: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `labs show`.
#[derive(Args, Debug)]
pub struct LabsShowArgs {
    /// Lab id.
    pub id: u64,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Play Command
// ============================================================================

/// Arguments for `play`.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Lab id.
    pub lab_id: u64,

    /// Pause after answer feedback before moving on (e.g. `1500ms`, `0s`).
    #[arg(
        long,
        default_value = "1500ms",
        value_parser = humantime::parse_duration,
        env = "CYBERLABS_FEEDBACK_DELAY"
    )]
    pub feedback_delay: Duration,

    /// Write JSONL session events to this file.
    #[arg(long)]
    pub events_file: Option<PathBuf>,

    /// Serve Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long)]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Admin Command
// ============================================================================

/// Authoring commands.
#[derive(Args, Debug)]
pub struct AdminCommand {
    /// Admin subcommand.
    #[command(subcommand)]
    pub subcommand: AdminSubcommand,
}

/// Authoring subcommands.
#[derive(Subcommand, Debug)]
pub enum AdminSubcommand {
    /// Append a lab to the catalog (without steps).
    CreateLab(CreateLabArgs),
}

/// Arguments for `admin create-lab`.
#[derive(Args, Debug)]
pub struct CreateLabArgs {
    /// Lab title.
    #[arg(long)]
    pub title: String,

    /// Short description.
    #[arg(long, default_value = "")]
    pub description: String,

    /// Module label.
    #[arg(long, default_value = "")]
    pub module: String,

    /// Points awarded on completion.
    #[arg(long, default_value_t = 100)]
    pub points: u64,

    /// Difficulty rating.
    #[arg(long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Lab format.
    #[arg(long = "type", default_value = "walkthrough")]
    pub lab_type: LabType,

    /// Comma-separated tags.
    #[arg(long, value_delimiter = ',')]
    pub tags: Vec<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Scenarios Command
// ============================================================================

/// Scenario commands.
#[derive(Args, Debug)]
pub struct ScenariosCommand {
    /// Scenarios subcommand.
    #[command(subcommand)]
    pub subcommand: ScenariosSubcommand,
}

/// Scenario subcommands.
#[derive(Subcommand, Debug)]
pub enum ScenariosSubcommand {
    /// List scenarios and the labs they back.
    List(FormatArgs),

    /// Print the YAML of a built-in scenario.
    Show(ScenariosShowArgs),
}

/// Arguments for `scenarios show`.
#[derive(Args, Debug)]
pub struct ScenariosShowArgs {
    /// Scenario name.
    pub name: String,
}

// ============================================================================
// Validate Command
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Content files to validate (the built-in pack when omitted).
    pub files: Vec<PathBuf>,

    /// Treat ambiguous scenario tables as errors.
    #[arg(long)]
    pub strict: bool,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_help_output() {
        let err = Cli::try_parse_from(["cyberlabs", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_version_output() {
        let err = Cli::try_parse_from(["cyberlabs", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_play_defaults() {
        let cli = Cli::try_parse_from(["cyberlabs", "play", "3"]).unwrap();
        let Commands::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.lab_id, 3);
        assert_eq!(args.feedback_delay, Duration::from_millis(1500));
        assert!(args.events_file.is_none());
    }

    #[test]
    fn test_feedback_delay_parses_humantime() {
        let cli =
            Cli::try_parse_from(["cyberlabs", "play", "1", "--feedback-delay", "0s"]).unwrap();
        let Commands::Play(args) = cli.command else {
            panic!("expected play");
        };
        assert_eq!(args.feedback_delay, Duration::ZERO);

        assert!(Cli::try_parse_from(["cyberlabs", "play", "1", "--feedback-delay", "soon"]).is_err());
    }

    #[test]
    fn test_create_lab_args() {
        let cli = Cli::try_parse_from([
            "cyberlabs",
            "admin",
            "create-lab",
            "--title",
            "Buffer Overflow",
            "--type",
            "ctf",
            "--difficulty",
            "insane",
            "--tags",
            "Pwn,Stack",
        ])
        .unwrap();
        let Commands::Admin(cmd) = cli.command else {
            panic!("expected admin");
        };
        let AdminSubcommand::CreateLab(args) = cmd.subcommand;
        assert_eq!(args.lab_type, LabType::Ctf);
        assert_eq!(args.difficulty, Difficulty::Insane);
        assert_eq!(args.tags, vec!["Pwn", "Stack"]);
        assert_eq!(args.points, 100);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "cyberlabs",
            "labs",
            "list",
            "--data-dir",
            "/tmp/x",
            "-vv",
            "--color",
            "never",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/x"));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.color, ColorChoice::Never);
    }

    #[test]
    fn test_login_requires_email() {
        assert!(Cli::try_parse_from(["cyberlabs", "login"]).is_err());
    }
}
