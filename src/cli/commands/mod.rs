//! CLI command dispatch and handlers
//!
//! Routes parsed CLI arguments to the appropriate command handler.

pub mod account;
pub mod admin;
pub mod labs;
pub mod play;
pub mod scenarios;
pub mod validate;
pub mod version;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::args::{
    AdminSubcommand, Cli, ColorChoice, Commands, LabsSubcommand, ScenariosSubcommand,
};
use crate::config::schema::ContentPack;
use crate::config::{ContentLoader, LoaderOptions};
use crate::error::{CyberLabsError, Result};
use crate::range::CyberRange;
use crate::store::FileStore;

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Context {
    /// Directory backing the file store
    pub data_dir: PathBuf,
    /// Content pack overriding the built-in catalog
    pub content: Option<PathBuf>,
    /// Whether the play terminal may emit ANSI control sequences
    pub color: ColorChoice,
}

impl Context {
    /// Loads the content pack selected by `--content`, or the built-in one.
    ///
    /// # Errors
    ///
    /// Returns `CyberLabsError::Config` if the pack fails to load.
    pub fn load_pack(&self) -> Result<ContentPack> {
        let loader = ContentLoader::new(LoaderOptions::default());
        let loaded = match &self.content {
            Some(path) => loader.load(path)?,
            None => loader.load_builtin()?,
        };
        for warning in &loaded.warnings {
            tracing::warn!("{warning}");
        }
        Ok(loaded.pack)
    }

    /// Opens the file store and assembles the range.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be opened or the
    /// content pack fails to load.
    pub async fn range(&self) -> Result<CyberRange> {
        let pack = self.load_pack()?;
        let store = FileStore::open(&self.data_dir).await?;
        tracing::debug!(data_dir = %self.data_dir.display(), "opened data directory");
        Ok(CyberRange::new(Arc::new(store), pack)?)
    }
}

/// Serializes `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Dispatch a parsed CLI invocation to the appropriate command handler.
///
/// # Errors
///
/// Returns an error if the dispatched command handler fails.
pub async fn dispatch(cli: Cli) -> Result<()> {
    let ctx = Context {
        data_dir: cli.data_dir,
        content: cli.content,
        color: cli.color,
    };

    match cli.command {
        Commands::Login(args) => account::login(&ctx, &args).await,
        Commands::Logout => account::logout(&ctx).await,
        Commands::Whoami(args) => account::whoami(&ctx, &args).await,
        Commands::Leaderboard(args) => account::leaderboard(&ctx, &args).await,
        Commands::Labs(cmd) => match cmd.subcommand {
            LabsSubcommand::List(args) => labs::list(&ctx, &args).await,
            LabsSubcommand::Show(args) => labs::show(&ctx, &args).await,
        },
        Commands::Play(args) => play::run(&ctx, &args).await,
        Commands::Admin(cmd) => match cmd.subcommand {
            AdminSubcommand::CreateLab(args) => admin::create_lab(&ctx, &args).await,
        },
        Commands::Scenarios(cmd) => match cmd.subcommand {
            ScenariosSubcommand::List(args) => scenarios::list(&ctx, &args).await,
            ScenariosSubcommand::Show(args) => scenarios::show(&args).await,
        },
        Commands::Validate(args) => validate::run(&args).await,
        Commands::Version(args) => {
            version::run(&args);
            Ok(())
        }
    }
}

/// Fails with a usage error unless `ok`.
pub(crate) fn ensure(ok: bool, message: impl Into<String>) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(CyberLabsError::Usage(message.into()))
    }
}
