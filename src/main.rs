//! `CyberLabs` - Hands-on cybersecurity training range

use clap::Parser;

use cyberlabs::cli::args::{Cli, OutputFormat};
use cyberlabs::cli::commands;
use cyberlabs::error::ExitCode;
use cyberlabs::observability::{LogFormat, init_logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if !cli.quiet {
        let format = match cli.log_format {
            OutputFormat::Human => LogFormat::Human,
            OutputFormat::Json => LogFormat::Json,
        };
        init_logging(format, cli.verbose, cli.color);
    }

    // A lab session blocks on stdin; Ctrl+C leaves immediately.
    tokio::spawn(async {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nInterrupted.");
            std::process::exit(ExitCode::INTERRUPTED);
        }
    });

    let result = commands::dispatch(cli).await;

    match result {
        Ok(()) => std::process::exit(ExitCode::SUCCESS),
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(e.exit_code());
        }
    }
}
