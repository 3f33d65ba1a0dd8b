//! Version information display
//!
//! Prints the package name and version in human or JSON format.

use crate::cli::args::{FormatArgs, OutputFormat};

/// Print version information.
pub fn run(args: &FormatArgs) {
    let name = env!("CARGO_PKG_NAME");
    let version = env!("CARGO_PKG_VERSION");

    match args.format {
        OutputFormat::Human => {
            println!("{name} {version}");
        }
        OutputFormat::Json => {
            println!(r#"{{"name":"{name}","version":"{version}"}}"#);
        }
    }
}
