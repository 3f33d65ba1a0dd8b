//! Command resolution
//!
//! Turns one typed command line into simulated terminal output. Resolution
//! order, first match wins:
//!
//! 1. blank line: nothing happens
//! 2. builtins (`clear`, `help`, `ls`, `pwd`, `cat`), case-sensitive
//! 3. the scenario network table, exact text first, then the first key in
//!    authoring order that occurs anywhere in the command line
//! 4. a hint for recognized tools, `command not found` for the rest
//!
//! The substring step in (3) depends on table order: with keys `nmap` and
//! `nmap -sV` listed in that order, `nmap -sV host` is answered by `nmap`.
//! Content validation warns about such tables.
//!
//! Nothing here fails. Every path yields a displayable string.

use serde::Serialize;

use crate::config::schema::Scenario;
use crate::terminal::transcript::{Transcript, TranscriptDelta, TranscriptLine};

/// Builtin commands answered before the scenario is consulted.
pub const BUILTINS: [&str; 5] = ["clear", "help", "ls", "pwd", "cat"];

/// Output of `help`.
pub const HELP_TEXT: &str = "Available commands: ls, cat, pwd, whoami, id, grep, find, curl, \
                             ping, base64, nmap, ifconfig, ps, chmod, nc";

/// Output of `ls` when nothing is listed.
pub const EMPTY_DIRECTORY: &str = "(empty directory)";

/// Output of `pwd`. Constant regardless of the session directory.
pub const HOME_DIRECTORY: &str = "/home/user";

/// Tools that get a hint instead of `command not found`.
pub const KNOWN_TOOLS: [&str; 11] = [
    "grep", "find", "curl", "ping", "base64", "dirb", "nmap", "nc", "gobuster", "chmod", "ps",
];

/// Hint returned for recognized tools the scenario does not cover.
pub const KNOWN_TOOL_HINT: &str = "[Simulated Shell]: Command not recognized for this step.\n\
                                   Hint: follow the syntax from the instructions exactly.";

/// Returns `true` if `binary` is answered by a builtin.
#[must_use]
pub fn is_builtin(binary: &str) -> bool {
    BUILTINS.contains(&binary)
}

/// Which rule answered a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchSource {
    /// One of [`BUILTINS`]
    Builtin,
    /// Network table, exact command text
    NetworkExact,
    /// Network table, key contained in the command text
    NetworkSubstring,
    /// Recognized tool without a scenario entry
    KnownTool,
    /// Unknown binary
    NotFound,
}

impl MatchSource {
    /// Stable label for logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::NetworkExact => "network_exact",
            Self::NetworkSubstring => "network_substring",
            Self::KnownTool => "known_tool",
            Self::NotFound => "not_found",
        }
    }
}

/// Side effect requested by a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SideEffect {
    /// Empty the transcript
    ClearTranscript,
}

/// The answer to one command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Binary name (first token)
    pub binary: String,

    /// Trimmed command line
    pub full_command: String,

    /// Text to display, if any
    pub output: Option<String>,

    /// Requested side effect, if any
    pub effect: Option<SideEffect>,

    /// Rule that produced this resolution
    pub source: MatchSource,
}

/// Resolves a raw command line against a scenario.
///
/// Returns `None` for a blank line.
#[must_use]
pub fn resolve(scenario: &Scenario, raw: &str) -> Option<Resolution> {
    let full_command = raw.trim();
    let mut tokens = full_command.split_whitespace();
    let binary = tokens.next()?;
    let args: Vec<&str> = tokens.collect();

    let (output, effect, source) = match binary {
        "clear" => (None, Some(SideEffect::ClearTranscript), MatchSource::Builtin),
        "help" => (Some(HELP_TEXT.to_string()), None, MatchSource::Builtin),
        "ls" => (Some(list_files(scenario, &args)), None, MatchSource::Builtin),
        "pwd" => (Some(HOME_DIRECTORY.to_string()), None, MatchSource::Builtin),
        "cat" => (Some(read_file(scenario, args.first().copied())), None, MatchSource::Builtin),
        _ => {
            let (text, source) = lookup_network(scenario, binary, full_command);
            (Some(text), None, source)
        }
    };

    Some(Resolution {
        binary: binary.to_string(),
        full_command: full_command.to_string(),
        output,
        effect,
        source,
    })
}

/// Interprets a command line and applies the result to `transcript`.
///
/// Returns the applied delta together with the resolution (absent for a
/// blank line).
pub fn interpret(
    scenario: &Scenario,
    transcript: &mut Transcript,
    raw: &str,
    directory: &str,
) -> (TranscriptDelta, Option<Resolution>) {
    let Some(resolution) = resolve(scenario, raw) else {
        return (TranscriptDelta::default(), None);
    };

    let delta = if resolution.effect == Some(SideEffect::ClearTranscript) {
        TranscriptDelta {
            cleared: true,
            appended: Vec::new(),
        }
    } else {
        let mut appended = vec![TranscriptLine::input(&resolution.full_command, directory)];
        if let Some(output) = resolution.output.as_deref().filter(|o| !o.is_empty()) {
            appended.push(TranscriptLine::output(output));
        }
        TranscriptDelta {
            cleared: false,
            appended,
        }
    };

    transcript.apply(&delta);
    tracing::debug!(
        binary = %resolution.binary,
        source = resolution.source.as_str(),
        "command interpreted"
    );
    (delta, Some(resolution))
}

fn list_files(scenario: &Scenario, args: &[&str]) -> String {
    let joined = args.join(" ");
    let listing = if joined.contains("-la") || joined.contains("-al") {
        scenario
            .file_system
            .keys()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    } else {
        scenario
            .file_system
            .keys()
            .filter(|k| !k.starts_with('.'))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("  ")
    };

    if listing.is_empty() {
        EMPTY_DIRECTORY.to_string()
    } else {
        listing
    }
}

fn read_file(scenario: &Scenario, target: Option<&str>) -> String {
    let Some(target) = target else {
        return "Usage: cat <filename>".to_string();
    };

    if let Some(content) = scenario.file_system.get(target) {
        return content.clone();
    }

    // Suffix match: `cat flag.txt` finds `/tmp/flag.txt`. First key wins.
    scenario
        .file_system
        .iter()
        .find(|(path, _)| path.ends_with(target))
        .map_or_else(
            || format!("cat: {target}: No such file or directory"),
            |(_, content)| content.clone(),
        )
}

fn lookup_network(scenario: &Scenario, binary: &str, full_command: &str) -> (String, MatchSource) {
    if let Some(output) = scenario.network.get(full_command) {
        return (output.clone(), MatchSource::NetworkExact);
    }

    if let Some((_, output)) = scenario
        .network
        .iter()
        .find(|(key, _)| full_command.contains(key.as_str()))
    {
        return (output.clone(), MatchSource::NetworkSubstring);
    }

    if KNOWN_TOOLS.contains(&binary) {
        (KNOWN_TOOL_HINT.to_string(), MatchSource::KnownTool)
    } else {
        (format!("bash: {binary}: command not found"), MatchSource::NotFound)
    }
}

// ============================================================================
// Tests
// ============================================================================
