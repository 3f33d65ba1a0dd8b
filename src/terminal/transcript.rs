//! Terminal transcript
//!
//! Append-only log of what the simulated terminal has shown. Only the
//! `clear` builtin empties it.

use serde::Serialize;

/// Lines shown when a lab session starts.
pub const BOOT_BANNER: [&str; 3] = [
    "Starting CyberLabs Kali Linux instance...",
    "Connected to VPN interface tun0",
    "Type \"help\" to see the available commands.",
];

/// Kind of transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineKind {
    /// Command typed by the learner
    Input,
    /// Simulated command output
    Output,
    /// Session banner and notices
    System,
}

/// One line of the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    /// Line kind
    pub kind: LineKind,

    /// Text content (may span several physical lines)
    pub content: String,

    /// Working directory at entry time (input lines only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directory: Option<String>,
}

impl TranscriptLine {
    /// Creates an input line recorded in `directory`.
    #[must_use]
    pub fn input(content: impl Into<String>, directory: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Input,
            content: content.into(),
            directory: Some(directory.into()),
        }
    }

    /// Creates an output line.
    #[must_use]
    pub fn output(content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::Output,
            content: content.into(),
            directory: None,
        }
    }

    /// Creates a system line.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            kind: LineKind::System,
            content: content.into(),
            directory: None,
        }
    }
}

/// Change produced by one interpreted command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptDelta {
    /// The transcript was emptied before `appended` was added.
    pub cleared: bool,

    /// Lines appended to the transcript
    pub appended: Vec<TranscriptLine>,
}

impl TranscriptDelta {
    /// Returns `true` if the delta changes nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        !self.cleared && self.appended.is_empty()
    }
}

/// Ordered terminal log for one open lab session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<TranscriptLine>,
}

impl Transcript {
    /// Creates an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transcript holding the boot banner.
    #[must_use]
    pub fn booted() -> Self {
        Self {
            lines: BOOT_BANNER.iter().map(|l| TranscriptLine::system(*l)).collect(),
        }
    }

    /// Returns all lines in order.
    #[must_use]
    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Number of lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the transcript has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Appends a single line.
    pub fn push(&mut self, line: TranscriptLine) {
        self.lines.push(line);
    }

    /// Applies a delta produced by the interpreter.
    pub fn apply(&mut self, delta: &TranscriptDelta) {
        if delta.cleared {
            self.lines.clear();
        }
        self.lines.extend(delta.appended.iter().cloned());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn booted_transcript_has_banner() {
        let transcript = Transcript::booted();
        assert_eq!(transcript.len(), 3);
        assert!(transcript.lines().iter().all(|l| l.kind == LineKind::System));
        assert!(transcript.lines()[2].content.contains("help"));
    }

    #[test]
    fn apply_clear_then_append() {
        let mut transcript = Transcript::booted();
        transcript.apply(&TranscriptDelta {
            cleared: true,
            appended: vec![TranscriptLine::output("fresh")],
        });
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript.lines()[0].content, "fresh");
    }

    #[test]
    fn noop_delta() {
        assert!(TranscriptDelta::default().is_noop());
        let mut transcript = Transcript::new();
        transcript.apply(&TranscriptDelta::default());
        assert!(transcript.is_empty());
    }

    #[test]
    fn input_line_serializes_directory() {
        let json = serde_json::to_value(TranscriptLine::input("ls", "~")).unwrap();
        assert_eq!(json["kind"], "input");
        assert_eq!(json["directory"], "~");
        let json = serde_json::to_value(TranscriptLine::output("x")).unwrap();
        assert!(json.get("directory").is_none());
    }
}
