//! Structured event stream for lab sessions.
//!
//! Typed events emitted while a learner works through a lab, serialized as
//! newline-delimited JSON (JSONL) with a monotonically increasing sequence
//! number.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A discrete event emitted during a lab session.
///
/// Each variant is tagged with `"type"` when serialized to JSON.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A lab session was opened.
    LabOpened {
        /// When the session opened.
        timestamp: DateTime<Utc>,
        /// Lab identifier.
        lab_id: u64,
        /// Number of steps in the lab.
        steps: usize,
        /// Whether a scenario backs the lab's terminal.
        has_scenario: bool,
    },

    /// A command line was answered by the simulated terminal.
    CommandInterpreted {
        /// When the command was interpreted.
        timestamp: DateTime<Utc>,
        /// Lab identifier.
        lab_id: u64,
        /// First token of the command line.
        binary: String,
        /// Resolution rule (e.g. `"network_exact"`).
        source: String,
    },

    /// A step answer was evaluated.
    AnswerSubmitted {
        /// When the answer was evaluated.
        timestamp: DateTime<Utc>,
        /// Lab identifier.
        lab_id: u64,
        /// Zero-based step index.
        step_index: usize,
        /// `"correct"` or `"incorrect"`.
        outcome: String,
    },

    /// The final step of a lab was solved.
    LabCompleted {
        /// When the lab was completed.
        timestamp: DateTime<Utc>,
        /// Lab identifier.
        lab_id: u64,
        /// Learner identifier.
        user_id: u64,
        /// Points credited by this completion (0 on replay).
        points_added: u64,
        /// Award status (e.g. `"awarded"`, `"already_solved"`).
        status: String,
    },

    /// A user was created on first login.
    UserProvisioned {
        /// When the user was created.
        timestamp: DateTime<Utc>,
        /// New user identifier.
        user_id: u64,
        /// Assigned role.
        role: String,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: Event,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Each call to [`emit`](Self::emit) increments the sequence counter,
/// writes one JSON line, and flushes. Serialization and I/O failures are
/// dropped; a broken event sink never interrupts a lab session.
pub struct EventEmitter {
    writer: Mutex<BufWriter<Box<dyn Write + Send>>>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("sequence", &self.sequence.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::noop()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
            sequence: AtomicU64::new(0),
        }
    }

    /// Creates an emitter that discards all events.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits an event as a single JSONL line.
    pub fn emit(&self, event: Event) {
        let seq = self.sequence.fetch_add(1, Ordering::SeqCst);
        let envelope = EventEnvelope {
            sequence: seq,
            event,
        };

        if let Ok(mut w) = self.writer.lock() {
            if let Ok(line) = serde_json::to_string(&envelope) {
                let _ = writeln!(w, "{line}");
                let _ = w.flush();
            }
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.sequence.load(Ordering::Relaxed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex as StdMutex};

    use super::*;

    /// In-memory writer for capturing emitter output in tests.
    #[derive(Clone)]
    struct TestWriter(Arc<StdMutex<Vec<u8>>>);

    impl TestWriter {
        fn new() -> Self {
            Self(Arc::new(StdMutex::new(Vec::new())))
        }

        fn contents(&self) -> String {
            let buf = self.0.lock().unwrap();
            String::from_utf8_lossy(&buf).into_owned()
        }
    }

    impl Write for TestWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn opened() -> Event {
        Event::LabOpened {
            timestamp: DateTime::parse_from_rfc3339("2025-02-04T10:15:30Z")
                .unwrap()
                .with_timezone(&Utc),
            lab_id: 1,
            steps: 3,
            has_scenario: true,
        }
    }

    #[test]
    fn emitter_writes_tagged_jsonl() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(opened());

        let parsed: serde_json::Value = serde_json::from_str(tw.contents().trim()).unwrap();
        assert_eq!(parsed["type"], "LabOpened");
        assert_eq!(parsed["lab_id"], 1);
        assert_eq!(parsed["steps"], 3);
        assert_eq!(parsed["sequence"], 0);
        assert!(parsed.get("event").is_none());
    }

    #[test]
    fn emitter_increments_sequence() {
        let tw = TestWriter::new();
        let emitter = EventEmitter::new(Box::new(tw.clone()));
        emitter.emit(opened());
        emitter.emit(Event::LabCompleted {
            timestamp: Utc::now(),
            lab_id: 1,
            user_id: 7,
            points_added: 100,
            status: "awarded".to_owned(),
        });

        assert_eq!(emitter.event_count(), 2);
        let lines: Vec<serde_json::Value> = tw
            .contents()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines[0]["sequence"], 0);
        assert_eq!(lines[1]["sequence"], 1);
        assert_eq!(lines[1]["points_added"], 100);
    }

    #[test]
    fn noop_counts_but_discards() {
        let emitter = EventEmitter::noop();
        emitter.emit(Event::UserProvisioned {
            timestamp: Utc::now(),
            user_id: 1,
            role: "admin".to_owned(),
        });
        assert_eq!(emitter.event_count(), 1);
    }

    #[test]
    fn file_emitter_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let emitter = EventEmitter::from_file(&path).unwrap();
        emitter.emit(Event::CommandInterpreted {
            timestamp: Utc::now(),
            lab_id: 2,
            binary: "ls".to_owned(),
            source: "builtin".to_owned(),
        });
        emitter.emit(Event::AnswerSubmitted {
            timestamp: Utc::now(),
            lab_id: 2,
            step_index: 0,
            outcome: "incorrect".to_owned(),
        });
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 2);
    }
}
