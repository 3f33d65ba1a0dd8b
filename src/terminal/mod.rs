//! Simulated terminal
//!
//! The interpreter answers shell commands from a per-lab scenario and the
//! transcript records what the learner has seen.

pub mod interpreter;
pub mod transcript;

pub use interpreter::{MatchSource, Resolution, SideEffect, interpret, is_builtin, resolve};
pub use transcript::{LineKind, Transcript, TranscriptDelta, TranscriptLine};
