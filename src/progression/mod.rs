//! Lab progression
//!
//! Per-attempt state machine and the engine that evaluates answers.

pub mod engine;
pub mod state;

pub use engine::{ProgressionEngine, SubmitOutcome, Submission, normalize_answer};
pub use state::{AnswerOutcome, Phase, ProgressionState};
