//! Session progression state
//!
//! Ephemeral per-lab-attempt state. Opening a lab (or replaying it) starts
//! over at step 0; within one attempt the step index only moves forward.
//!
//! ```text
//! AwaitingAnswer(i) --wrong--> Incorrect(i) --settle--> AwaitingAnswer(i)
//! AwaitingAnswer(i) --right, not last--> CorrectIntermediate(i) --settle--> AwaitingAnswer(i+1)
//! AwaitingAnswer(i) --right, last--> CorrectFinal --replay--> AwaitingAnswer(0)
//! ```

use serde::Serialize;

use crate::error::ProgressionError;

/// Where the attempt stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for an answer to the current step
    AwaitingAnswer,
    /// Current step answered correctly; more steps follow
    CorrectIntermediate,
    /// Current step answered wrongly
    Incorrect,
    /// Last step answered correctly
    CorrectFinal,
}

/// Result of the most recent evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerOutcome {
    /// Nothing evaluated yet on this step
    #[default]
    Unevaluated,
    /// Last answer matched
    Correct,
    /// Last answer did not match
    Incorrect,
}

/// Progress through one lab attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressionState {
    lab_id: u64,
    step_index: usize,
    phase: Phase,
    last_outcome: AnswerOutcome,
}

impl ProgressionState {
    /// Fresh state at step 0.
    #[must_use]
    pub const fn new(lab_id: u64) -> Self {
        Self {
            lab_id,
            step_index: 0,
            phase: Phase::AwaitingAnswer,
            last_outcome: AnswerOutcome::Unevaluated,
        }
    }

    /// Lab this attempt belongs to.
    #[must_use]
    pub const fn lab_id(&self) -> u64 {
        self.lab_id
    }

    /// Current step index.
    #[must_use]
    pub const fn step_index(&self) -> usize {
        self.step_index
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Result of the latest evaluation.
    #[must_use]
    pub const fn last_outcome(&self) -> AnswerOutcome {
        self.last_outcome
    }

    /// Returns `true` once the last step has been solved.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == Phase::CorrectFinal
    }

    /// Returns `true` if an answer may be submitted now.
    #[must_use]
    pub fn accepts_answer(&self) -> bool {
        matches!(self.phase, Phase::AwaitingAnswer | Phase::Incorrect)
    }

    /// Completes the delayed transition after feedback was shown.
    ///
    /// `Incorrect(i)` returns to `AwaitingAnswer(i)` and
    /// `CorrectIntermediate(i)` advances to `AwaitingAnswer(i+1)`. Other
    /// phases are left alone. Returns `true` if anything changed.
    pub fn settle(&mut self) -> bool {
        match self.phase {
            Phase::Incorrect => {
                self.phase = Phase::AwaitingAnswer;
                self.last_outcome = AnswerOutcome::Unevaluated;
                true
            }
            Phase::CorrectIntermediate => {
                self.step_index += 1;
                self.phase = Phase::AwaitingAnswer;
                self.last_outcome = AnswerOutcome::Unevaluated;
                tracing::debug!(
                    lab_id = self.lab_id,
                    step = self.step_index,
                    "advanced to next step"
                );
                true
            }
            Phase::AwaitingAnswer | Phase::CorrectFinal => false,
        }
    }

    /// Starts the lab over after completion.
    ///
    /// # Errors
    ///
    /// Returns `ProgressionError::InvalidTransition` unless the lab is
    /// complete.
    pub fn replay(&mut self) -> Result<(), ProgressionError> {
        if self.phase != Phase::CorrectFinal {
            return Err(ProgressionError::InvalidTransition(format!(
                "replay is only possible after the final step (current: {})",
                self.describe()
            )));
        }
        *self = Self::new(self.lab_id);
        tracing::debug!(lab_id = self.lab_id, "lab replay");
        Ok(())
    }

    pub(crate) fn record_incorrect(&mut self) {
        self.phase = Phase::Incorrect;
        self.last_outcome = AnswerOutcome::Incorrect;
    }

    pub(crate) fn record_correct(&mut self, is_final: bool) {
        self.phase = if is_final {
            Phase::CorrectFinal
        } else {
            Phase::CorrectIntermediate
        };
        self.last_outcome = AnswerOutcome::Correct;
    }

    /// Phase with its step, e.g. `AwaitingAnswer(2)`.
    #[must_use]
    pub fn describe(&self) -> String {
        match self.phase {
            Phase::CorrectFinal => "CorrectFinal".to_string(),
            other => format!("{other:?}({})", self.step_index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_awaiting_step_zero() {
        let state = ProgressionState::new(4);
        assert_eq!(state.lab_id(), 4);
        assert_eq!(state.step_index(), 0);
        assert_eq!(state.phase(), Phase::AwaitingAnswer);
        assert_eq!(state.last_outcome(), AnswerOutcome::Unevaluated);
        assert!(state.accepts_answer());
        assert_eq!(state.describe(), "AwaitingAnswer(0)");
    }

    #[test]
    fn settle_after_incorrect_keeps_step() {
        let mut state = ProgressionState::new(1);
        state.record_incorrect();
        assert!(state.accepts_answer());
        assert!(state.settle());
        assert_eq!(state.step_index(), 0);
        assert_eq!(state.phase(), Phase::AwaitingAnswer);
        assert!(!state.settle());
    }

    #[test]
    fn settle_after_intermediate_advances() {
        let mut state = ProgressionState::new(1);
        state.record_correct(false);
        assert!(!state.accepts_answer());
        assert!(state.settle());
        assert_eq!(state.step_index(), 1);
        assert_eq!(state.last_outcome(), AnswerOutcome::Unevaluated);
    }

    #[test]
    fn replay_only_from_final() {
        let mut state = ProgressionState::new(1);
        assert!(matches!(
            state.replay(),
            Err(ProgressionError::InvalidTransition(_))
        ));

        state.record_correct(false);
        state.settle();
        state.record_correct(true);
        assert!(state.is_complete());
        assert!(!state.settle());
        assert_eq!(state.describe(), "CorrectFinal");

        state.replay().unwrap();
        assert_eq!(state, ProgressionState::new(1));
    }
}
