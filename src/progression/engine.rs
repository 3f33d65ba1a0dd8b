//! Answer evaluation
//!
//! Checks a submitted answer against the current step and moves the session
//! state. Solving the last step hands off to the ledger, but only when the
//! user has not completed the lab before.

use std::sync::Arc;

use serde::Serialize;

use crate::config::schema::Lab;
use crate::error::ProgressionError;
use crate::ledger::{AwardResult, ScoreLedger};
use crate::observability::metrics;
use crate::progression::state::{Phase, ProgressionState};
use crate::users::{User, UserStore};

/// What a submission did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Answer did not match
    Incorrect,
    /// Correct; more steps follow
    CorrectIntermediate,
    /// Correct on the last step
    CorrectFinal,
}

/// Result of [`ProgressionEngine::submit_answer`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// What happened
    pub outcome: SubmitOutcome,
    /// Step the answer was evaluated against
    pub step_index: usize,
    /// Ledger result, present when an award was attempted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub award: Option<AwardResult>,
    /// User re-read after an award
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

/// Canonical form used for answer comparison: trimmed and lowercased.
#[must_use]
pub fn normalize_answer(answer: &str) -> String {
    answer.trim().to_lowercase()
}

/// Evaluates answers and triggers awards.
#[derive(Debug)]
pub struct ProgressionEngine {
    ledger: Arc<ScoreLedger>,
    users: Arc<UserStore>,
}

impl ProgressionEngine {
    /// Creates an engine.
    #[must_use]
    pub const fn new(ledger: Arc<ScoreLedger>, users: Arc<UserStore>) -> Self {
        Self { ledger, users }
    }

    /// Evaluates `input` against the current step of `lab`.
    ///
    /// Allowed from `AwaitingAnswer` and `Incorrect`; the latter is settled
    /// implicitly first.
    ///
    /// # Errors
    ///
    /// - `NoSteps` if the lab has no steps
    /// - `LabMismatch` if `state` was opened for another lab
    /// - `InvalidTransition` while feedback for a correct answer is pending
    ///   or after the lab is complete
    /// - `Store` if re-reading the user after an award fails
    pub async fn submit_answer(
        &self,
        lab: &Lab,
        state: &mut ProgressionState,
        user: &User,
        input: &str,
    ) -> Result<Submission, ProgressionError> {
        if lab.steps.is_empty() {
            return Err(ProgressionError::NoSteps(lab.id));
        }
        if state.lab_id() != lab.id {
            return Err(ProgressionError::LabMismatch {
                expected: state.lab_id(),
                actual: lab.id,
            });
        }
        if !state.accepts_answer() {
            return Err(ProgressionError::InvalidTransition(format!(
                "cannot submit an answer in state {}",
                state.describe()
            )));
        }
        if state.phase() == Phase::Incorrect {
            state.settle();
        }

        let index = state.step_index();
        let Some(step) = lab.step(index) else {
            return Err(ProgressionError::InvalidTransition(format!(
                "step {index} does not exist in lab {}",
                lab.id
            )));
        };

        let correct = normalize_answer(input) == normalize_answer(&step.answer);
        metrics::record_answer(correct);

        if !correct {
            state.record_incorrect();
            tracing::debug!(lab_id = lab.id, step = index, "incorrect answer");
            return Ok(Submission {
                outcome: SubmitOutcome::Incorrect,
                step_index: index,
                award: None,
                user: None,
            });
        }

        if !lab.is_final_step(index) {
            state.record_correct(false);
            tracing::debug!(lab_id = lab.id, step = index, "correct answer");
            return Ok(Submission {
                outcome: SubmitOutcome::CorrectIntermediate,
                step_index: index,
                award: None,
                user: None,
            });
        }

        state.record_correct(true);
        tracing::info!(lab_id = lab.id, user_id = user.id, "lab solved");

        if user.has_completed(lab.id) {
            return Ok(Submission {
                outcome: SubmitOutcome::CorrectFinal,
                step_index: index,
                award: None,
                user: None,
            });
        }

        let award = self.ledger.award(lab.id, user.id).await;
        let refreshed = self.users.get(user.id).await?;
        Ok(Submission {
            outcome: SubmitOutcome::CorrectFinal,
            step_index: index,
            award: Some(award),
            user: refreshed,
        })
    }
}
