//! Training range
//!
//! Composition root. Wires the catalog, accounts, ledger, scenarios, and
//! progression engine over one [`KeyValueStore`] and exposes the operations
//! a front end needs: open a lab, type commands, submit answers, and show
//! standings.

use std::sync::Arc;

use chrono::Utc;

use crate::config::schema::{ContentPack, Lab, Scenario};
use crate::config::{ContentLoader, LoaderOptions};
use crate::content::ContentStore;
use crate::error::{ConfigError, CyberLabsError, Result};
use crate::ledger::rank::{LeaderboardEntry, RankTiers, RankView, leaderboard};
use crate::ledger::{AwardResult, ScoreLedger};
use crate::observability::events::{Event, EventEmitter};
use crate::observability::metrics;
use crate::progression::{ProgressionEngine, ProgressionState, Submission, SubmitOutcome};
use crate::scenarios::ScenarioRegistry;
use crate::store::KeyValueStore;
use crate::terminal::{Transcript, TranscriptDelta, interpret};
use crate::users::{AuthSession, User, UserStore};

/// Working directory shown for typed commands.
pub const DEFAULT_DIRECTORY: &str = "~";

/// One open lab: the lab, its terminal, and the attempt state.
///
/// Dropping the session ends the attempt; progress within a lab is not
/// resumable.
#[derive(Debug)]
pub struct LabSession {
    /// The lab being played
    pub lab: Lab,
    /// Knowledge base answering terminal commands
    pub scenario: Arc<Scenario>,
    /// Progression through the steps
    pub state: ProgressionState,
    /// Terminal transcript
    pub transcript: Transcript,
    /// Directory recorded with typed commands
    pub directory: String,
}

impl Drop for LabSession {
    fn drop(&mut self) {
        metrics::record_lab_closed();
    }
}

/// The assembled training range.
#[derive(Debug)]
pub struct CyberRange {
    content: Arc<ContentStore>,
    users: Arc<UserStore>,
    ledger: Arc<ScoreLedger>,
    engine: ProgressionEngine,
    scenarios: ScenarioRegistry,
    tiers: Arc<RankTiers>,
    events: Arc<EventEmitter>,
}

impl CyberRange {
    /// Assembles a range from a loaded content pack.
    ///
    /// A pack without scenarios uses the built-in ones; a pack without rank
    /// tiers uses the default ladder.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the tier override is malformed or the
    /// built-in scenarios fail to parse.
    pub fn new(store: Arc<dyn KeyValueStore>, pack: ContentPack) -> std::result::Result<Self, ConfigError> {
        let tiers = Arc::new(match pack.rank_tiers {
            Some(tiers) => RankTiers::new(tiers)?,
            None => RankTiers::default(),
        });
        let scenarios = if pack.scenarios.is_empty() {
            ScenarioRegistry::builtin()?
        } else {
            ScenarioRegistry::from_definitions(&pack.scenarios)
        };

        let content = Arc::new(ContentStore::new(Arc::clone(&store), pack.labs));
        let users = Arc::new(UserStore::new(store, Arc::clone(&tiers)));
        let ledger = Arc::new(ScoreLedger::new(
            Arc::clone(&content),
            Arc::clone(&users),
            Arc::clone(&tiers),
        ));
        let engine = ProgressionEngine::new(Arc::clone(&ledger), Arc::clone(&users));

        Ok(Self {
            content,
            users,
            ledger,
            engine,
            scenarios,
            tiers,
            events: Arc::new(EventEmitter::noop()),
        })
    }

    /// Assembles a range from the embedded catalog and scenarios.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the embedded content is invalid.
    pub fn builtin(store: Arc<dyn KeyValueStore>) -> std::result::Result<Self, ConfigError> {
        let loaded = ContentLoader::new(LoaderOptions::default()).load_builtin()?;
        Self::new(store, loaded.pack)
    }

    /// Sends structured events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// Lab catalog.
    #[must_use]
    pub fn content(&self) -> &ContentStore {
        &self.content
    }

    /// Accounts.
    #[must_use]
    pub fn users(&self) -> &UserStore {
        &self.users
    }

    /// Scenario registry.
    #[must_use]
    pub const fn scenarios(&self) -> &ScenarioRegistry {
        &self.scenarios
    }

    /// Rank ladder.
    #[must_use]
    pub fn tiers(&self) -> &RankTiers {
        &self.tiers
    }

    // ========================================================================
    // Accounts
    // ========================================================================

    /// Logs in, provisioning the user on first sight.
    ///
    /// # Errors
    ///
    /// See [`UserStore::login`].
    pub async fn login(&self, email: &str) -> Result<AuthSession> {
        let session = self.users.login(email).await?;
        if session.provisioned {
            self.events.emit(Event::UserProvisioned {
                timestamp: Utc::now(),
                user_id: session.user.id,
                role: session.user.role.to_string(),
            });
        }
        Ok(session)
    }

    /// Returns the logged-in user or a usage error.
    ///
    /// # Errors
    ///
    /// Returns `CyberLabsError::Usage` when nobody is logged in.
    pub async fn require_user(&self) -> Result<User> {
        self.users
            .get_current_user()
            .await?
            .ok_or_else(|| CyberLabsError::Usage("not logged in; run `cyberlabs login <email>`".into()))
    }

    // ========================================================================
    // Lab sessions
    // ========================================================================

    /// Opens `lab_id` at step 0 with a freshly booted terminal.
    ///
    /// # Errors
    ///
    /// Returns `CyberLabsError::LabNotFound` for an unknown id.
    pub async fn open_lab(&self, lab_id: u64) -> Result<LabSession> {
        let lab = self
            .content
            .get_lab_by_id(lab_id)
            .await?
            .ok_or(CyberLabsError::LabNotFound(lab_id))?;

        let has_scenario = self.scenarios.has_scenario(lab_id);
        metrics::record_lab_opened();
        self.events.emit(Event::LabOpened {
            timestamp: Utc::now(),
            lab_id,
            steps: lab.steps.len(),
            has_scenario,
        });
        tracing::info!(lab_id, steps = lab.steps.len(), has_scenario, "lab opened");

        Ok(LabSession {
            scenario: self.scenarios.scenario_for(lab_id),
            state: ProgressionState::new(lab_id),
            transcript: Transcript::booted(),
            directory: DEFAULT_DIRECTORY.to_string(),
            lab,
        })
    }

    /// Runs one command line in the session's terminal.
    pub fn interpret_command(&self, session: &mut LabSession, line: &str) -> TranscriptDelta {
        let (delta, resolution) = interpret(
            &session.scenario,
            &mut session.transcript,
            line,
            &session.directory,
        );
        if let Some(resolution) = resolution {
            metrics::record_command(&resolution.binary, resolution.source);
            self.events.emit(Event::CommandInterpreted {
                timestamp: Utc::now(),
                lab_id: session.lab.id,
                binary: resolution.binary,
                source: resolution.source.as_str().to_string(),
            });
        }
        delta
    }

    /// Submits an answer for the session's current step.
    ///
    /// # Errors
    ///
    /// See [`ProgressionEngine::submit_answer`].
    pub async fn submit_step_answer(
        &self,
        session: &mut LabSession,
        user: &User,
        input: &str,
    ) -> Result<Submission> {
        let submission = self
            .engine
            .submit_answer(&session.lab, &mut session.state, user, input)
            .await?;

        let outcome = if submission.outcome == SubmitOutcome::Incorrect {
            "incorrect"
        } else {
            "correct"
        };
        self.events.emit(Event::AnswerSubmitted {
            timestamp: Utc::now(),
            lab_id: session.lab.id,
            step_index: submission.step_index,
            outcome: outcome.to_string(),
        });

        if submission.outcome == SubmitOutcome::CorrectFinal {
            let (points_added, status) = submission.award.as_ref().map_or(
                (0, "already_solved"),
                |a| (a.points_added, a.status.as_str()),
            );
            self.events.emit(Event::LabCompleted {
                timestamp: Utc::now(),
                lab_id: session.lab.id,
                user_id: user.id,
                points_added,
                status: status.to_string(),
            });
        }
        Ok(submission)
    }

    /// Credits a lab directly, bypassing step evaluation.
    pub async fn award_if_eligible(&self, lab_id: u64, user_id: u64) -> AwardResult {
        self.ledger.award(lab_id, user_id).await
    }

    // ========================================================================
    // Standings
    // ========================================================================

    /// Computes tier, global rank, and tier progress for `user`.
    #[must_use]
    pub fn compute_rank_view(&self, user: &User, all_users: &[User]) -> RankView {
        RankView::compute(user, all_users, &self.tiers)
    }

    /// All users, best first.
    ///
    /// # Errors
    ///
    /// Returns `CyberLabsError::Store` if storage fails.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>> {
        let users = self.users.all_users().await?;
        Ok(leaderboard(&users, &self.tiers))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::LabDraft;
    use crate::ledger::AwardStatus;
    use crate::store::MemoryStore;
    use crate::terminal::LineKind;

    fn range() -> CyberRange {
        CyberRange::builtin(Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn open_lab_boots_terminal() {
        let range = range();
        let session = range.open_lab(1).await.unwrap();
        assert_eq!(session.lab.id, 1);
        assert_eq!(session.transcript.len(), 3);
        assert_eq!(session.state.step_index(), 0);
        assert!(session.scenario.file_system.contains_key("notes.txt"));

        assert!(matches!(
            range.open_lab(404).await,
            Err(CyberLabsError::LabNotFound(404))
        ));
    }

    #[tokio::test]
    async fn terminal_answers_from_lab_scenario() {
        let range = range();
        let mut session = range.open_lab(2).await.unwrap();
        range.interpret_command(&mut session, "ls -la");
        let last = session.transcript.lines().last().unwrap();
        assert_eq!(last.kind, LineKind::Output);
        assert!(last.content.contains(".hidden_conf"));

        let delta = range.interpret_command(&mut session, "clear");
        assert!(delta.cleared);
        assert!(session.transcript.is_empty());
    }

    #[tokio::test]
    async fn full_lab_one_playthrough() {
        let range = range();
        let user = range.login("neo@matrix.io").await.unwrap().user;
        let mut session = range.open_lab(1).await.unwrap();

        for answer in ["user", "notes.txt"] {
            let sub = range.submit_step_answer(&mut session, &user, answer).await.unwrap();
            assert_eq!(sub.outcome, SubmitOutcome::CorrectIntermediate);
            session.state.settle();
        }
        let last = range
            .submit_step_answer(&mut session, &user, "Essential.")
            .await
            .unwrap();
        assert_eq!(last.outcome, SubmitOutcome::CorrectFinal);
        assert_eq!(last.award.unwrap().points_added, 100);

        let again = range.award_if_eligible(1, user.id).await;
        assert_eq!(again.status, AwardStatus::AlreadySolved);

        let me = range.require_user().await.unwrap();
        let view = range.compute_rank_view(&me, &range.users().all_users().await.unwrap());
        assert_eq!(view.tier_title, "Script Kiddie");
        assert_eq!(view.global_rank, Some(1));
        assert!((view.progress_percent - 20.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn authored_lab_cannot_be_played() {
        let range = range();
        let user = range.login("admin@cyberlabs.io").await.unwrap().user;
        let lab = range
            .content()
            .create_lab(LabDraft {
                title: "Draft".into(),
                ..LabDraft::default()
            })
            .await
            .unwrap();
        let mut session = range.open_lab(lab.id).await.unwrap();
        assert!(session.scenario.is_empty());
        let err = range
            .submit_step_answer(&mut session, &user, "anything")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), format!("lab {} has no steps", lab.id));
    }

    #[tokio::test]
    async fn require_user_without_login() {
        assert!(matches!(
            range().require_user().await,
            Err(CyberLabsError::Usage(_))
        ));
    }

    #[tokio::test]
    async fn leaderboard_orders_users() {
        let range = range();
        let a = range.login("a@lab.io").await.unwrap().user;
        let b = range.login("b@lab.io").await.unwrap().user;
        range.award_if_eligible(30, b.id).await;
        range.award_if_eligible(1, a.id).await;
        let board = range.leaderboard().await.unwrap();
        assert_eq!(board[0].user_id, b.id);
        assert_eq!(board[0].score, 1000);
        assert_eq!(board[0].rank_title, "Neophyte");
        assert_eq!(board[1].rank, 2);
    }

    #[test]
    fn tier_override_is_validated() {
        let pack = ContentPack {
            rank_tiers: Some(vec![crate::config::RankTier::new("Late", 5)]),
            ..ContentPack::default()
        };
        assert!(CyberRange::new(Arc::new(MemoryStore::new()), pack).is_err());
    }
}
