//! Score ledger
//!
//! The only writer of a user's score and completed-lab set. Every credit
//! goes through [`ScoreLedger::award`], which holds the user's store lock
//! around its read-check-write so a final answer submitted twice in quick
//! succession is credited once, even from two processes sharing a data
//! directory.

pub mod rank;

use std::sync::Arc;

use indexmap::IndexSet;
use serde::Serialize;

use crate::content::ContentStore;
use crate::error::StoreError;
use crate::ledger::rank::RankTiers;
use crate::observability::metrics;
use crate::users::UserStore;

/// Outcome category of an award.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AwardStatus {
    /// Points were credited
    Awarded,
    /// The lab was already completed; nothing changed
    AlreadySolved,
    /// Lab or user unknown, or storage failed; nothing changed
    SystemError,
}

impl AwardStatus {
    /// Stable label for logs, metrics, and events.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Awarded => "awarded",
            Self::AlreadySolved => "already_solved",
            Self::SystemError => "system_error",
        }
    }
}

/// Result of [`ScoreLedger::award`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AwardResult {
    /// `false` only for system errors
    pub success: bool,
    /// Points credited by this call
    pub points_added: u64,
    /// Display message
    pub message: String,
    /// Outcome category
    pub status: AwardStatus,
}

impl AwardResult {
    fn awarded(points: u64) -> Self {
        Self {
            success: true,
            points_added: points,
            message: format!("Correct! +{points} points"),
            status: AwardStatus::Awarded,
        }
    }

    fn already_solved() -> Self {
        Self {
            success: true,
            points_added: 0,
            message: "Already solved!".to_string(),
            status: AwardStatus::AlreadySolved,
        }
    }

    fn system_error() -> Self {
        Self {
            success: false,
            points_added: 0,
            message: "System error".to_string(),
            status: AwardStatus::SystemError,
        }
    }
}

/// A user's scoring state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerRecord {
    /// Total points
    pub score: u64,
    /// Completed lab ids
    pub completed_labs: IndexSet<u64>,
    /// Tier title
    pub rank_title: String,
}

/// Idempotent point awarding.
#[derive(Debug)]
pub struct ScoreLedger {
    content: Arc<ContentStore>,
    users: Arc<UserStore>,
    tiers: Arc<RankTiers>,
}

impl ScoreLedger {
    /// Creates a ledger.
    #[must_use]
    pub fn new(content: Arc<ContentStore>, users: Arc<UserStore>, tiers: Arc<RankTiers>) -> Self {
        Self {
            content,
            users,
            tiers,
        }
    }

    /// Credits `lab_id` to `user_id` unless it was credited before.
    ///
    /// Never fails: storage problems surface as a `SystemError` result with
    /// no mutation.
    pub async fn award(&self, lab_id: u64, user_id: u64) -> AwardResult {
        let result = match self.try_award(lab_id, user_id).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(lab_id, user_id, error = %e, "award failed");
                AwardResult::system_error()
            }
        };

        metrics::record_award(result.status.as_str(), result.points_added);
        tracing::info!(
            lab_id,
            user_id,
            status = result.status.as_str(),
            points = result.points_added,
            "award evaluated"
        );
        result
    }

    async fn try_award(&self, lab_id: u64, user_id: u64) -> Result<AwardResult, StoreError> {
        let _held = self.users.lock(user_id).await?;
        let Some(lab) = self.content.get_lab_by_id(lab_id).await? else {
            tracing::debug!(lab_id, "award for unknown lab");
            return Ok(AwardResult::system_error());
        };
        let Some(mut user) = self.users.get(user_id).await? else {
            tracing::debug!(user_id, "award for unknown user");
            return Ok(AwardResult::system_error());
        };

        if user.has_completed(lab_id) {
            return Ok(AwardResult::already_solved());
        }

        user.completed_labs.insert(lab_id);
        user.score = user.score.saturating_add(lab.points);
        user.rank_title = self.tiers.tier_for(user.score).title.clone();
        self.users.save(&user).await?;

        Ok(AwardResult::awarded(lab.points))
    }

    /// Reads a user's scoring state.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn read(&self, user_id: u64) -> Result<Option<LedgerRecord>, StoreError> {
        Ok(self.users.get(user_id).await?.map(|u| LedgerRecord {
            score: u.score,
            completed_labs: u.completed_labs,
            rank_title: u.rank_title,
        }))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ContentLoader;
    use crate::store::{KeyValueStore, MemoryStore};

    async fn setup() -> (Arc<ScoreLedger>, Arc<UserStore>, u64) {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let tiers = Arc::new(RankTiers::default());
        let seed = ContentLoader::with_defaults().load_builtin().unwrap().pack.labs;
        let content = Arc::new(ContentStore::new(Arc::clone(&store), seed));
        let users = Arc::new(UserStore::new(Arc::clone(&store), Arc::clone(&tiers)));
        let user_id = users.login("neo@matrix.io").await.unwrap().user.id;
        let ledger = Arc::new(ScoreLedger::new(content, Arc::clone(&users), tiers));
        (ledger, users, user_id)
    }

    #[tokio::test]
    async fn award_is_idempotent() {
        let (ledger, _, user_id) = setup().await;

        let first = ledger.award(1, user_id).await;
        assert_eq!(first.status, AwardStatus::Awarded);
        assert_eq!(first.points_added, 100);
        assert_eq!(first.message, "Correct! +100 points");

        let second = ledger.award(1, user_id).await;
        assert!(second.success);
        assert_eq!(second.points_added, 0);
        assert_eq!(second.message, "Already solved!");

        let record = ledger.read(user_id).await.unwrap().unwrap();
        assert_eq!(record.score, 100);
        assert_eq!(record.completed_labs.len(), 1);
    }

    #[tokio::test]
    async fn award_recomputes_rank_title() {
        let (ledger, _, user_id) = setup().await;
        // 300 (lab 6) + 250 (lab 10) crosses the Neophyte line at 500.
        ledger.award(6, user_id).await;
        ledger.award(10, user_id).await;
        let record = ledger.read(user_id).await.unwrap().unwrap();
        assert_eq!(record.score, 550);
        assert_eq!(record.rank_title, "Neophyte");
    }

    #[tokio::test]
    async fn unknown_lab_or_user_is_a_system_error() {
        let (ledger, _, user_id) = setup().await;
        let no_lab = ledger.award(999, user_id).await;
        assert!(!no_lab.success);
        assert_eq!(no_lab.message, "System error");
        assert_eq!(no_lab.status, AwardStatus::SystemError);

        let no_user = ledger.award(1, 424_242).await;
        assert_eq!(no_user.status, AwardStatus::SystemError);

        let record = ledger.read(user_id).await.unwrap().unwrap();
        assert_eq!(record.score, 0);
        assert!(ledger.read(424_242).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_awards_credit_once() {
        let (ledger, users, user_id) = setup().await;
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                tokio::spawn(async move { ledger.award(30, user_id).await })
            })
            .collect();

        let mut awarded = 0;
        for handle in handles {
            if handle.await.unwrap().status == AwardStatus::Awarded {
                awarded += 1;
            }
        }
        assert_eq!(awarded, 1);
        assert_eq!(users.get(user_id).await.unwrap().unwrap().score, 1000);
    }
}
