//! Rank calculation
//!
//! Tier lookup, global ranking, progress to the next tier, and the
//! leaderboard. Everything here is pure; callers supply the user list.

use serde::Serialize;

use crate::config::schema::RankTier;
use crate::error::ConfigError;
use crate::users::User;

/// Ascending tier ladder whose first tier starts at 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankTiers {
    tiers: Vec<RankTier>,
}

impl Default for RankTiers {
    fn default() -> Self {
        Self {
            tiers: vec![
                RankTier::new("Script Kiddie", 0),
                RankTier::new("Neophyte", 500),
                RankTier::new("Apprentice", 1500),
                RankTier::new("Pentester Jr", 3000),
                RankTier::new("Cyber Operative", 5000),
                RankTier::new("White Hat", 8000),
                RankTier::new("Elite Hacker", 12000),
                RankTier::new("Red Team Lead", 20000),
            ],
        }
    }
}

impl RankTiers {
    /// Builds a ladder from a content override.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the list is empty, does not
    /// start at 0, or is not strictly ascending.
    pub fn new(tiers: Vec<RankTier>) -> Result<Self, ConfigError> {
        let invalid = |value: String, expected: &str| ConfigError::InvalidValue {
            field: "rankTiers".to_string(),
            value,
            expected: expected.to_string(),
        };

        match tiers.first() {
            None => return Err(invalid("[]".into(), "at least one tier")),
            Some(first) if first.min_score != 0 => {
                return Err(invalid(
                    first.min_score.to_string(),
                    "a first tier starting at 0",
                ));
            }
            Some(_) => {}
        }
        if let Some(pair) = tiers.windows(2).find(|p| p[1].min_score <= p[0].min_score) {
            return Err(invalid(
                format!("{} after {}", pair[1].min_score, pair[0].min_score),
                "strictly ascending minScore values",
            ));
        }
        Ok(Self { tiers })
    }

    /// All tiers in ascending order.
    #[must_use]
    pub fn tiers(&self) -> &[RankTier] {
        &self.tiers
    }

    /// The entry tier.
    #[must_use]
    pub fn first(&self) -> &RankTier {
        &self.tiers[0]
    }

    /// Returns the last tier whose `min_score ≤ score`.
    #[must_use]
    pub fn tier_for(&self, score: u64) -> &RankTier {
        let idx = self.tier_index(score);
        &self.tiers[idx]
    }

    /// Returns the tier after the one `score` is in, if any.
    #[must_use]
    pub fn next_tier(&self, score: u64) -> Option<&RankTier> {
        self.tiers.get(self.tier_index(score) + 1)
    }

    /// Percentage of the way from the current tier to the next, in `[0, 100]`.
    ///
    /// At the top tier the target is a synthetic ceiling of `1.5 × score`.
    /// A zero-width span counts as complete.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn progress_to_next_tier(&self, score: u64) -> f64 {
        let current = self.tier_for(score).min_score as f64;
        let next = self
            .next_tier(score)
            .map_or(score as f64 * 1.5, |t| t.min_score as f64);
        let span = next - current;
        if span <= 0.0 {
            return 100.0;
        }
        ((score as f64 - current) / span * 100.0).clamp(0.0, 100.0)
    }

    fn tier_index(&self, score: u64) -> usize {
        // The first tier starts at 0, so at least one tier always qualifies.
        self.tiers
            .iter()
            .rposition(|t| t.min_score <= score)
            .unwrap_or(0)
    }
}

/// 1-based position of `user_id` when `users` are sorted by descending score.
///
/// Ties keep input order. Returns `None` when the user is absent.
#[must_use]
pub fn global_rank(user_id: u64, users: &[User]) -> Option<usize> {
    let mut sorted: Vec<&User> = users.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));
    sorted.iter().position(|u| u.id == user_id).map(|i| i + 1)
}

/// One row of the leaderboard.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    /// 1-based position
    pub rank: usize,
    /// User identifier
    pub user_id: u64,
    /// Display name
    pub name: String,
    /// Total points
    pub score: u64,
    /// Stored tier title, or the computed one if missing
    pub rank_title: String,
    /// Avatar reference (empty if none)
    pub avatar_url: String,
}

/// All users, best first.
#[must_use]
pub fn leaderboard(users: &[User], tiers: &RankTiers) -> Vec<LeaderboardEntry> {
    let mut sorted: Vec<&User> = users.iter().collect();
    sorted.sort_by(|a, b| b.score.cmp(&a.score));
    sorted
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: i + 1,
            user_id: u.id,
            name: u.name.clone(),
            score: u.score,
            rank_title: if u.rank_title.is_empty() {
                tiers.tier_for(u.score).title.clone()
            } else {
                u.rank_title.clone()
            },
            avatar_url: u.avatar_url.clone().unwrap_or_default(),
        })
        .collect()
}

/// Everything a dashboard needs to show a learner's standing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RankView {
    /// Current tier title
    pub tier_title: String,
    /// 1-based global position, `None` if unranked
    pub global_rank: Option<usize>,
    /// Progress to the next tier, in `[0, 100]`
    pub progress_percent: f64,
    /// Next tier, `None` at the top
    pub next_tier: Option<RankTier>,
}

impl RankView {
    /// Computes the view for `user` among `all_users`.
    #[must_use]
    pub fn compute(user: &User, all_users: &[User], tiers: &RankTiers) -> Self {
        Self {
            tier_title: tiers.tier_for(user.score).title.clone(),
            global_rank: global_rank(user.id, all_users),
            progress_percent: tiers.progress_to_next_tier(user.score),
            next_tier: tiers.next_tier(user.score).cloned(),
        }
    }
}
