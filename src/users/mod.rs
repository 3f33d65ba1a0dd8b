//! Learner accounts
//!
//! Login-by-email with auto-provisioning and a single current session. There
//! is no password check; identity is whatever email the learner types.

use std::sync::Arc;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use crate::error::{CyberLabsError, Result, StoreError};
use crate::ledger::rank::{RankTiers, global_rank};
use crate::store::{KeyLock, KeyValueStore, read_json, write_json};

/// Avatar image base; the user id is appended.
pub const AVATAR_BASE: &str = "https://picsum.photos/100/100?random=";

const USER_PREFIX: &str = "user:";
const SESSION_KEY: &str = "session:current";
const REGISTRY_LOCK: &str = "users";

pub(crate) fn user_key(id: u64) -> String {
    format!("{USER_PREFIX}{id}")
}

// ============================================================================
// Types
// ============================================================================

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Learner
    #[default]
    User,
    /// May author labs
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// A learner record.
///
/// `score` and `completed_labs` change only through
/// [`ScoreLedger::award`](crate::ledger::ScoreLedger::award).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Identifier, assigned in registration order
    pub id: u64,

    /// Display name
    pub name: String,

    /// Login identity
    pub email: String,

    /// Role
    #[serde(default)]
    pub role: Role,

    /// Total points
    #[serde(default)]
    pub score: u64,

    /// Completed lab ids, in completion order
    #[serde(default)]
    pub completed_labs: IndexSet<u64>,

    /// Tier title for `score`
    #[serde(default)]
    pub rank_title: String,

    /// Avatar image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// 1-based global position, computed on read and never stored
    #[serde(skip)]
    pub rank: Option<usize>,
}

impl User {
    /// Returns `true` if the user may author labs.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns `true` if `lab_id` has already been credited.
    #[must_use]
    pub fn has_completed(&self, lab_id: u64) -> bool {
        self.completed_labs.contains(&lab_id)
    }
}

/// Result of a login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    /// Opaque session token
    pub token: String,

    /// Logged-in user with a fresh global rank
    pub user: User,

    /// The user was created by this login
    #[serde(skip)]
    pub provisioned: bool,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    token: String,
    user_id: u64,
}

// ============================================================================
// Store
// ============================================================================

/// Account service over a [`KeyValueStore`].
#[derive(Debug)]
pub struct UserStore {
    store: Arc<dyn KeyValueStore>,
    tiers: Arc<RankTiers>,
}

impl UserStore {
    /// Creates a user store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>, tiers: Arc<RankTiers>) -> Self {
        Self {
            store,
            tiers,
        }
    }

    /// Logs in as `email`, creating the user on first sight.
    ///
    /// New users get the local part of the email as their name, the admin
    /// role iff the email contains `admin`, score 0, and the first tier
    /// title. Existing users missing a rank title get it back-filled.
    ///
    /// # Errors
    ///
    /// Returns `CyberLabsError::Usage` for a blank email and
    /// `CyberLabsError::Store` if storage fails.
    pub async fn login(&self, email: &str) -> Result<AuthSession> {
        let email = email.trim();
        if email.is_empty() {
            return Err(CyberLabsError::Usage("an email is required to log in".into()));
        }

        let _registry = self.store.lock(REGISTRY_LOCK).await?;
        let users = self.all_users().await?;

        let (mut user, provisioned) = if let Some(existing) =
            users.iter().find(|u| u.email == email)
        {
            (self.backfill_rank_title(existing.id).await?, false)
        } else {
            let id = users.iter().map(|u| u.id).max().unwrap_or(0) + 1;
            let user = User {
                id,
                name: email.split('@').next().unwrap_or(email).to_string(),
                email: email.to_string(),
                role: if email.contains("admin") {
                    Role::Admin
                } else {
                    Role::User
                },
                score: 0,
                completed_labs: IndexSet::new(),
                rank_title: self.tiers.first().title.clone(),
                avatar_url: Some(format!("{AVATAR_BASE}{id}")),
                rank: None,
            };
            self.save(&user).await?;
            tracing::info!(user_id = id, role = %user.role, "user provisioned");
            (user, true)
        };

        let token = uuid::Uuid::new_v4().to_string();
        write_json(
            self.store.as_ref(),
            SESSION_KEY,
            &StoredSession {
                token: token.clone(),
                user_id: user.id,
            },
        )
        .await?;

        let everyone = self.all_users().await?;
        user.rank = global_rank(user.id, &everyone);
        Ok(AuthSession {
            token,
            user,
            provisioned,
        })
    }

    /// Ends the current session. Logging out twice is harmless.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn logout(&self) -> std::result::Result<(), StoreError> {
        if self.store.remove(SESSION_KEY).await? {
            tracing::info!("logged out");
        }
        Ok(())
    }

    /// Returns the logged-in user, re-read from storage with a fresh rank.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn get_current_user(&self) -> std::result::Result<Option<User>, StoreError> {
        let Some(session) =
            read_json::<StoredSession>(self.store.as_ref(), SESSION_KEY).await?
        else {
            return Ok(None);
        };
        let users = self.all_users().await?;
        Ok(users.iter().find(|u| u.id == session.user_id).map(|u| {
            let mut user = u.clone();
            user.rank = global_rank(user.id, &users);
            user
        }))
    }

    /// Reads one user.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn get(&self, id: u64) -> std::result::Result<Option<User>, StoreError> {
        read_json(self.store.as_ref(), &user_key(id)).await
    }

    /// Returns every user in registration order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if storage fails.
    pub async fn all_users(&self) -> std::result::Result<Vec<User>, StoreError> {
        let keys = self.store.list(USER_PREFIX).await?;
        let mut users = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(user) = read_json::<User>(self.store.as_ref(), &key).await? {
                users.push(user);
            }
        }
        users.sort_by_key(|u| u.id);
        Ok(users)
    }

    /// Takes the lock that serializes read-modify-write of one user record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the backend cannot take the lock.
    pub(crate) async fn lock(&self, id: u64) -> std::result::Result<KeyLock, StoreError> {
        self.store.lock(&user_key(id)).await
    }

    // Re-reads under the user lock so a concurrent award is never overwritten.
    async fn backfill_rank_title(&self, id: u64) -> std::result::Result<User, StoreError> {
        let _held = self.lock(id).await?;
        let Some(mut user) = self.get(id).await? else {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("user {id} vanished during login"),
            )));
        };
        if user.rank_title.is_empty() {
            user.rank_title = self.tiers.tier_for(user.score).title.clone();
            self.save(&user).await?;
            tracing::debug!(user_id = id, "rank title back-filled");
        }
        Ok(user)
    }

    pub(crate) async fn save(&self, user: &User) -> std::result::Result<(), StoreError> {
        write_json(self.store.as_ref(), &user_key(user.id), user).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn users() -> UserStore {
        UserStore::new(Arc::new(MemoryStore::new()), Arc::new(RankTiers::default()))
    }

    #[tokio::test]
    async fn first_login_provisions() {
        let store = users();
        let session = store.login("neo@matrix.io").await.unwrap();
        assert!(session.provisioned);
        assert!(!session.token.is_empty());

        let user = &session.user;
        assert_eq!(user.id, 1);
        assert_eq!(user.name, "neo");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.score, 0);
        assert!(user.completed_labs.is_empty());
        assert_eq!(user.rank_title, "Script Kiddie");
        assert_eq!(user.avatar_url.as_deref(), Some("https://picsum.photos/100/100?random=1"));
        assert_eq!(user.rank, Some(1));
    }

    #[tokio::test]
    async fn second_login_reuses_the_account() {
        let store = users();
        let first = store.login("neo@matrix.io").await.unwrap();
        let second = store.login("  neo@matrix.io ").await.unwrap();
        assert!(!second.provisioned);
        assert_eq!(first.user.id, second.user.id);
        assert_ne!(first.token, second.token);
        assert_eq!(store.all_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_role_from_email() {
        let store = users();
        let session = store.login("admin@cyberlabs.io").await.unwrap();
        assert!(session.user.is_admin());
        let session = store.login("root@sysadmin.org").await.unwrap();
        assert!(session.user.is_admin());
    }

    #[tokio::test]
    async fn blank_email_is_a_usage_error() {
        let err = users().login("   ").await.unwrap_err();
        assert!(matches!(err, CyberLabsError::Usage(_)));
    }

    #[tokio::test]
    async fn current_user_and_logout() {
        let store = users();
        assert!(store.get_current_user().await.unwrap().is_none());

        store.login("trinity@matrix.io").await.unwrap();
        let current = store.get_current_user().await.unwrap().unwrap();
        assert_eq!(current.name, "trinity");
        assert_eq!(current.rank, Some(1));

        store.logout().await.unwrap();
        store.logout().await.unwrap();
        assert!(store.get_current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_rank_title_is_back_filled() {
        let store = users();
        let session = store.login("morpheus@matrix.io").await.unwrap();
        let mut user = session.user;
        user.score = 600;
        user.rank_title = String::new();
        store.save(&user).await.unwrap();

        let again = store.login("morpheus@matrix.io").await.unwrap();
        assert_eq!(again.user.rank_title, "Neophyte");
        assert_eq!(store.get(user.id).await.unwrap().unwrap().rank_title, "Neophyte");
    }

    #[tokio::test]
    async fn back_fill_waits_for_the_user_lock_and_keeps_newer_score() {
        let store = Arc::new(users());
        let mut user = store.login("trinity@matrix.io").await.unwrap().user;
        user.rank_title = String::new();
        store.save(&user).await.unwrap();

        let held = store.lock(user.id).await.unwrap();
        let login = tokio::spawn({
            let store = Arc::clone(&store);
            async move { store.login("trinity@matrix.io").await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(!login.is_finished());

        // An award lands while the login is waiting.
        user.score = 700;
        user.completed_labs.insert(3);
        store.save(&user).await.unwrap();
        drop(held);

        let session = login.await.unwrap().unwrap();
        assert_eq!(session.user.score, 700);
        assert_eq!(session.user.rank_title, "Neophyte");
        let stored = store.get(user.id).await.unwrap().unwrap();
        assert_eq!(stored.score, 700);
        assert!(stored.has_completed(3));
        assert_eq!(stored.rank_title, "Neophyte");
    }

    #[tokio::test]
    async fn users_listed_in_registration_order() {
        let store = users();
        for i in 0..12 {
            store.login(&format!("learner{i}@lab.io")).await.unwrap();
        }
        let ids: Vec<u64> = store.all_users().await.unwrap().iter().map(|u| u.id).collect();
        assert_eq!(ids, (1..=12).collect::<Vec<_>>());
    }

    #[test]
    fn rank_is_never_serialized() {
        let user = User {
            id: 1,
            name: "n".into(),
            email: "n@x".into(),
            role: Role::User,
            score: 0,
            completed_labs: IndexSet::new(),
            rank_title: "Script Kiddie".into(),
            avatar_url: None,
            rank: Some(4),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("rank").is_none());
        assert_eq!(json["rankTitle"], "Script Kiddie");
        assert_eq!(json["completedLabs"], serde_json::json!([]));
    }
}
