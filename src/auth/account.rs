//! Account flow: registration, login, logout and the per-request session check
//!
//! Request handlers call these; they combine the credential service, the
//! session engine and the entity mapper.

use std::collections::{HashMap, HashSet};

use super::credential::CredentialService;
use super::session::SessionManager;
use crate::mapper::EntityMapper;
use crate::model::session::now;
use crate::model::{Review, Session, Topic, User};
use crate::{Error, Result};

pub struct Accounts {
    mapper: EntityMapper,
    sessions: SessionManager,
    credentials: CredentialService,
}

impl Accounts {
    pub fn new(
        mapper: EntityMapper,
        sessions: SessionManager,
        credentials: CredentialService,
    ) -> Self {
        Self {
            mapper,
            sessions,
            credentials,
        }
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn mapper(&self) -> &EntityMapper {
        &self.mapper
    }

    /// Create a user and an inactive session for them.
    /// A taken username or email surfaces as a rejected save.
    pub fn register(&self, username: &str, email: &str, password: &str) -> Result<User> {
        let user = User::new(username, email, self.credentials.hash(password, None));
        self.mapper.add(&user)?;
        self.sessions.create(&user.id, false)?;
        tracing::info!("registered user {} ({})", user.username, user.id);
        Ok(user)
    }

    pub fn find_user(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .mapper
            .all::<User>()?
            .into_iter()
            .find(|u| u.username == username))
    }

    /// Check credentials and hand back the user's active session.
    ///
    /// An existing session is reactivated; a new one is created only when the
    /// user has none. `None` for an unknown user or a wrong password.
    pub fn login(&self, username: &str, password: &str) -> Result<Option<Session>> {
        let Some(user) = self.find_user(username)? else {
            tracing::warn!("login failed: unknown user {}", username);
            return Ok(None);
        };
        if !self.credentials.verify(&user.hashed_password, password) {
            tracing::warn!("login failed: bad password for {}", username);
            return Ok(None);
        }

        let session = match self.sessions.get_for_user(&user.id)? {
            Some(existing) => existing,
            None => self.sessions.create(&user.id, true)?,
        };
        tracing::info!("user {} logged in with session {}", username, session.id);
        Ok(Some(session))
    }

    /// Deactivate a session. Returns false if no such session exists.
    pub fn logout(&self, session_id: &str) -> Result<bool> {
        Ok(self.sessions.deactivate(session_id)?.is_some())
    }

    /// The session behind a request, if it is active and unexpired.
    /// A live session has its expiry pushed out.
    pub fn authenticate(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(mut session) = self.sessions.get_by_id(session_id)? else {
            return Ok(None);
        };
        if !session.is_live_at(now()) {
            tracing::debug!("session {} is inactive or expired", session.id);
            return Ok(None);
        }
        self.sessions.renew(&mut session)?;
        Ok(Some(session))
    }

    /// Reviews whose author's username or whose topic's name contains `query`.
    /// Each matching review appears once, in storage order.
    pub fn search_reviews(&self, query: &str) -> Result<Vec<Review>> {
        if query.is_empty() {
            return Err(Error::InvalidQuery("query cannot be empty".to_string()));
        }

        let authors: HashMap<String, String> = self
            .mapper
            .all::<User>()?
            .into_iter()
            .map(|u| (u.id, u.username))
            .collect();
        let topics: HashMap<String, String> = self
            .mapper
            .all::<Topic>()?
            .into_iter()
            .map(|t| (t.id, t.name))
            .collect();

        let mut seen = HashSet::new();
        Ok(self
            .mapper
            .all::<Review>()?
            .into_iter()
            .filter(|r| {
                let by_author = authors.get(&r.user_id).is_some_and(|n| n.contains(query));
                let by_topic = topics.get(&r.topic_id).is_some_and(|n| n.contains(query));
                by_author || by_topic
            })
            .filter(|r| seen.insert(r.id.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;
    use chrono::Duration;
    use std::sync::Arc;

    fn accounts() -> Accounts {
        accounts_with_ttl(Duration::hours(1))
    }

    fn accounts_with_ttl(ttl: Duration) -> Accounts {
        let mapper = EntityMapper::new(Arc::new(SqliteStore::open_in_memory().unwrap()));
        let sessions = SessionManager::with_ttl(mapper.clone(), ttl);
        Accounts::new(mapper, sessions, CredentialService::with_rounds(1_000))
    }

    #[test]
    fn test_register_creates_inactive_session() {
        let acc = accounts();
        let user = acc.register("test_user", "test_user@example.com", "pw").unwrap();
        let sessions = acc.sessions().sessions_for_user(&user.id).unwrap();
        assert_eq!(sessions.len(), 1);
        assert!(!sessions[0].is_active);
    }

    #[test]
    fn test_register_duplicate_username() {
        let acc = accounts();
        acc.register("test_user", "a@example.com", "pw").unwrap();
        let err = acc.register("test_user", "b@example.com", "pw").unwrap_err();
        assert!(err.is_constraint_violation());
    }

    #[test]
    fn test_login_reuses_registration_session() {
        let acc = accounts();
        let user = acc.register("test_user", "a@example.com", "pw").unwrap();
        let registered = acc.sessions().sessions_for_user(&user.id).unwrap();

        let session = acc.login("test_user", "pw").unwrap().unwrap();
        assert!(session.is_active);
        assert_eq!(session.id, registered[0].id);

        let again = acc.login("test_user", "pw").unwrap().unwrap();
        assert_eq!(again.id, session.id);
        assert_eq!(acc.sessions().sessions_for_user(&user.id).unwrap().len(), 1);
    }

    #[test]
    fn test_login_creates_session_when_none() {
        let acc = accounts();
        let user = acc.register("test_user", "a@example.com", "pw").unwrap();
        for s in acc.sessions().sessions_for_user(&user.id).unwrap() {
            acc.mapper().remove(&s).unwrap();
        }
        let session = acc.login("test_user", "pw").unwrap().unwrap();
        assert!(session.is_active);
        assert_eq!(session.user_id, user.id);
    }

    #[test]
    fn test_login_rejects_bad_credentials() {
        let acc = accounts();
        acc.register("test_user", "a@example.com", "pw").unwrap();
        assert_eq!(acc.login("test_user", "wrong").unwrap(), None);
        assert_eq!(acc.login("nobody", "pw").unwrap(), None);
    }

    #[test]
    fn test_logout_then_authenticate() {
        let acc = accounts();
        acc.register("test_user", "a@example.com", "pw").unwrap();
        let session = acc.login("test_user", "pw").unwrap().unwrap();
        assert!(acc.authenticate(&session.id).unwrap().is_some());

        assert!(acc.logout(&session.id).unwrap());
        let stored = acc.sessions().get_by_id(&session.id).unwrap().unwrap();
        assert!(!stored.is_active);
        assert_eq!(acc.authenticate(&session.id).unwrap(), None);
        assert!(!acc.logout("nope").unwrap());
    }

    #[test]
    fn test_expired_session_not_authenticated() {
        let acc = accounts_with_ttl(Duration::zero());
        acc.register("test_user", "a@example.com", "pw").unwrap();
        let session = acc.login("test_user", "pw").unwrap().unwrap();
        assert!(session.is_active);
        assert_eq!(acc.authenticate(&session.id).unwrap(), None);
    }

    #[test]
    fn test_search_reviews() {
        let acc = accounts();
        let alice = acc.register("alice", "alice@example.com", "pw").unwrap();
        let bob = acc.register("bob", "bob@example.com", "pw").unwrap();
        let stocks = Topic::new("Stocks", "going up", &alice.id);
        let bonds = Topic::new("Bonds", "flat", &bob.id);
        acc.mapper().add(&stocks).unwrap();
        acc.mapper().add(&bonds).unwrap();
        let r1 = Review::new("buy", &alice.id, &stocks.id);
        let r2 = Review::new("hold", &bob.id, &stocks.id);
        let r3 = Review::new("sell", &bob.id, &bonds.id);
        for r in [&r1, &r2, &r3] {
            acc.mapper().add(r).unwrap();
        }

        let by_user: Vec<String> = acc
            .search_reviews("alice")
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(by_user, vec![r1.id.clone()]);

        let by_topic = acc.search_reviews("Stock").unwrap();
        assert_eq!(by_topic.len(), 2);

        // "o" matches bob, Stocks and Bonds; r2 and r3 match twice but appear once
        let both = acc.search_reviews("o").unwrap();
        assert_eq!(both.len(), 3);

        assert!(acc.search_reviews("zzz").unwrap().is_empty());
        assert!(matches!(acc.search_reviews(""), Err(Error::InvalidQuery(_))));
    }
}
