//! Session engine
//!
//! Each user has at most one session the engine treats as theirs: the first
//! stored session with a matching user id. Logging in again reactivates that
//! row instead of inserting another. Expiry is recorded, never enforced here;
//! the request layer decides what to do with an expired session.

use chrono::Duration;

use crate::mapper::{EntityMapper, Persistable};
use crate::model::session::{DEFAULT_TTL_MINUTES, now};
use crate::model::Session;
use crate::Result;

/// Creates, finds and updates sessions through the entity mapper.
#[derive(Clone)]
pub struct SessionManager {
    mapper: EntityMapper,
    ttl: Duration,
}

impl SessionManager {
    pub fn new(mapper: EntityMapper) -> Self {
        Self::with_ttl(mapper, Duration::minutes(DEFAULT_TTL_MINUTES))
    }

    pub fn with_ttl(mapper: EntityMapper, ttl: Duration) -> Self {
        Self { mapper, ttl }
    }

    /// Start and persist a new session for `user_id`
    pub fn create(&self, user_id: &str, is_active: bool) -> Result<Session> {
        let session = Session::starting_at(user_id, is_active, now(), self.ttl);
        self.mapper.add(&session)?;
        tracing::info!(
            "created session {} for user {} (active: {})",
            session.id,
            user_id,
            is_active
        );
        Ok(session)
    }

    pub fn get_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        self.mapper.find::<Session>(session_id)
    }

    /// The user's session, marked active and saved before it is returned.
    ///
    /// This read writes. Two concurrent calls for one user may both see the
    /// session and both save it; they write the same state, last one wins.
    pub fn get_for_user(&self, user_id: &str) -> Result<Option<Session>> {
        let found = self
            .mapper
            .all::<Session>()?
            .into_iter()
            .find(|s| s.user_id == user_id);

        let Some(mut session) = found else {
            return Ok(None);
        };
        session.is_active = true;
        self.update(&session)?;
        tracing::debug!("reactivated session {} for user {}", session.id, user_id);
        Ok(Some(session))
    }

    /// Every stored session of a user, stale ones included
    pub fn sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        Ok(self
            .mapper
            .all::<Session>()?
            .into_iter()
            .filter(|s| s.user_id == user_id)
            .collect())
    }

    /// Overwrite the stored session with this state
    pub fn update(&self, session: &Session) -> Result<()> {
        self.mapper.add(session)
    }

    /// Push expiry out by one lifetime from now and record the activity
    pub fn renew(&self, session: &mut Session) -> Result<()> {
        let at = now();
        session.last_activity_at = at;
        session.expires_at = at + self.ttl;
        self.update(session)
    }

    /// Mark a session inactive. The row stays. `None` for unknown ids.
    pub fn deactivate(&self, session_id: &str) -> Result<Option<Session>> {
        let Some(mut session) = self.get_by_id(session_id)? else {
            return Ok(None);
        };
        session.is_active = false;
        self.update(&session)?;
        tracing::info!("deactivated session {}", session.id());
        Ok(Some(session))
    }
}
