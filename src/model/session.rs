use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};
use serde::Serialize;

use crate::mapper::{Persistable, new_id};
use crate::storage::ColumnMap;
use crate::{Error, Result};

/// Default session lifetime in minutes
pub const DEFAULT_TTL_MINUTES: i64 = 60;

/// A login session.
///
/// `expires_at` and `is_active` are advisory: nothing deletes or refuses an
/// expired session on its own. See [`Session::is_live_at`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub is_active: bool,
}

/// Current time at the precision timestamps are stored with
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

impl Session {
    /// A session starting now with the default lifetime
    pub fn new(user_id: &str, is_active: bool) -> Self {
        Self::starting_at(
            user_id,
            is_active,
            now(),
            Duration::minutes(DEFAULT_TTL_MINUTES),
        )
    }

    pub fn starting_at(
        user_id: &str,
        is_active: bool,
        created_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: user_id.to_string(),
            created_at,
            expires_at: created_at + ttl,
            last_activity_at: created_at,
            is_active,
        }
    }

    pub fn is_expired_at(&self, at: DateTime<Utc>) -> bool {
        at >= self.expires_at
    }

    /// Active and not yet expired
    pub fn is_live_at(&self, at: DateTime<Utc>) -> bool {
        self.is_active && !self.is_expired_at(at)
    }
}

fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn decode_time(columns: &ColumnMap, column: &str) -> Result<DateTime<Utc>> {
    let raw = columns.text(column)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| Error::Decode {
            column: column.to_string(),
            reason: e.to_string(),
        })
}

impl Persistable for Session {
    const TABLE: &'static str = "session";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_columns(&self) -> ColumnMap {
        ColumnMap::new()
            .with("id", self.id.clone())
            .with("user_id", self.user_id.clone())
            .with("created_at", encode_time(&self.created_at))
            .with("expires_at", encode_time(&self.expires_at))
            .with("last_activity_at", encode_time(&self.last_activity_at))
            .with("is_active", i64::from(self.is_active))
    }

    fn from_columns(columns: &ColumnMap) -> Result<Self> {
        Ok(Self {
            id: columns.text("id")?,
            user_id: columns.text("user_id")?,
            created_at: decode_time(columns, "created_at")?,
            expires_at: decode_time(columns, "expires_at")?,
            last_activity_at: decode_time(columns, "last_activity_at")?,
            is_active: columns.integer("is_active")? != 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_expiry_is_one_hour() {
        let s = Session::new("u1", true);
        assert_eq!(s.expires_at - s.created_at, Duration::hours(1));
        assert_eq!(s.last_activity_at, s.created_at);
    }

    #[test]
    fn test_columns_round_trip() {
        let s = Session::new("u1", false);
        let cols = s.to_columns();
        assert_eq!(cols.integer("is_active").unwrap(), 0);
        assert_eq!(Session::from_columns(&cols).unwrap(), s);
    }

    #[test]
    fn test_liveness() {
        let start = now();
        let s = Session::starting_at("u1", true, start, Duration::minutes(5));
        assert!(s.is_live_at(start + Duration::minutes(4)));
        assert!(!s.is_live_at(start + Duration::minutes(5)));

        let inactive = Session::starting_at("u1", false, start, Duration::minutes(5));
        assert!(!inactive.is_live_at(start));
    }

    #[test]
    fn test_bad_timestamp_rejected() {
        let cols = Session::new("u1", true)
            .to_columns()
            .with("expires_at", "yesterday".to_string());
        assert!(matches!(Session::from_columns(&cols), Err(Error::Decode { .. })));
    }
}
