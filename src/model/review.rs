use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::mapper::{Persistable, new_id};
use crate::storage::ColumnMap;
use crate::{Error, Result};

/// Publication state of a review
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewStatus {
    #[default]
    Draft,
    Published,
}

impl ReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStatus::Draft => "draft",
            ReviewStatus::Published => "published",
        }
    }
}

impl FromStr for ReviewStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "draft" => Ok(ReviewStatus::Draft),
            "published" => Ok(ReviewStatus::Published),
            _ => Err(Error::Decode {
                column: "status".to_string(),
                reason: format!("unknown review status: {}", s),
            }),
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's review of a topic.
///
/// Ratings are an ordered list of integers, stored as a JSON array in the
/// `review_ratings` column. Their range is not checked here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Review {
    pub id: String,
    pub review_text: String,
    /// Author
    pub user_id: String,
    pub topic_id: String,
    pub status: ReviewStatus,
    pub ratings: Vec<i64>,
}

impl Review {
    /// A new draft with no ratings
    pub fn new(review_text: &str, user_id: &str, topic_id: &str) -> Self {
        Self {
            id: new_id(),
            review_text: review_text.to_string(),
            user_id: user_id.to_string(),
            topic_id: topic_id.to_string(),
            status: ReviewStatus::default(),
            ratings: Vec::new(),
        }
    }

    fn ratings_json(&self) -> String {
        // a Vec<i64> always serializes
        serde_json::to_string(&self.ratings).unwrap_or_else(|_| "[]".to_string())
    }
}

impl Persistable for Review {
    const TABLE: &'static str = "review";

    fn id(&self) -> &str {
        &self.id
    }

    fn to_columns(&self) -> ColumnMap {
        ColumnMap::new()
            .with("id", self.id.clone())
            .with("review_text", self.review_text.clone())
            .with("user_id", self.user_id.clone())
            .with("topic_id", self.topic_id.clone())
            .with("status", self.status.as_str().to_string())
            .with("review_ratings", self.ratings_json())
    }

    fn from_columns(columns: &ColumnMap) -> Result<Self> {
        let ratings = match columns.optional_text("review_ratings")? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)?,
            _ => Vec::new(),
        };
        Ok(Self {
            id: columns.text("id")?,
            review_text: columns.text("review_text")?,
            user_id: columns.text("user_id")?,
            topic_id: columns.text("topic_id")?,
            status: columns.text("status")?.parse()?,
            ratings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratings_serialized_as_json_array() {
        let mut review = Review::new("this is a test", "a", "b");
        review.ratings = vec![1, 2, 3, 4];
        let cols = review.to_columns();
        assert_eq!(cols.text("review_ratings").unwrap(), "[1,2,3,4]");
        assert_eq!(cols.text("status").unwrap(), "draft");
        assert_eq!(Review::from_columns(&cols).unwrap(), review);
    }

    #[test]
    fn test_bad_status_rejected() {
        let cols = Review::new("x", "a", "b")
            .to_columns()
            .with("status", "archived".to_string());
        assert!(matches!(Review::from_columns(&cols), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_malformed_ratings_rejected() {
        let cols = Review::new("x", "a", "b")
            .to_columns()
            .with("review_ratings", "[1,".to_string());
        assert!(matches!(Review::from_columns(&cols), Err(Error::Json(_))));
    }
}
