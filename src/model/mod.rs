//! Domain records
//!
//! Four record kinds share one shape: an opaque string id, generated at
//! construction unless supplied, that never changes and is the primary key.
//! - `User`: account with a salted password hash
//! - `Topic`: something to review, owned by a user
//! - `Review`: a user's text and ratings against a topic
//! - `Session`: a login session with advisory expiry

pub mod review;
pub mod session;
pub mod topic;
pub mod user;

pub use review::{Review, ReviewStatus};
pub use session::Session;
pub use topic::Topic;
pub use user::User;
