//! Authentication: credential hashing, the session engine and the account flow

pub mod account;
pub mod credential;
pub mod session;

pub use account::Accounts;
pub use credential::{CredentialService, PasswordHash};
pub use session::SessionManager;
