//! Authentication: password hashing, bearer tokens, and the request gates
//! built on them.
//!
//! - [`password`] hashes and verifies with bcrypt on the blocking pool.
//! - [`token`] issues and verifies HS256 compact tokens.
//! - [`middleware`] rejects unauthenticated or pending callers and
//!   limits writes to admins.

pub mod middleware;
pub mod password;
pub mod token;

pub use middleware::{AdminUser, AuthUser, require_auth, restrict_writes_to_admins};
pub use token::{Claims, TokenError, TokenSigner};
