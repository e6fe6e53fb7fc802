//! User accounts: input validation, password hashing, one-time secrets and
//! the HTTP handlers built on them.

pub mod handlers;
pub mod password;
pub mod secret;
pub mod validate;
