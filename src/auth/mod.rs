//! Credentials: password hashing, JWT issuance and Google sign-in.

pub mod google;
pub mod password;
pub mod session;
pub mod tokens;

pub use tokens::{Claims, TokenKeys, TokenPair, TokenType};
