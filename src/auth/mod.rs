//! Bearer token authentication
//!
//! Handles:
//! - Token issuing and verification (HMAC-SHA256)
//! - Current user extraction for handlers

mod middleware;
pub mod token;

pub use middleware::CurrentUser;
pub use token::{Claims, HmacIdentityProvider, IdentityProvider, Subject};
