//! Authentication: password hashing, signed session tokens and the gate that
//! resolves a token into the calling user before protected handlers run.

mod error;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use error::AuthError;
pub use jwt::TokenService;
pub use middleware::{CurrentUser, require_user, TOKEN_COOKIE};
