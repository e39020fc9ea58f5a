//! Authentication module
//!
//! Provides JWT-based authentication with argon2 password hashing, the
//! request gatekeeper middleware, and startup admin provisioning.

mod bootstrap;
mod jwt;
mod middleware;
mod password;

pub use bootstrap::{bootstrap_admin, BootstrapOutcome, ADMIN_PASSWORD_MIN_LEN, DEFAULT_ADMIN_NAME};
pub use jwt::{Claims, JwtKeys, RefreshClaims, TokenConfig, TokenError, TokenService, TokenType};
pub use middleware::{authenticate, bearer_token, ensure_role, require_auth, require_role, AuthUser};
pub use password::PasswordService;
