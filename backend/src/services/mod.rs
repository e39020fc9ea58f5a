//! Business logic services
//!
//! Services validate input, coordinate the stores and the token service, and
//! return `ServiceError`; the HTTP layer only maps those to responses.

pub mod auth;
pub mod product;

pub use auth::AuthService;
pub use product::ProductService;
