//! Storefront Shared Library
//!
//! This crate contains the wire types, models, and validation rules shared
//! between the backend and any client of its HTTP API.

pub mod errors;
pub mod models;
pub mod types;
pub mod validation;

// Re-export commonly used items
pub use errors::*;
pub use models::{Product, Role, UnknownRole, User};
pub use types::*;
