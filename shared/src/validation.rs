//! Input validation functions
//!
//! Field-level rules return `Result<(), String>`; request-level checks
//! collect every failing field so a client sees all problems at once.

use crate::types::{
    CreateProductRequest, LoginRequest, RefreshTokenRequest, RegisterRequest,
    UpdateProductRequest, UpdateProfileRequest,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use validator::ValidateEmail;

pub const EMAIL_MAX_LEN: usize = 255;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const NAME_MIN_LEN: usize = 1;
pub const NAME_MAX_LEN: usize = 100;
/// Prices are stored as NUMERIC(12, 2)
pub const PRICE_MAX_SCALE: u32 = 2;
pub const PRICE_MAX: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);
pub const PRODUCT_NAME_MIN_LEN: usize = 3;
pub const PRODUCT_NAME_MAX_LEN: usize = 255;
pub const DESCRIPTION_MAX_LEN: usize = 2000;

/// Validate email format
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    if email.len() > EMAIL_MAX_LEN {
        return Err("Email too long".to_string());
    }
    if !email.validate_email() {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

/// Validate password length
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < PASSWORD_MIN_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN_LEN
        ));
    }
    if len > PASSWORD_MAX_LEN {
        return Err("Password too long".to_string());
    }
    Ok(())
}

/// Validate a display name; blank names are rejected
pub fn validate_name(name: &str) -> Result<(), String> {
    validate_required(name)?;
    validate_length(name, NAME_MIN_LEN, NAME_MAX_LEN)
}

fn validate_required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("This field is required".to_string());
    }
    Ok(())
}

fn validate_length(value: &str, min: usize, max: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len < min {
        return Err(format!("Must be at least {} characters", min));
    }
    if len > max {
        return Err(format!("Must be at most {} characters", max));
    }
    Ok(())
}

/// Validate product price: positive, whole cents, within column range
pub fn validate_price(price: Decimal) -> Result<(), String> {
    if price <= Decimal::ZERO {
        return Err("Price must be greater than zero".to_string());
    }
    if price.normalize().scale() > PRICE_MAX_SCALE {
        return Err(format!(
            "Price must have at most {} decimal places",
            PRICE_MAX_SCALE
        ));
    }
    if price > PRICE_MAX {
        return Err(format!("Price must be at most {}", PRICE_MAX));
    }
    Ok(())
}

/// Validate stock level
pub fn validate_stock(stock: i32) -> Result<(), String> {
    if stock < 0 {
        return Err("Stock cannot be negative".to_string());
    }
    Ok(())
}

/// Validate an http(s) image URL
pub fn validate_image_url(url: &str) -> Result<(), String> {
    static URL_RE: OnceLock<regex_lite::Regex> = OnceLock::new();
    let re = URL_RE
        .get_or_init(|| regex_lite::Regex::new(r"^https?://[^\s/$.?#][^\s]*$").expect("static regex"));
    if !re.is_match(url) {
        return Err("Invalid URL".to_string());
    }
    Ok(())
}

/// Validation error with field context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Default)]
struct Collector(Vec<ValidationError>);

impl Collector {
    fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.0.push(ValidationError::new(field, &message));
        }
    }

    fn finish(self) -> Result<(), Vec<ValidationError>> {
        if self.0.is_empty() {
            Ok(())
        } else {
            Err(self.0)
        }
    }
}

/// Request bodies that carry field-level rules
pub trait ValidateRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl ValidateRequest for RegisterRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        c.check("email", validate_email(&self.email));
        c.check("password", validate_password(&self.password));
        c.check("name", validate_name(&self.name));
        c.finish()
    }
}

impl ValidateRequest for LoginRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        c.check("email", validate_required(&self.email));
        c.check("password", validate_required(&self.password));
        c.finish()
    }
}

impl ValidateRequest for RefreshTokenRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        c.check("refresh_token", validate_required(&self.refresh_token));
        c.finish()
    }
}

impl ValidateRequest for UpdateProfileRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        c.check("name", validate_name(&self.name));
        c.finish()
    }
}

impl ValidateRequest for CreateProductRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        c.check(
            "name",
            validate_length(&self.name, PRODUCT_NAME_MIN_LEN, PRODUCT_NAME_MAX_LEN),
        );
        c.check(
            "description",
            validate_length(&self.description, 0, DESCRIPTION_MAX_LEN),
        );
        c.check("price", validate_price(self.price));
        c.check("stock", validate_stock(self.stock));
        c.check("category_id", validate_required(&self.category_id));
        if let Some(url) = &self.image_url {
            c.check("image_url", validate_image_url(url));
        }
        c.finish()
    }
}

impl ValidateRequest for UpdateProductRequest {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut c = Collector::default();
        if let Some(name) = &self.name {
            c.check(
                "name",
                validate_length(name, PRODUCT_NAME_MIN_LEN, PRODUCT_NAME_MAX_LEN),
            );
        }
        if let Some(description) = &self.description {
            c.check(
                "description",
                validate_length(description, 0, DESCRIPTION_MAX_LEN),
            );
        }
        if let Some(price) = self.price {
            c.check("price", validate_price(price));
        }
        if let Some(stock) = self.stock {
            c.check("stock", validate_stock(stock));
        }
        if let Some(category_id) = &self.category_id {
            c.check("category_id", validate_required(category_id));
        }
        if let Some(url) = &self.image_url {
            c.check("image_url", validate_image_url(url));
        }
        c.finish()
    }
}
