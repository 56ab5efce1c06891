use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::features::session::models::Role;
use crate::shared::validation::DISPLAY_NAME_REGEX;

/// Request DTO for signing in
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SignInDto {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Request DTO for registering a new account.
///
/// Validated locally before any call to the auth service.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterDto {
    #[validate(
        length(min = 2, max = 64, message = "Display name must be 2-64 characters"),
        regex(path = *DISPLAY_NAME_REGEX, message = "Display name contains invalid characters")
    )]
    pub display_name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub password_confirm: String,

    pub role: Role,
}
