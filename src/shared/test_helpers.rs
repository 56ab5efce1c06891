use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use crate::features::session::dtos::RegisterDto;
use crate::features::session::models::Role;

pub fn register_dto(display_name: &str, email: &str, role: Role) -> RegisterDto {
    RegisterDto {
        display_name: display_name.to_string(),
        email: email.to_string(),
        password: "correct-horse-battery".to_string(),
        password_confirm: "correct-horse-battery".to_string(),
        role,
    }
}

/// Registration DTO with a generated email, for tests that need several
/// distinct accounts without caring who they are.
pub fn random_register_dto(display_name: &str, role: Role) -> RegisterDto {
    register_dto(display_name, &SafeEmail().fake::<String>(), role)
}
