pub mod dtos;
pub mod models;
pub mod services;

pub use dtos::PostCommentDto;
pub use services::CommentService;
