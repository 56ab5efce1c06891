use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Request DTO for posting a comment
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PostCommentDto {
    pub issue_id: Uuid,

    #[validate(length(min = 1, max = 2000, message = "Comment must be 1-2000 characters"))]
    pub content: String,
}
