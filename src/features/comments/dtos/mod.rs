mod comment_dto;

pub use comment_dto::PostCommentDto;
