mod comment;

pub use comment::{Comment, CommentDraft, CommentPatch};
