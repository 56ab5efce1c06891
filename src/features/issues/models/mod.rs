mod issue;

pub use issue::{Issue, IssueCategory, IssueDraft, IssuePatch, IssueStatus};
