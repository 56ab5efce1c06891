mod audit_entry;

pub use audit_entry::{AuditDraft, AuditEntry, AuditPatch};
