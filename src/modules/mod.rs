//! Modules layer - Infrastructure components for external integrations
//!
//! Contains the seam to the hosted backend service (auth, storage,
//! realtime change feed) and its in-memory reference implementation.

pub mod backend;
