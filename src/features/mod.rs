pub mod audit;
pub mod comments;
pub mod gamification;
pub mod issues;
pub mod likes;
pub mod session;
