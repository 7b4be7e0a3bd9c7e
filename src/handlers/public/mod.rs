pub mod auth;
pub mod changes;
pub mod content;
