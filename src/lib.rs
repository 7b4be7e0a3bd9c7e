pub mod auth;
pub mod changes;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod identity;
pub mod media;
pub mod middleware;
pub mod notify;
pub mod router;
pub mod services;
pub mod state;

pub use router::app;
pub use state::{AppState, ServiceOptions};
