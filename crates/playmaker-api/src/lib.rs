pub mod chat;
pub mod middleware;
pub mod notifications;
pub mod state;
