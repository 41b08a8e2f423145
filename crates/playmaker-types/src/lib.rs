pub mod api;
pub mod events;
pub mod groups;
pub mod models;
