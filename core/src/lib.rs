//! clientdesk-core — client engagements, renewal reminders and business analytics
//! for a small web studio.

pub mod analytics;
pub mod client;
pub mod clock;
pub mod config;
pub mod desk;
pub mod error;
pub mod expense;
pub mod reminder;
pub mod store;
pub mod types;
