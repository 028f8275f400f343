//! HTTP request handlers, organized by resource.

pub mod complaints;
pub mod health;
pub mod notifications;
pub mod restaurants;
pub mod websocket;

pub use health::health_check;
