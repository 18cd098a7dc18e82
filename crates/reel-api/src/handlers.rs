//! API request handlers.

pub mod health;
pub mod montages;

pub use health::{health, ready};
