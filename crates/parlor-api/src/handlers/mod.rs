//! HTTP request handlers.

pub mod health;
pub mod serve;
pub mod upload;
pub mod ws;
