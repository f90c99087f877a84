//! Terminal front end.
//!
//! This layer reads input and prints views. Domain state and backend calls
//! live in [`crate::core::app`]; nothing here talks to the API directly.

pub mod chat_loop;
pub mod export;
pub mod format;
pub mod prompt;
pub mod render;
