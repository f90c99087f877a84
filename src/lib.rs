//! Nova is a terminal client for the Nova AI chatbot service.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`api`] defines the wire payloads and the [`api::NovaApi`] client that
//!   talks to the FastAPI backend.
//! - [`core`] owns login state, configuration, and the controllers behind the
//!   login, registration, and chat screens.
//! - [`ui`] prints views and runs the interactive chat loop on the terminal.
//! - [`commands`] parses slash commands typed in the chat.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`], which sets up logging, resolves the stored
//! login, and dispatches into [`ui::chat_loop`] for interactive sessions.

pub mod api;
pub mod cli;
pub mod commands;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
