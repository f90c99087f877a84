pub mod app;
pub mod config;
pub mod keyring;
pub mod message;
pub mod storage;
pub mod token;
