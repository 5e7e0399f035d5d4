// Public API - session engine, data types and collaborators
pub mod history_log;
pub mod measurement;
pub mod session;
pub mod share;
pub mod state;
pub mod view;

// Binary support - argument parsing and configuration
pub mod cli;
pub mod config;
pub mod prefs;
