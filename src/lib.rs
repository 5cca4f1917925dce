//! Multi-Modal Medical Data Fusion Diagnostic Assistant
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod diagnosis;
pub mod error;
pub mod services;
/// Application state management
///
/// Holds configuration and the upload store shared by handlers.
pub mod state;
