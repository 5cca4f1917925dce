// State management module
// Holds the immutable per-process state shared with request handlers

pub mod app_state;

pub use app_state::AppState;
