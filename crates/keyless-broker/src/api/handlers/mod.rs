//! API request handlers

pub mod assume;

pub use assume::{assume_role, AppState};
