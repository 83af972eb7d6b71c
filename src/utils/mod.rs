// src/utils/mod.rs
pub mod error;
pub mod logging;
pub mod html_debug;

pub use error::{AppError, DocumentError}; // Re-export main error types for convenience
