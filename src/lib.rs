//! Single-user task manager.
//!
//! The engine lives in [`app`]: the task model, the task store owning the
//! canonical collection, the view pipeline deriving what is shown and the
//! SQLite-backed snapshot storage. The terminal shell in [`app::ui`] drives it.

pub mod app;
pub mod config;
pub mod error;

pub use error::{Error, Result};
