//! Cross-cutting helpers

pub mod error;
pub mod fs;

pub use error::{AzaleaError, Result};
