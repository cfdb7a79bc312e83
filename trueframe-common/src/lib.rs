//! # TrueFrame Common Library
//!
//! Shared code for the TrueFrame workspace:
//! - Configuration file schema and resolution
//! - Logging initialization
//! - Common error type

pub mod config;
pub mod error;
pub mod logging;

pub use error::{Error, Result};
