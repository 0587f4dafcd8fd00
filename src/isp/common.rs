//! Common utilities module
//!
//! Shared error taxonomy used across the ISP pipeline.

pub mod error;

pub use error::{IspError, Result};
