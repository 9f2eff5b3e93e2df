//! # Relluna Common Library
//!
//! Shared code for the Relluna services including:
//! - Database initialization and row models
//! - Configuration loading and root folder resolution
//! - Common error type
//! - Time and token utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
