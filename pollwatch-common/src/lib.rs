//! # PollWatch Common Library
//!
//! Shared code for the PollWatch election monitoring services including:
//! - Core entity models (units, reports, votes, classifications)
//! - Database schema bootstrap and settings access
//! - Configuration loading and root folder resolution
//! - Common error types

pub mod config;
pub mod db;
pub mod error;
pub mod models;

pub use error::{Error, Result};
pub use models::{Severity, ReportStatus};
