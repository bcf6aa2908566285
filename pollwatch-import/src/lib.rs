//! pollwatch-import library interface
//!
//! Parsing and batch-upsert logic for the bulk unit import tool, split out
//! so both stages are unit-testable.

pub mod importer;
pub mod records;
