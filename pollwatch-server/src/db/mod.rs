//! Database operations for units, reports, and votes
//!
//! Schema creation lives in pollwatch-common; these modules hold the
//! server's queries on top of it.

pub mod reports;
pub mod seed;
pub mod units;
pub mod votes;
