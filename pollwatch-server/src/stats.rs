//! Dashboard statistics
//!
//! A pure projection over the current units and reports. Nothing here is
//! persisted or cached; every dashboard read recomputes from scratch.

use pollwatch_common::models::{ElectionUnit, Report, Severity};
use serde::Serialize;
use std::collections::HashSet;

/// Election-day overview numbers
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardStats {
    pub total_units: i64,
    pub total_reports: i64,
    pub critical_reports: i64,
    pub high_reports: i64,
    pub medium_reports: i64,
    pub low_reports: i64,
    pub units_with_issues: i64,
}

/// Compute the dashboard snapshot. Order-independent in both inputs.
///
/// `units_with_issues` counts distinct unit ids over the reports, not the
/// denormalized per-unit counters.
pub fn compute_stats(units: &[ElectionUnit], reports: &[Report]) -> DashboardStats {
    let mut critical = 0;
    let mut high = 0;
    let mut medium = 0;
    let mut low = 0;
    for report in reports {
        match report.severity {
            Severity::Critical => critical += 1,
            Severity::High => high += 1,
            Severity::Medium => medium += 1,
            Severity::Low => low += 1,
        }
    }

    let units_with_issues: HashSet<_> = reports.iter().map(|r| r.unit_id).collect();

    DashboardStats {
        total_units: units.len() as i64,
        total_reports: reports.len() as i64,
        critical_reports: critical,
        high_reports: high,
        medium_reports: medium,
        low_reports: low,
        units_with_issues: units_with_issues.len() as i64,
    }
}
