//! Unit record parsing for import files
//!
//! Two formats: a JSON array of unit objects, or header-mapped CSV. CSV
//! headers accept Thai names alongside the English ones because the unit
//! lists handed out by election offices are Thai spreadsheet exports.
//! Fields must not contain commas; the format is a plain comma split.

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

/// One polling unit as read from an import file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UnitRecord {
    pub province: String,
    pub district: String,
    #[serde(alias = "subdistrict")]
    pub sub_district: String,
    pub unit_number: i64,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub voter_count: i64,
}

impl UnitRecord {
    /// Reject values the schema would refuse anyway, so a bad file fails
    /// up front with a record number instead of mid-import
    fn validate(&self) -> Result<()> {
        if self.province.trim().is_empty() {
            bail!("province is empty");
        }
        if self.district.trim().is_empty() {
            bail!("district is empty");
        }
        if self.sub_district.trim().is_empty() {
            bail!("sub_district is empty");
        }
        if self.unit_number < 1 {
            bail!("unit_number must be positive (got {})", self.unit_number);
        }
        if self.voter_count < 0 {
            bail!("voter_count must be non-negative (got {})", self.voter_count);
        }
        Ok(())
    }
}

/// Load and validate an import file, dispatching on its extension
pub fn load_records(path: &Path) -> Result<Vec<UnitRecord>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let content = match ext.as_deref() {
        Some("json") | Some("csv") => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => bail!(
            "Unsupported file format: {} (use .json or .csv)",
            path.display()
        ),
    };

    let parsed = if ext.as_deref() == Some("json") {
        parse_json(&content)
    } else {
        parse_csv(&content)
    };
    let records = parsed.with_context(|| format!("Failed to parse {}", path.display()))?;

    for (index, record) in records.iter().enumerate() {
        record
            .validate()
            .with_context(|| format!("Record {}", index + 1))?;
    }

    Ok(records)
}

/// JSON import files are a plain array of unit objects
pub fn parse_json(content: &str) -> Result<Vec<UnitRecord>> {
    serde_json::from_str(content).map_err(|e| anyhow!("{}", e))
}

/// Header-mapped CSV. Column order is free; lines that are entirely blank
/// are skipped.
pub fn parse_csv(content: &str) -> Result<Vec<UnitRecord>> {
    let mut rows = content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header_line) = rows.next().ok_or_else(|| anyhow!("CSV file is empty"))?;
    let headers: Vec<&str> = header_line.split(',').map(str::trim).collect();

    let province_col = require_column(&headers, "province", &["province", "จังหวัด"])?;
    let district_col = require_column(&headers, "district", &["district", "อำเภอ"])?;
    let sub_district_col = require_column(
        &headers,
        "sub_district",
        &["sub_district", "subdistrict", "ตำบล"],
    )?;
    let unit_number_col = require_column(&headers, "unit_number", &["unit_number", "หน่วยที่"])?;
    let latitude_col = column_index(&headers, &["latitude", "ละติจูด"]);
    let longitude_col = column_index(&headers, &["longitude", "ลองจิจูด"]);
    let voter_count_col = column_index(&headers, &["voter_count", "จำนวนผู้มีสิทธิ"]);

    let mut records = Vec::new();
    for (index, line) in rows {
        let line_no = index + 1;
        let values: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |col: usize| values.get(col).copied().unwrap_or("");

        records.push(UnitRecord {
            province: field(province_col).to_string(),
            district: field(district_col).to_string(),
            sub_district: field(sub_district_col).to_string(),
            unit_number: parse_int(field(unit_number_col))
                .with_context(|| format!("Line {}: invalid unit_number", line_no))?,
            latitude: parse_optional_float(latitude_col.map(|c| field(c)))
                .with_context(|| format!("Line {}: invalid latitude", line_no))?,
            longitude: parse_optional_float(longitude_col.map(|c| field(c)))
                .with_context(|| format!("Line {}: invalid longitude", line_no))?,
            voter_count: match voter_count_col.map(|c| field(c)) {
                None | Some("") => 0,
                Some(value) => parse_int(value)
                    .with_context(|| format!("Line {}: invalid voter_count", line_no))?,
            },
        });
    }

    Ok(records)
}

/// First header position matching any accepted name
fn column_index(headers: &[&str], names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| names.contains(h))
}

fn require_column(headers: &[&str], label: &str, names: &[&str]) -> Result<usize> {
    column_index(headers, names).ok_or_else(|| anyhow!("Missing column: {}", label))
}

fn parse_int(value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| anyhow!("not an integer: {:?}", value))
}

fn parse_optional_float(value: Option<&str>) -> Result<Option<f64>> {
    match value {
        None | Some("") => Ok(None),
        Some(v) => v
            .parse::<f64>()
            .map(Some)
            .map_err(|_| anyhow!("not a number: {:?}", v)),
    }
}
