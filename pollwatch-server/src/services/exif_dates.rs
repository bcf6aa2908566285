//! EXIF capture-time extraction
//!
//! When a reporter attaches a photo without filling in the incident time,
//! the photo's own EXIF timestamp is the best available evidence of when
//! the incident happened. Extraction is best-effort: any unreadable or
//! EXIF-less file simply yields None and the report falls back to the
//! submission time.

use chrono::{DateTime, NaiveDate, Utc};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;

/// Tags checked in order of preference. DateTimeOriginal is the shutter
/// time; DateTimeDigitized and DateTime drift on edited files.
const DATE_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

/// Pull the capture timestamp out of an image's EXIF block, if present.
///
/// EXIF datetime fields carry no timezone, so the value is read as UTC.
pub fn extract_captured_at(data: &[u8]) -> Option<DateTime<Utc>> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(data))
        .ok()?;

    for tag in DATE_TAGS {
        if let Some(field) = exif.get_field(tag, In::PRIMARY) {
            if let Some(captured) = field_to_utc(&field.value) {
                return Some(captured);
            }
        }
    }
    None
}

fn field_to_utc(value: &Value) -> Option<DateTime<Utc>> {
    let bytes = match value {
        Value::Ascii(lines) => lines.first()?,
        _ => return None,
    };
    let dt = exif::DateTime::from_ascii(bytes).ok()?;
    let date = NaiveDate::from_ymd_opt(dt.year.into(), dt.month.into(), dt.day.into())?;
    let naive = date.and_hms_opt(dt.hour.into(), dt.minute.into(), dt.second.into())?;
    Some(naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use exif::experimental::Writer;
    use exif::Field;

    fn tiff_with(fields: &[(Tag, &str)]) -> Vec<u8> {
        let owned: Vec<Field> = fields
            .iter()
            .map(|(tag, value)| Field {
                tag: *tag,
                ifd_num: In::PRIMARY,
                value: Value::Ascii(vec![value.as_bytes().to_vec()]),
            })
            .collect();
        let mut writer = Writer::new();
        for field in &owned {
            writer.push_field(field);
        }
        let mut buf = Cursor::new(Vec::new());
        writer.write(&mut buf, false).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_extracts_datetime_original() {
        let data = tiff_with(&[(Tag::DateTimeOriginal, "2026:02:08 09:30:15")]);
        let captured = extract_captured_at(&data).unwrap();
        assert_eq!(captured.to_rfc3339(), "2026-02-08T09:30:15+00:00");
    }

    #[test]
    fn test_prefers_original_over_plain_datetime() {
        let data = tiff_with(&[
            (Tag::DateTime, "2026:02:09 18:00:00"),
            (Tag::DateTimeOriginal, "2026:02:08 09:30:15"),
        ]);
        let captured = extract_captured_at(&data).unwrap();
        assert_eq!(captured.hour(), 9);
    }

    #[test]
    fn test_falls_back_to_digitized() {
        let data = tiff_with(&[
            (Tag::DateTime, "2026:02:09 18:00:00"),
            (Tag::DateTimeDigitized, "2026:02:08 10:00:00"),
        ]);
        let captured = extract_captured_at(&data).unwrap();
        assert_eq!(captured.hour(), 10);
    }

    #[test]
    fn test_falls_back_to_plain_datetime() {
        let data = tiff_with(&[(Tag::DateTime, "2026:02:09 18:00:00")]);
        let captured = extract_captured_at(&data).unwrap();
        assert_eq!(captured.hour(), 18);
    }

    #[test]
    fn test_garbled_preferred_tag_falls_through() {
        let data = tiff_with(&[
            (Tag::DateTimeOriginal, "not a timestamp"),
            (Tag::DateTime, "2026:02:08 11:45:00"),
        ]);
        let captured = extract_captured_at(&data).unwrap();
        assert_eq!(captured.hour(), 11);
    }

    #[test]
    fn test_no_date_tags_yields_none() {
        let data = tiff_with(&[(Tag::Make, "TestCam")]);
        assert!(extract_captured_at(&data).is_none());
    }

    #[test]
    fn test_non_image_bytes_yield_none() {
        assert!(extract_captured_at(b"definitely not an image").is_none());
        assert!(extract_captured_at(&[]).is_none());
    }
}
