//! Prompt templates for the vendor classifier backends
//!
//! Templates are fixed. Both vendor backends share the same classification
//! prompt and parse the same reply shape.

use super::{ReportContext, SimilarCandidate};

/// At most this many image URLs are attached to a classification request
pub const MAX_PROMPT_IMAGES: usize = 3;

const CLASSIFY_HEADER: &str = r#"คุณเป็น AI ที่ช่วยวิเคราะห์และจัดหมวดหมู่รายงานความผิดปกติในการเลือกตั้ง/ประชามติของประเทศไทย

กรุณาวิเคราะห์รายงานต่อไปนี้และตอบกลับเป็น JSON ที่มีโครงสร้างดังนี้:
{
  "category": "หมวดหมู่ของปัญหา (เช่น บัตรเสียหาย, เจ้าหน้าที่กระทำผิด, ความล่าช้า, การขัดขวางผู้มีสิทธิ์, อื่นๆ)",
  "severity": "ระดับความรุนแรง: low | medium | high | critical",
  "summary": "สรุปเหตุการณ์สั้นๆ ไม่เกิน 100 ตัวอักษร",
  "confidence": "ความมั่นใจในการวิเคราะห์ (0-1)",
  "possibleDuplicate": "true/false - มีโอกาสเป็นรายงานซ้ำหรือไม่"
}

เกณฑ์ระดับความรุนแรง:
- critical: ทุจริตเลือกตั้งร้ายแรง (เช่น นับคะแนนผิด, บัตรหายเป็นจำนวนมาก, การคุกคามผู้มีสิทธิ์)
- high: ปัญหาร้ายแรงที่อาจส่งผลต่อผลการเลือกตั้ง (เช่น เครื่องลงคะแนนเสีย, รอนานเกิน 2 ชั่วโมง)
- medium: ปัญหาที่มีผลกระทบปานกลาง (เช่น ความล่าช้า, บัตรขาด, เจ้าหน้าที่ไม่พร้อม)
- low: ปัญหาเล็กน้อย (เช่น ความไม่สะดวกเล็กน้อย, คำถามทั่วไป)

รายงาน: "#;

/// Prompt for a polling place sign photo; the image is attached separately
pub const LOCATION_PROMPT: &str = r#"นี่คือรูปภาพป้ายหน่วยเลือกตั้งหรือสถานที่เลือกตั้งในประเทศไทย
กรุณาวิเคราะห์และตอบกลับเป็น JSON ที่มีโครงสร้างดังนี้:
{
  "province": "ชื่อจังหวัด (ถ้าพบ)",
  "district": "ชื่อเขต/อำเภอ (ถ้าพบ)",
  "unitNumber": "หมายเลขหน่วยเลือกตั้ง (ถ้าพบ)",
  "confidence": "ความมั่นใจ 0-1"
}

ตอบกลับเฉพาะ JSON เท่านั้น:"#;

/// Build the classification prompt: header, quoted description, existing
/// reports from the same unit for duplicate context, JSON-only instruction.
pub fn classify_prompt(description: &str, existing: &[ReportContext]) -> String {
    let mut prompt = String::from(CLASSIFY_HEADER);
    prompt.push('"');
    prompt.push_str(description);
    prompt.push('"');
    prompt.push('\n');

    if !existing.is_empty() {
        prompt.push_str("\nรายงานที่มีอยู่แล้วในหน่วยนี้ (ใช้เปรียบเทียบว่าอาจเป็นรายงานซ้ำหรือไม่):\n");
        for report in existing {
            prompt.push_str("- [");
            prompt.push_str(&report.category);
            prompt.push_str("] ");
            prompt.push_str(&report.description);
            prompt.push('\n');
        }
    }

    prompt.push_str("\nตอบกลับเฉพาะ JSON เท่านั้น ไม่ต้องมีข้อความอื่น:");
    prompt
}

/// Build the similarity prompt listing candidate reports with their ids
pub fn similar_prompt(description: &str, candidates: &[SimilarCandidate]) -> String {
    let mut prompt = String::from(
        "คุณเป็น AI ที่ช่วยเปรียบเทียบรายงานว่าเป็นรายงานเดียวกันหรือไม่\n\nรายงานใหม่:\n\"",
    );
    prompt.push_str(description);
    prompt.push_str("\"\n\nรายงานที่อาจคล้ายกัน:\n");

    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] ID: {} - สถานที่: {} - {}\n",
            i + 1,
            candidate.id,
            candidate.location,
            candidate.description
        ));
    }

    prompt.push_str(
        r#"
กรุณาตอบเป็น JSON:
{
  "similarIds": ["id ของรายงานที่น่าจะซ้ำกัน (ถ้ามี)"],
  "reason": "เหตุผลสั้นๆ"
}

ตอบกลับเฉพาะ JSON:"#,
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_classify_prompt_embeds_description() {
        let prompt = classify_prompt("เครื่องลงคะแนนเสีย", &[]);
        assert!(prompt.contains("รายงาน: \"เครื่องลงคะแนนเสีย\""));
        assert!(prompt.contains("possibleDuplicate"));
        assert!(!prompt.contains("รายงานที่มีอยู่แล้ว"));
    }

    #[test]
    fn test_classify_prompt_lists_existing_reports() {
        let existing = vec![ReportContext {
            id: Uuid::new_v4(),
            category: "อื่นๆ".to_string(),
            description: "บัตรหมด".to_string(),
        }];
        let prompt = classify_prompt("บัตรไม่พอ", &existing);
        assert!(prompt.contains("รายงานที่มีอยู่แล้วในหน่วยนี้"));
        assert!(prompt.contains("- [อื่นๆ] บัตรหมด"));
    }

    #[test]
    fn test_similar_prompt_numbers_candidates() {
        let id = Uuid::new_v4();
        let candidates = vec![SimilarCandidate {
            id,
            location: "กรุงเทพมหานคร เขตพญาไท".to_string(),
            description: "รอนานมาก".to_string(),
        }];
        let prompt = similar_prompt("คิวยาวมาก", &candidates);
        assert!(prompt.contains(&format!("[1] ID: {} - สถานที่: กรุงเทพมหานคร เขตพญาไท - รอนานมาก", id)));
        assert!(prompt.contains("similarIds"));
    }
}
