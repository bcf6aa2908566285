//! Demo unit seeding
//!
//! `--seed-demo` loads a fixed set of units spanning every region so a
//! fresh install has something on the map. Aggregates start at zero; they
//! only ever come from real reports.

use pollwatch_common::models::ElectionUnit;
use pollwatch_common::Result;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use super::units;

/// (province, district, sub_district, unit_number, latitude, longitude, voter_count)
const DEMO_UNITS: &[(&str, &str, &str, i64, f64, f64, i64)] = &[
    // กรุงเทพมหานคร
    ("กรุงเทพมหานคร", "เขตพญาไท", "สามเสนใน", 1, 13.7563, 100.5018, 523),
    ("กรุงเทพมหานคร", "เขตพญาไท", "สามเสนใน", 2, 13.7580, 100.5030, 498),
    ("กรุงเทพมหานคร", "เขตราชเทวี", "ถนนพญาไท", 1, 13.7540, 100.5220, 612),
    ("กรุงเทพมหานคร", "เขตราชเทวี", "ถนนพญาไท", 2, 13.7550, 100.5240, 587),
    ("กรุงเทพมหานคร", "เขตลาดพร้าว", "ลาดพร้าว", 1, 13.8070, 100.5730, 745),
    ("กรุงเทพมหานคร", "เขตวังทองหลาง", "วังทองหลาง", 1, 13.7800, 100.6100, 634),
    // ภาคเหนือ
    ("เชียงใหม่", "เมืองเชียงใหม่", "ศรีภูมิ", 1, 18.7883, 98.9853, 445),
    ("เชียงใหม่", "เมืองเชียงใหม่", "ศรีภูมิ", 2, 18.7890, 98.9870, 412),
    ("เชียงราย", "เมืองเชียงราย", "เวียง", 1, 19.9072, 99.8328, 389),
    ("น่าน", "เมืองน่าน", "ในเวียง", 1, 18.7756, 100.7731, 298),
    // ภาคตะวันออกเฉียงเหนือ
    ("ขอนแก่น", "เมืองขอนแก่น", "ในเมือง", 1, 16.4322, 102.8236, 567),
    ("ขอนแก่น", "เมืองขอนแก่น", "ในเมือง", 2, 16.4330, 102.8250, 534),
    ("อุดรธานี", "เมืองอุดรธานี", "หมากแข้ง", 1, 17.4138, 102.7876, 478),
    ("นครราชสีมา", "เมืองนครราชสีมา", "ในเมือง", 1, 14.9799, 102.0977, 623),
    ("อุบลราชธานี", "เมืองอุบลราชธานี", "ในเมือง", 1, 15.2287, 104.8564, 445),
    // ภาคกลาง
    ("ชลบุรี", "เมืองชลบุรี", "บางปลาสร้อย", 1, 13.3611, 100.9847, 534),
    ("ระยอง", "เมืองระยอง", "ท่าประดู่", 1, 12.6807, 101.2574, 478),
    ("นครสวรรค์", "เมืองนครสวรรค์", "ปากน้ำโพ", 1, 15.6966, 100.1158, 412),
    ("พิษณุโลก", "เมืองพิษณุโลก", "ในเมือง", 1, 16.8293, 100.2720, 389),
    ("อยุธยา", "พระนครศรีอยุธยา", "ประตูชัย", 1, 14.3559, 100.5670, 356),
    // ภาคใต้
    ("ภูเก็ต", "เมืองภูเก็ต", "ตลาดใหญ่", 1, 7.8804, 98.3923, 445),
    ("ภูเก็ต", "เมืองภูเก็ต", "ตลาดใหญ่", 2, 7.8820, 98.3950, 412),
    ("สุราษฎร์ธานี", "เมืองสุราษฎร์ธานี", "มะขามเตี้ย", 1, 9.1347, 99.3331, 389),
    ("หาดใหญ่", "หาดใหญ่", "หาดใหญ่ใน", 1, 7.0086, 100.4747, 567),
    ("นครศรีธรรมราช", "เมืองนครศรีธรรมราช", "ในเมือง", 1, 8.4304, 99.9631, 423),
];

/// Insert the demo units if the catalog is empty. Returns how many were
/// added; 0 means the catalog already had data and was left alone.
pub async fn seed_demo_units(pool: &SqlitePool) -> Result<usize> {
    if units::count_units(pool).await? > 0 {
        info!("Units table already populated, skipping demo seed");
        return Ok(0);
    }

    for (province, district, sub_district, unit_number, latitude, longitude, voter_count) in
        DEMO_UNITS
    {
        let unit = ElectionUnit {
            id: Uuid::new_v4(),
            province: (*province).to_string(),
            district: (*district).to_string(),
            sub_district: (*sub_district).to_string(),
            unit_number: *unit_number,
            latitude: Some(*latitude),
            longitude: Some(*longitude),
            voter_count: *voter_count,
            report_count: 0,
            severity_score: 0,
        };
        units::insert_unit(pool, &unit).await?;
    }

    info!("Seeded {} demo election units", DEMO_UNITS.len());
    Ok(DEMO_UNITS.len())
}
