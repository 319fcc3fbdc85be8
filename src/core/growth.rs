use crate::core::condition_map::WELL;
use crate::domain::table::Table;
use crate::utils::error::Result;

pub const TIME_HR: &str = "Time [hr]";

/// 單一量測類型 (例如 OD600) 的長表
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub name: String,
    pub table: Table,
}

/// 預設的量測名稱，用於找不到名稱列時
pub fn fallback_name(index: usize) -> String {
    format!("value{}", index)
}

/// 依 (well, Time [hr]) 合併所有量測
///
/// The first measurement keeps all of its columns; later ones contribute only
/// their value column.
pub fn merge_measurements(measurements: &[Measurement]) -> Result<Table> {
    let Some((first, rest)) = measurements.split_first() else {
        return Ok(Table::default());
    };

    let mut merged = first.table.clone();
    for measurement in rest {
        let mini = measurement
            .table
            .select(&[WELL, TIME_HR, measurement.name.as_str()])?;
        merged = merged.inner_join(&mini, &[WELL, TIME_HR])?;
    }
    Ok(merged)
}

/// 依孔位加上條件標註
pub fn attach_conditions(data: &Table, conditions: &Table) -> Result<Table> {
    data.inner_join(conditions, &[WELL])
}
