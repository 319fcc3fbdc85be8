//! Tecan i-control time-course exports.
//!
//! Each measurement (OD600, fluorescence, …) is a block: a name row, a
//! `Cycle Nr.` header row with `Time [s]`, `Temp. [°C]` and one column per
//! well, then one row per cycle. `End Time` closes the data; the row just
//! before each following marker is never data.

use crate::core::condition_map::WELL;
use crate::core::growth::{fallback_name, Measurement, TIME_HR};
use crate::domain::model::{round_to, Sheet, Value};
use crate::domain::table::{DropHow, Table};
use crate::utils::error::{DknError, Result};

pub const CYCLE: &str = "Cycle Nr.";
pub const END_TIME: &str = "End Time";
pub const TIME_S: &str = "Time [s]";
pub const TEMPERATURE: &str = "Temp. [°C]";

/// 拆出每個量測區塊並轉為長表
pub fn wrangle_growthcurves(sheet: &Sheet) -> Result<Vec<Measurement>> {
    let markers = sheet.marker_rows(&[CYCLE, END_TIME]);
    if markers.len() < 2 {
        return Err(DknError::layout(format!(
            "Expected '{}' blocks closed by '{}', found {} marker row(s)",
            CYCLE,
            END_TIME,
            markers.len()
        )));
    }

    let mut measurements = Vec::with_capacity(markers.len() - 1);
    for (i, window) in markers.windows(2).enumerate() {
        let (start, next) = (window[0], window[1]);
        if sheet.first_text(start).as_deref() != Some(CYCLE) {
            return Err(DknError::layout(format!(
                "'{}' at row {} is not preceded by a measurement block",
                END_TIME,
                start + 1
            )));
        }

        let name = start
            .checked_sub(1)
            .and_then(|r| sheet.first_text(r))
            .unwrap_or_else(|| fallback_name(i));

        // 資料列為 start+1 .. next-1，下一個標記前一列 (名稱列或空白列) 不算
        let end = (next - 1).max(start + 1);

        tracing::debug!(
            "Tecan block '{}' spans rows {}..{}",
            name,
            start + 1,
            end
        );
        measurements.push(tidy_block(sheet, &name, start, end)?);
    }
    Ok(measurements)
}

fn tidy_block(sheet: &Sheet, name: &str, header_row: usize, end: usize) -> Result<Measurement> {
    let header: Vec<(usize, String)> = sheet.rows[header_row]
        .iter()
        .enumerate()
        .filter_map(|(c, cell)| cell.as_text().map(|text| (c, text)))
        .collect();

    let mut wide = Table::new(header.iter().map(|(_, text)| text.clone()))?;
    for r in (header_row + 1)..end {
        if sheet.row_is_empty(r) {
            continue;
        }
        wide.push_row(header.iter().map(|(c, _)| sheet.cell(r, *c).to_value()).collect())?;
    }
    wide.drop_missing(DropHow::All);

    if !wide.has_column(TIME_S) {
        return Err(DknError::missing_column(
            TIME_S,
            format!("Tecan measurement block '{}'", name),
        ));
    }

    let hours = wide
        .column(TIME_S)?
        .map(|v| match v.as_f64() {
            Some(seconds) => Value::Number(round_to(seconds / 3600.0, 3)),
            None => Value::Missing,
        })
        .collect();
    wide.with_column(TIME_HR, hours)?;

    let mut id_vars = vec![TIME_HR];
    id_vars.extend([CYCLE, TIME_S, TEMPERATURE].into_iter().filter(|c| wide.has_column(c)));

    let table = wide.melt(&id_vars, None, WELL, name)?;
    Ok(Measurement {
        name: name.to_string(),
        table,
    })
}
