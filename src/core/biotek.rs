//! BioTek Gen5 kinetic-read exports.

use crate::core::condition_map::WELL;
use crate::core::growth::{fallback_name, Measurement, TIME_HR};
use crate::domain::model::{round_to, Cell, Sheet, Value};
use crate::domain::table::{DropHow, Table};
use crate::utils::error::{DknError, Result};

pub const KINETIC_READ: &str = "Kinetic read";

fn time_format_error(value: &str, reason: &str) -> DknError {
    DknError::TimeFormatError {
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// 將 "HH:MM:SS" 或 "date HH:MM:SS" 轉成小時 (三位小數)
///
/// With a date prefix the last two characters of the date are a day count,
/// so `1900-01-01 02:30:00` is 26.5 hours.
pub fn str2hours(raw: &str) -> Result<f64> {
    let parts: Vec<&str> = raw.split_whitespace().collect();
    let (time_string, accounted_hours) = match parts.as_slice() {
        [time] => (*time, 0.0),
        [days, time] => {
            let chars: Vec<char> = days.chars().collect();
            let tail: String = chars[chars.len().saturating_sub(2)..].iter().collect();
            let days: u32 = tail
                .parse()
                .map_err(|_| time_format_error(raw, "day count is not a number"))?;
            (*time, f64::from(days) * 24.0)
        }
        _ => return Err(time_format_error(raw, "expected hours:minutes:seconds")),
    };

    let fields: Vec<&str> = time_string.splitn(3, ':').collect();
    let (hours, minutes, seconds) = match fields.as_slice() {
        [h, m, s] => (*h, *m, *s),
        _ => return Err(time_format_error(raw, "expected hours:minutes:seconds")),
    };

    let is_number = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    if !(is_number(hours) && is_number(minutes) && is_number(seconds)) {
        return Err(time_format_error(
            raw,
            "all time points must be in the format hours:minutes:seconds",
        ));
    }

    // 純數字字串必可解析
    let hours: f64 = hours.parse().unwrap_or_default();
    let minutes: f64 = minutes.parse().unwrap_or_default();
    let seconds: f64 = seconds.parse().unwrap_or_default();

    if minutes >= 60.0 || seconds >= 60.0 {
        return Err(time_format_error(
            raw,
            "minutes and seconds values must be less than 60",
        ));
    }

    Ok(round_to(
        hours + accounted_hours + minutes / 60.0 + seconds / 3600.0,
        3,
    ))
}

/// 時間儲存格轉小時；試算表的時間值以天為單位
pub fn cell_hours(cell: &Cell) -> Result<Option<f64>> {
    match cell {
        Cell::Empty => Ok(None),
        Cell::Text(text) if text.trim().is_empty() => Ok(None),
        Cell::Text(text) => str2hours(text).map(Some),
        Cell::Number(days) | Cell::Duration(days) => Ok(Some(round_to(days * 24.0, 3))),
    }
}

pub fn wrangle_growthcurves(sheet: &Sheet) -> Result<Vec<Measurement>> {
    let markers = sheet.marker_rows(&[KINETIC_READ]);
    if markers.is_empty() {
        return Err(DknError::layout(format!(
            "No '{}' rows found in the export",
            KINETIC_READ
        )));
    }

    let mut measurements = Vec::with_capacity(markers.len());
    for (i, &start) in markers.iter().enumerate() {
        let name = start
            .checked_sub(1)
            .and_then(|r| sheet.first_text(r))
            .unwrap_or_else(|| fallback_name(i));

        // 區塊延伸到下一個區塊的名稱列或表尾
        let end = markers
            .get(i + 1)
            .map(|&next| (next - 1).max(start + 1))
            .unwrap_or(sheet.len());

        tracing::debug!("BioTek block '{}' spans rows {}..{}", name, start + 1, end);
        measurements.push(tidy_block(sheet, &name, start, end)?);
    }
    Ok(measurements)
}

fn tidy_block(sheet: &Sheet, name: &str, header_row: usize, end: usize) -> Result<Measurement> {
    let wells: Vec<(usize, String)> = sheet.rows[header_row]
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(c, cell)| cell.as_text().map(|text| (c, text)))
        .collect();

    let mut times = Vec::new();
    for r in (header_row + 1)..end {
        if sheet.row_is_empty(r) {
            continue;
        }
        if let Some(hours) = cell_hours(sheet.cell(r, 0))? {
            times.push((r, hours));
        }
    }

    let mut table = Table::new([TIME_HR, WELL, name])?;
    for (c, well) in &wells {
        for &(r, hours) in &times {
            table.push_row(vec![
                Value::Number(hours),
                Value::text(well.clone()),
                sheet.cell(r, *c).to_value(),
            ])?;
        }
    }
    table.drop_missing(DropHow::Any);

    Ok(Measurement {
        name: name.to_string(),
        table,
    })
}
