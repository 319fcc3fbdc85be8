use crate::domain::model::{Cell, Sheet};
use crate::domain::ports::Storage;
use crate::domain::table::Table;
use crate::utils::error::{DknError, Result};
use std::path::Path;

/// 依副檔名判斷的輸入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetFormat {
    Delimited(u8),
    Workbook,
}

impl SheetFormat {
    pub fn for_path(path: &str) -> Result<Self> {
        let extension = Path::new(path)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" | "txt" => Ok(SheetFormat::Delimited(b',')),
            "tsv" => Ok(SheetFormat::Delimited(b'\t')),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Ok(SheetFormat::Workbook),
            other => Err(DknError::InvalidConfigValueError {
                field: "input".to_string(),
                value: path.to_string(),
                reason: format!("Unsupported input format '{}'", other),
            }),
        }
    }
}

/// 讀取沒有表頭的分隔文字檔；各列欄數可不同
pub fn parse_delimited(data: &[u8], delimiter: u8) -> Result<Sheet> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(data);

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(Cell::from_text).collect());
    }
    Ok(Sheet::new(rows))
}

#[cfg(feature = "excel")]
pub fn parse_workbook(data: Vec<u8>) -> Result<Sheet> {
    use calamine::{open_workbook_auto_from_rs, Data, Reader};

    let mut workbook = open_workbook_auto_from_rs(std::io::Cursor::new(data))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| DknError::layout("Workbook has no worksheets"))??;

    // 範圍可能不從 A 欄開始，補齊前導空欄以保留欄位位置
    let leading_columns = range.start().map(|(_, col)| col as usize).unwrap_or(0);

    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; leading_columns];
            cells.extend(row.iter().map(|data| match data {
                Data::Empty | Data::Error(_) => Cell::Empty,
                Data::Int(i) => Cell::Number(*i as f64),
                Data::Float(f) => Cell::Number(*f),
                Data::String(s) => Cell::Text(s.clone()),
                Data::Bool(b) => Cell::Text(b.to_string()),
                Data::DateTime(dt) => Cell::Duration(dt.as_f64()),
                Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            }));
            cells
        })
        .collect();

    Ok(Sheet::new(rows))
}

#[cfg(not(feature = "excel"))]
pub fn parse_workbook(_data: Vec<u8>) -> Result<Sheet> {
    Err(DknError::ConfigValidationError {
        field: "input".to_string(),
        message: "Spreadsheet support is disabled in this build; export the sheet as CSV"
            .to_string(),
    })
}

pub fn parse_sheet(path: &str, data: Vec<u8>) -> Result<Sheet> {
    match SheetFormat::for_path(path)? {
        SheetFormat::Delimited(delimiter) => parse_delimited(&data, delimiter),
        SheetFormat::Workbook => parse_workbook(data),
    }
}

/// 將原始資料格的第一列當作表頭轉成資料表
pub fn sheet_to_table(sheet: &Sheet, header_row: usize) -> Result<Table> {
    let header = sheet
        .rows
        .get(header_row)
        .ok_or_else(|| DknError::layout(format!("No header found at row {}", header_row + 1)))?;

    let columns = header_names(header.iter().map(Cell::as_text));

    let mut table = Table::new(columns)?;
    let width = table.width();
    for r in (header_row + 1)..sheet.len() {
        let row = (0..width).map(|c| sheet.cell(r, c).to_value()).collect();
        table.push_row(row)?;
    }
    Ok(table)
}

/// 空白表頭命名為 "Unnamed: N"，重複表頭加上 ".1"、".2"
fn header_names(cells: impl Iterator<Item = Option<String>>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for (c, cell) in cells.enumerate() {
        let base = cell.unwrap_or_else(|| format!("Unnamed: {}", c));
        let mut name = base.clone();
        let mut k = 1;
        while names.contains(&name) {
            name = format!("{}.{}", base, k);
            k += 1;
        }
        names.push(name);
    }
    names
}

pub async fn load_sheet<S: Storage>(storage: &S, path: &str) -> Result<Sheet> {
    let data = storage.read_file(path).await?;
    let sheet = parse_sheet(path, data)?;
    tracing::debug!("Loaded {} rows from {}", sheet.len(), path);
    Ok(sheet)
}

pub async fn load_table<S: Storage>(storage: &S, path: &str) -> Result<Table> {
    let sheet = load_sheet(storage, path).await?;
    sheet_to_table(&sheet, 0)
}
