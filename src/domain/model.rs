use crate::domain::table::Table;
use serde::{Serialize, Serializer};
use std::fmt;

/// 整理後資料表中的單一值
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Missing,
    Number(f64),
    Text(String),
}

impl Value {
    /// 解析文字：空白為缺值，可轉數字者為數字，其餘保留為文字
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_nan() => Value::Missing,
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    /// 保留為文字，不嘗試轉成數字
    pub fn text(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.trim().is_empty() {
            Value::Missing
        } else {
            Value::Text(raw)
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse::<f64>().ok().filter(|n| !n.is_nan()),
            Value::Missing => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// 合併與分組時使用的比對鍵
    pub fn key(&self) -> Option<String> {
        match self {
            Value::Missing => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Missing => serializer.serialize_none(),
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        if n.is_nan() {
            Value::Missing
        } else {
            Value::Number(n)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

/// 整數值輸出時不帶小數點 (例如 1.0 -> "1")
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// 四捨五入到指定小數位
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// 原始工作表中的儲存格
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Number(f64),
    Text(String),
    /// 試算表的時間/日期值，以天為單位
    Duration(f64),
}

impl Cell {
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Empty;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Cell::Number(n),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// 儲存格的文字形式；數字不帶多餘的 ".0"
    pub fn as_text(&self) -> Option<String> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) | Cell::Duration(n) => Some(format_number(*n)),
            Cell::Text(s) if s.trim().is_empty() => None,
            Cell::Text(s) => Some(s.trim().to_string()),
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Cell::Empty => Value::Missing,
            Cell::Number(n) | Cell::Duration(n) => Value::from(*n),
            Cell::Text(s) => Value::parse(s),
        }
    }
}

/// 沒有表頭的原始資料格
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub rows: Vec<Vec<Cell>>,
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Sheet {
    pub fn new(rows: Vec<Vec<Cell>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn first_text(&self, row: usize) -> Option<String> {
        self.cell(row, 0).as_text()
    }

    pub fn row_is_empty(&self, row: usize) -> bool {
        self.rows
            .get(row)
            .map(|cells| cells.iter().all(Cell::is_empty))
            .unwrap_or(true)
    }

    /// 以第一欄等於任一標記文字的列號
    pub fn marker_rows(&self, markers: &[&str]) -> Vec<usize> {
        (0..self.rows.len())
            .filter(|&r| {
                self.first_text(r)
                    .map(|text| markers.contains(&text.as_str()))
                    .unwrap_or(false)
            })
            .collect()
    }
}

/// 以 Vega-Lite 描述的圖表
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub name: String,
    pub spec: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamedTable {
    pub name: String,
    pub table: Table,
}

impl NamedTable {
    pub fn new(name: impl Into<String>, table: Table) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub tables: Vec<NamedTable>,
    pub figures: Vec<Figure>,
    pub summary: serde_json::Value,
}

impl TransformResult {
    pub fn record_count(&self) -> usize {
        self.tables.iter().map(|t| t.table.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse(" 5 "), Value::Number(5.0));
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(Value::parse("PYO"), Value::Text("PYO".to_string()));
    }

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(Value::Number(12.0).to_string(), "12");
        assert_eq!(Value::Number(0.25).to_string(), "0.25");
        assert_eq!(Cell::Number(3.0).as_text().as_deref(), Some("3"));
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(1.23456, 3), 1.235);
        assert_eq!(round_to(2.0 / 3.0, 3), 0.667);
    }

    #[test]
    fn test_sheet_marker_rows() {
        let sheet = Sheet::new(vec![
            vec![Cell::from_text("OD600")],
            vec![Cell::from_text("Cycle Nr."), Cell::from_text("Time [s]")],
            vec![Cell::Number(1.0), Cell::Number(0.0)],
            vec![Cell::from_text("End Time")],
        ]);
        assert_eq!(sheet.marker_rows(&["Cycle Nr.", "End Time"]), vec![1, 3]);
        assert_eq!(sheet.cell(10, 10), &Cell::Empty);
    }
}
