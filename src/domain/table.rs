use crate::domain::model::Value;
use crate::utils::error::{DknError, Result};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// 刪除缺值列的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropHow {
    /// 任一欄缺值即刪除
    Any,
    /// 整列皆缺值才刪除
    All,
}

/// Tidy table: named columns, one observation per row.
///
/// Every row holds exactly one value per column and column names are unique.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns.into_iter().map(Into::into).collect();
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DknError::processing(format!(
                    "Duplicate column name '{}'",
                    column
                )));
            }
        }
        Ok(Self {
            columns,
            rows: Vec::new(),
        })
    }

    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns)?;
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// 讀取有表頭的分隔文字檔
    pub fn from_delimited(data: &[u8], delimiter: u8) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(data);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let mut table = Self::new(headers)?;
        let width = table.width();

        for record in reader.records() {
            let record = record?;
            let mut row: Vec<Value> = record.iter().take(width).map(Value::parse).collect();
            row.resize(width, Value::Missing);
            table.rows.push(row);
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| {
                DknError::missing_column(name, format!("table with columns {:?}", self.columns))
            })
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DknError::processing(format!(
                "Row has {} values but table has {} columns",
                row.len(),
                self.columns.len()
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn column(&self, name: &str) -> Result<impl Iterator<Item = &Value> + '_> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(move |row| &row[idx]))
    }

    pub fn value(&self, row: usize, name: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == name)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// 新增或取代一整欄
    pub fn with_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(DknError::processing(format!(
                "Column '{}' has {} values but table has {} rows",
                name,
                values.len(),
                self.rows.len()
            )));
        }

        match self.columns.iter().position(|c| c == name) {
            Some(idx) => {
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row[idx] = value;
                }
            }
            None => {
                self.columns.push(name.to_string());
                for (row, value) in self.rows.iter_mut().zip(values) {
                    row.push(value);
                }
            }
        }
        Ok(())
    }

    pub fn fill_column(&mut self, name: &str, value: Value) -> Result<()> {
        let values = vec![value; self.rows.len()];
        self.with_column(name, values)
    }

    pub fn drop_columns(&mut self, names: &[&str]) -> Result<()> {
        let mut indices = Vec::with_capacity(names.len());
        for name in names {
            indices.push(self.column_index(name)?);
        }
        indices.sort_unstable();
        indices.dedup();

        for idx in indices.into_iter().rev() {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        Ok(())
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<()> {
        let idx = self.column_index(from)?;
        if from != to && self.has_column(to) {
            return Err(DknError::processing(format!(
                "Cannot rename '{}' to '{}': column already exists",
                from, to
            )));
        }
        self.columns[idx] = to.to_string();
        Ok(())
    }

    pub fn select(&self, names: &[&str]) -> Result<Table> {
        let indices = names
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;

        let mut table = Table::new(names.iter().copied())?;
        table.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(table)
    }

    /// 寬表轉長表
    ///
    /// `value_vars` 為 `None` 時，除 `id_vars` 外的所有欄都會被展開。
    /// Rows are emitted variable by variable, each in the table's row order.
    pub fn melt(
        &self,
        id_vars: &[&str],
        value_vars: Option<&[&str]>,
        var_name: &str,
        value_name: &str,
    ) -> Result<Table> {
        let id_indices = id_vars
            .iter()
            .map(|name| self.column_index(name))
            .collect::<Result<Vec<_>>>()?;

        let value_indices: Vec<usize> = match value_vars {
            Some(vars) => vars
                .iter()
                .map(|name| self.column_index(name))
                .collect::<Result<Vec<_>>>()?,
            None => (0..self.columns.len())
                .filter(|i| !id_indices.contains(i))
                .collect(),
        };

        let mut columns: Vec<&str> = id_vars.to_vec();
        columns.push(var_name);
        columns.push(value_name);
        let mut melted = Table::new(columns)?;

        for &vi in &value_indices {
            let variable = Value::text(self.columns[vi].clone());
            for row in &self.rows {
                let mut out: Vec<Value> = id_indices.iter().map(|&i| row[i].clone()).collect();
                out.push(variable.clone());
                out.push(row[vi].clone());
                melted.rows.push(out);
            }
        }
        Ok(melted)
    }

    /// 以指定鍵做內部合併，保留左表順序
    ///
    /// Non-key columns present on both sides get `_x` (left) and `_y` (right)
    /// suffixes. Rows with a missing key never match.
    pub fn inner_join(&self, other: &Table, on: &[&str]) -> Result<Table> {
        let left_keys = on
            .iter()
            .map(|k| self.column_index(k))
            .collect::<Result<Vec<_>>>()?;
        let right_keys = on
            .iter()
            .map(|k| other.column_index(k))
            .collect::<Result<Vec<_>>>()?;

        let right_extra: Vec<usize> = (0..other.columns.len())
            .filter(|i| !right_keys.contains(i))
            .collect();

        let clashes: HashSet<&str> = right_extra
            .iter()
            .map(|&i| other.columns[i].as_str())
            .filter(|name| !on.contains(name) && self.has_column(name))
            .collect();

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .map(|c| {
                if clashes.contains(c.as_str()) {
                    format!("{}_x", c)
                } else {
                    c.clone()
                }
            })
            .collect();
        for &i in &right_extra {
            let name = &other.columns[i];
            if clashes.contains(name.as_str()) {
                columns.push(format!("{}_y", name));
            } else {
                columns.push(name.clone());
            }
        }
        let mut joined = Table::new(columns)?;

        let mut index: HashMap<Vec<String>, Vec<usize>> = HashMap::new();
        for (r, row) in other.rows.iter().enumerate() {
            if let Some(key) = row_key(row, &right_keys) {
                index.entry(key).or_default().push(r);
            }
        }

        for row in &self.rows {
            let Some(key) = row_key(row, &left_keys) else {
                continue;
            };
            if let Some(matches) = index.get(&key) {
                for &r in matches {
                    let mut out = row.clone();
                    out.extend(right_extra.iter().map(|&i| other.rows[r][i].clone()));
                    joined.rows.push(out);
                }
            }
        }
        Ok(joined)
    }

    /// 縱向串接，欄位取聯集，缺的欄位補缺值
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        for table in tables {
            for column in &table.columns {
                if !columns.contains(column) {
                    columns.push(column.clone());
                }
            }
        }

        let mut rows = Vec::new();
        for table in tables {
            let mapping: Vec<Option<usize>> = columns
                .iter()
                .map(|c| table.columns.iter().position(|tc| tc == c))
                .collect();
            for row in &table.rows {
                rows.push(
                    mapping
                        .iter()
                        .map(|m| m.map(|i| row[i].clone()).unwrap_or_default())
                        .collect(),
                );
            }
        }
        Table { columns, rows }
    }

    /// 橫向依列位置並排，較短者補缺值
    pub fn side_by_side(tables: &[Table]) -> Result<Table> {
        let columns: Vec<String> = tables.iter().flat_map(|t| t.columns.clone()).collect();
        let mut out = Table::new(columns)?;
        let height = tables.iter().map(Table::len).max().unwrap_or(0);

        for r in 0..height {
            let mut row = Vec::with_capacity(out.width());
            for table in tables {
                match table.rows.get(r) {
                    Some(values) => row.extend(values.iter().cloned()),
                    None => row.extend(std::iter::repeat(Value::Missing).take(table.width())),
                }
            }
            out.rows.push(row);
        }
        Ok(out)
    }

    pub fn drop_missing(&mut self, how: DropHow) {
        self.rows.retain(|row| match how {
            DropHow::Any => !row.iter().any(Value::is_missing),
            DropHow::All => !row.iter().all(Value::is_missing),
        });
    }

    /// 穩定排序：數字在前、文字其次、缺值最後
    pub fn sort_by(&mut self, column: &str) -> Result<()> {
        let idx = self.column_index(column)?;
        self.rows.sort_by(|a, b| compare_values(&a[idx], &b[idx]));
        Ok(())
    }

    /// 依首次出現順序列出不重複的非缺值
    pub fn unique(&self, column: &str) -> Result<Vec<Value>> {
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for value in self.column(column)? {
            if let Some(key) = value.key() {
                if seen.insert(key) {
                    values.push(value.clone());
                }
            }
        }
        Ok(values)
    }

    pub fn to_delimited(&self, delimiter: u8) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(Vec::new());

        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row.iter().map(|v| v.to_string()))?;
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| DknError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| DknError::processing(e.to_string()))
    }

    pub fn to_csv(&self) -> Result<String> {
        self.to_delimited(b',')
    }

    pub fn to_tsv(&self) -> Result<String> {
        self.to_delimited(b'\t')
    }

    /// 轉為 JSON 物件陣列
    pub fn to_records(&self) -> Vec<serde_json::Value> {
        self.rows
            .iter()
            .map(|row| {
                let object: serde_json::Map<String, serde_json::Value> = self
                    .columns
                    .iter()
                    .zip(row)
                    .map(|(c, v)| {
                        (
                            c.clone(),
                            serde_json::to_value(v).unwrap_or(serde_json::Value::Null),
                        )
                    })
                    .collect();
                serde_json::Value::Object(object)
            })
            .collect()
    }
}

fn row_key(row: &[Value], indices: &[usize]) -> Option<Vec<String>> {
    indices.iter().map(|&i| row[i].key()).collect()
}

pub(crate) fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.total_cmp(y),
        (Value::Number(_), _) => Ordering::Less,
        (_, Value::Number(_)) => Ordering::Greater,
        (Value::Text(x), Value::Text(y)) => x.cmp(y),
        (Value::Text(_), Value::Missing) => Ordering::Less,
        (Value::Missing, Value::Text(_)) => Ordering::Greater,
        (Value::Missing, Value::Missing) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: f64) -> Value {
        Value::Number(n)
    }

    fn txt(s: &str) -> Value {
        Value::text(s)
    }

    fn wide() -> Table {
        Table::from_rows(
            ["Time [hr]", "A1", "A2"],
            vec![
                vec![num(0.0), num(0.1), num(0.2)],
                vec![num(1.0), num(0.3), Value::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        assert!(Table::new(["well", "well"]).is_err());
    }

    #[test]
    fn test_push_row_checks_width() {
        let mut table = Table::new(["a", "b"]).unwrap();
        assert!(table.push_row(vec![num(1.0)]).is_err());
        assert!(table.push_row(vec![num(1.0), num(2.0)]).is_ok());
    }

    #[test]
    fn test_melt_orders_by_variable() {
        let long = wide().melt(&["Time [hr]"], None, "well", "OD600").unwrap();
        assert_eq!(long.columns(), &["Time [hr]", "well", "OD600"]);
        assert_eq!(long.len(), 4);
        assert_eq!(long.rows()[0], vec![num(0.0), txt("A1"), num(0.1)]);
        assert_eq!(long.rows()[1], vec![num(1.0), txt("A1"), num(0.3)]);
        assert_eq!(long.rows()[2], vec![num(0.0), txt("A2"), num(0.2)]);
        assert_eq!(long.rows()[3][2], Value::Missing);
    }

    #[test]
    fn test_inner_join_keeps_left_order_and_suffixes() {
        let left = Table::from_rows(
            ["well", "OD600", "note"],
            vec![
                vec![txt("B1"), num(0.5), txt("l1")],
                vec![txt("A1"), num(0.1), txt("l2")],
                vec![txt("C1"), num(0.9), txt("l3")],
            ],
        )
        .unwrap();
        let right = Table::from_rows(
            ["well", "note"],
            vec![vec![txt("A1"), txt("r1")], vec![txt("B1"), txt("r2")]],
        )
        .unwrap();

        let joined = left.inner_join(&right, &["well"]).unwrap();
        assert_eq!(joined.columns(), &["well", "OD600", "note_x", "note_y"]);
        assert_eq!(joined.len(), 2);
        assert_eq!(joined.rows()[0][0], txt("B1"));
        assert_eq!(joined.rows()[0][3], txt("r2"));
        assert_eq!(joined.rows()[1][0], txt("A1"));
    }

    #[test]
    fn test_inner_join_skips_missing_keys() {
        let left = Table::from_rows(["k"], vec![vec![Value::Missing], vec![num(1.0)]]).unwrap();
        let right = Table::from_rows(["k"], vec![vec![Value::Missing], vec![num(1.0)]]).unwrap();
        assert_eq!(left.inner_join(&right, &["k"]).unwrap().len(), 1);
    }

    #[test]
    fn test_concat_fills_missing_columns() {
        let a = Table::from_rows(["x"], vec![vec![num(1.0)]]).unwrap();
        let b = Table::from_rows(["y"], vec![vec![num(2.0)]]).unwrap();
        let all = Table::concat(&[a, b]);
        assert_eq!(all.columns(), &["x", "y"]);
        assert_eq!(all.rows()[0], vec![num(1.0), Value::Missing]);
        assert_eq!(all.rows()[1], vec![Value::Missing, num(2.0)]);
    }

    #[test]
    fn test_side_by_side_pads_shorter_tables() {
        let a = Table::from_rows(["x"], vec![vec![num(1.0)], vec![num(2.0)]]).unwrap();
        let b = Table::from_rows(["y"], vec![vec![num(3.0)]]).unwrap();
        let both = Table::side_by_side(&[a, b]).unwrap();
        assert_eq!(both.len(), 2);
        assert_eq!(both.rows()[1], vec![num(2.0), Value::Missing]);
    }

    #[test]
    fn test_drop_missing() {
        let mut table = Table::from_rows(
            ["a", "b"],
            vec![
                vec![num(1.0), Value::Missing],
                vec![Value::Missing, Value::Missing],
                vec![num(2.0), num(3.0)],
            ],
        )
        .unwrap();
        let mut all = table.clone();
        all.drop_missing(DropHow::All);
        assert_eq!(all.len(), 2);
        table.drop_missing(DropHow::Any);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_sort_by_puts_missing_last() {
        let mut table = Table::from_rows(
            ["t"],
            vec![vec![Value::Missing], vec![num(2.0)], vec![txt("x")], vec![num(1.0)]],
        )
        .unwrap();
        table.sort_by("t").unwrap();
        let order: Vec<String> = table.column("t").unwrap().map(|v| v.to_string()).collect();
        assert_eq!(order, vec!["1", "2", "x", ""]);
    }

    #[test]
    fn test_unique_skips_missing() {
        let table = Table::from_rows(
            ["c"],
            vec![vec![txt("PI")], vec![Value::Missing], vec![txt("PYO")], vec![txt("PI")]],
        )
        .unwrap();
        assert_eq!(table.unique("c").unwrap(), vec![txt("PI"), txt("PYO")]);
    }

    #[test]
    fn test_csv_roundtrip_header_and_values() {
        let csv = wide().to_csv().unwrap();
        assert!(csv.starts_with("Time [hr],A1,A2\n"));
        assert!(csv.contains("1,0.3,\n"));

        let back = Table::from_delimited(csv.as_bytes(), b',').unwrap();
        assert_eq!(back, wide());
    }

    #[test]
    fn test_records_use_null_for_missing() {
        let records = wide().to_records();
        assert_eq!(records[1]["A2"], serde_json::Value::Null);
        assert_eq!(records[0]["A1"], serde_json::json!(0.1));
    }

    #[test]
    fn test_missing_column_error() {
        let err = wide().column_index("B7").unwrap_err();
        assert!(matches!(err, DknError::MissingColumnError { .. }));
    }
}
