//! 96-well condition map templates.
//!
//! The template has a header row `variable, row, 1 … 12` and one row per
//! (variable, plate row) pair. Parsing pivots it to one tidy row per well and
//! splits the `Medium; …` and `Condition; …` descriptors into name and
//! concentration columns.

use crate::domain::model::{Sheet, Value};
use crate::domain::table::Table;
use crate::utils::error::{DknError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

pub const VARIABLE_HEADER: &str = "variable";
pub const ROW_HEADER: &str = "row";
pub const MEDIUM_VARIABLE: &str = "Medium; Concentration (mM)";
pub const CONDITION_VARIABLE: &str = "Condition; Concentration (µM)";
pub const PLATE_COLUMNS: usize = 12;
pub const WELL: &str = "well";

/// 產生資料的儀器，決定輸出欄位名稱
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum Instrument {
    #[default]
    Tecan,
    Biotek,
}

/// 拆分後的欄位名稱
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnLabels {
    pub medium: &'static str,
    pub medium_concentration: &'static str,
    pub condition: &'static str,
    pub condition_concentration: &'static str,
    /// 培養基濃度是否轉為數值
    pub numeric_medium_concentration: bool,
}

impl Instrument {
    pub fn labels(&self) -> ColumnLabels {
        match self {
            Instrument::Tecan => ColumnLabels {
                medium: "Medium",
                medium_concentration: "Medium Conc. (mM)",
                condition: "Condition",
                condition_concentration: "Condition Conc. (µM)",
                numeric_medium_concentration: true,
            },
            Instrument::Biotek => ColumnLabels {
                medium: "medium",
                medium_concentration: "[medium] (mM)",
                condition: "condition",
                condition_concentration: "[condition] (µM)",
                numeric_medium_concentration: false,
            },
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Instrument::Tecan => "tecan",
            Instrument::Biotek => "biotek",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionMapOptions {
    pub instrument: Instrument,
    pub delimiter: String,
    /// Every well lists all additions, e.g. `PI, PYO, PCA; 5, 0, 0`.
    pub verbose: bool,
}

impl Default for ConditionMapOptions {
    fn default() -> Self {
        Self {
            instrument: Instrument::Tecan,
            delimiter: ";".to_string(),
            verbose: false,
        }
    }
}

fn well_regex() -> &'static Regex {
    static WELL_RE: OnceLock<Regex> = OnceLock::new();
    WELL_RE.get_or_init(|| Regex::new(r"^([A-Za-z]+)(\d+)$").expect("valid well regex"))
}

/// 孔位排序鍵：先列字母，再欄號
pub fn well_sort_key(well: &str) -> (String, u32, String) {
    match well_regex().captures(well) {
        Some(caps) => (
            caps[1].to_ascii_uppercase(),
            caps[2].parse().unwrap_or(u32::MAX),
            String::new(),
        ),
        None => (String::new(), u32::MAX, well.to_string()),
    }
}

pub fn parse_condition_map(sheet: &Sheet, options: &ConditionMapOptions) -> Result<Table> {
    if options.delimiter.is_empty() {
        return Err(DknError::ConditionMapError {
            message: "Delimiter cannot be empty".to_string(),
        });
    }

    let wide = pivot_wells(sheet)?;
    split_descriptors(wide, options)
}

/// 將樣板展開成每孔一列、每個變數一欄
fn pivot_wells(sheet: &Sheet) -> Result<Table> {
    let header: Vec<Option<String>> = sheet
        .rows
        .first()
        .ok_or_else(|| DknError::ConditionMapError {
            message: "Condition map is empty".to_string(),
        })?
        .iter()
        .map(|cell| cell.as_text())
        .collect();

    let find = |name: &str| -> Result<usize> {
        header
            .iter()
            .position(|h| h.as_deref() == Some(name))
            .ok_or_else(|| DknError::missing_column(name, "condition map header"))
    };

    let variable_col = find(VARIABLE_HEADER)?;
    let row_col = find(ROW_HEADER)?;
    let plate_cols = (1..=PLATE_COLUMNS)
        .map(|n| find(&n.to_string()).map(|idx| (n, idx)))
        .collect::<Result<Vec<_>>>()?;

    let mut variables = BTreeSet::new();
    let mut wells: Vec<String> = Vec::new();
    let mut cells: HashMap<(String, String), Value> = HashMap::new();

    for r in 1..sheet.len() {
        if sheet.row_is_empty(r) {
            continue;
        }
        let Some(variable) = sheet.cell(r, variable_col).as_text() else {
            tracing::warn!("Skipping condition map row {} without a variable name", r + 1);
            continue;
        };
        let Some(row_label) = sheet.cell(r, row_col).as_text() else {
            return Err(DknError::ConditionMapError {
                message: format!("Row {} ('{}') has no plate row letter", r + 1, variable),
            });
        };

        variables.insert(variable.clone());
        for &(n, idx) in &plate_cols {
            let well = format!("{}{}", row_label, n);
            if !wells.contains(&well) {
                wells.push(well.clone());
            }
            let value = sheet
                .cell(r, idx)
                .as_text()
                .map(Value::text)
                .unwrap_or_default();
            if cells.insert((well.clone(), variable.clone()), value).is_some() {
                return Err(DknError::ConditionMapError {
                    message: format!("'{}' is given more than once for well {}", variable, well),
                });
            }
        }
    }

    wells.sort_by_key(|w| well_sort_key(w));

    let mut columns = vec![WELL.to_string()];
    columns.extend(variables.iter().cloned());
    let mut table = Table::new(columns)?;
    for well in wells {
        let mut row = vec![Value::text(well.clone())];
        for variable in &variables {
            row.push(
                cells
                    .remove(&(well.clone(), variable.clone()))
                    .unwrap_or_default(),
            );
        }
        table.push_row(row)?;
    }
    Ok(table)
}

/// 依分隔符號拆成名稱與濃度 (只拆第一個)
fn split_descriptor(value: &Value, delimiter: &str) -> (Value, Option<Value>) {
    match value {
        Value::Missing => (Value::Missing, None),
        other => {
            let text = other.to_string();
            match text.split_once(delimiter) {
                Some((name, concentration)) => (
                    Value::text(name.trim()),
                    Some(Value::text(concentration.trim())),
                ),
                None => (Value::text(text.trim()), None),
            }
        }
    }
}

fn split_column(table: &Table, column: &str, delimiter: &str) -> Result<(Vec<Value>, Option<Vec<Value>>)> {
    let parts: Vec<(Value, Option<Value>)> = table
        .column(column)?
        .map(|v| split_descriptor(v, delimiter))
        .collect();

    let has_concentration = parts.iter().any(|(_, c)| c.is_some());
    let names = parts.iter().map(|(n, _)| n.clone()).collect();
    let concentrations = has_concentration.then(|| {
        parts
            .into_iter()
            .map(|(_, c)| c.unwrap_or_default())
            .collect()
    });
    Ok((names, concentrations))
}

fn to_number(value: Value, what: &str, well: &Value) -> Result<Value> {
    match value {
        Value::Missing => Ok(Value::Missing),
        other => other
            .as_f64()
            .map(Value::Number)
            .ok_or_else(|| DknError::ConditionMapError {
                message: format!("{} '{}' in well {} is not a number", what, other, well),
            }),
    }
}

fn split_descriptors(mut table: Table, options: &ConditionMapOptions) -> Result<Table> {
    let labels = options.instrument.labels();
    let wells: Vec<Value> = table.column(WELL)?.cloned().collect();

    // 培養基欄
    let (media, media_conc) = split_column(&table, MEDIUM_VARIABLE, &options.delimiter)?;
    table.with_column(labels.medium, media)?;
    if let Some(concentrations) = media_conc {
        let concentrations = if labels.numeric_medium_concentration {
            concentrations
                .into_iter()
                .zip(&wells)
                .map(|(c, well)| to_number(c, "Medium concentration", well))
                .collect::<Result<Vec<_>>>()?
        } else {
            concentrations
        };
        table.with_column(labels.medium_concentration, concentrations)?;
    }
    table.drop_columns(&[MEDIUM_VARIABLE])?;

    // 條件欄
    let (conditions, condition_conc) =
        split_column(&table, CONDITION_VARIABLE, &options.delimiter)?;
    table.with_column(labels.condition, conditions.clone())?;

    if let Some(concentrations) = condition_conc {
        table.with_column(labels.condition_concentration, concentrations.clone())?;

        if options.verbose {
            for (name, values) in expand_verbose(&conditions, &concentrations, &wells)? {
                table.with_column(&name, values)?;
            }
            table.drop_columns(&[labels.condition, labels.condition_concentration])?;
        }
    }
    table.drop_columns(&[CONDITION_VARIABLE])?;

    Ok(table)
}

/// 將 "PI, PYO, PCA; 5, 0, 0" 展開成每種添加物一個濃度欄
fn expand_verbose(
    conditions: &[Value],
    concentrations: &[Value],
    wells: &[Value],
) -> Result<Vec<(String, Vec<Value>)>> {
    let mut distinct: Vec<String> = Vec::new();
    for condition in conditions.iter().filter(|c| !c.is_missing()) {
        let name = condition.to_string();
        if !distinct.contains(&name) {
            distinct.push(name);
        }
    }

    if distinct.len() > 1 {
        return Err(DknError::ConditionMapError {
            message: format!(
                "Legend is not verbose; ensure all condition descriptors left of the delimiter are typed exactly the same in every well. Found the following different names: {:?}",
                distinct
            ),
        });
    }
    let Some(descriptor) = distinct.first() else {
        return Err(DknError::ConditionMapError {
            message: "Legend is verbose but no condition names were given".to_string(),
        });
    };

    let names: Vec<String> = descriptor.split(',').map(|n| n.trim().to_string()).collect();

    let split_concs: Vec<Vec<String>> = concentrations
        .iter()
        .map(|c| match c {
            Value::Missing => Vec::new(),
            other => other.to_string().split(',').map(|s| s.trim().to_string()).collect(),
        })
        .collect();
    let width = split_concs.iter().map(Vec::len).max().unwrap_or(0);

    if names.len() != width {
        return Err(DknError::ConditionMapError {
            message: format!(
                "Legend is not verbose; ensure the same number of condition concentrations are right of the delimiter in every well. Supplied {} condition names but {} condition concentrations.",
                names.len(),
                width
            ),
        });
    }

    names
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let label = format!("{} Conc. (µM)", name);
            let values = split_concs
                .iter()
                .zip(wells)
                .map(|(parts, well)| {
                    let raw = parts.get(i).map(String::as_str).unwrap_or("");
                    to_number(Value::text(raw), &label, well)
                })
                .collect::<Result<Vec<_>>>()?;
            Ok((label, values))
        })
        .collect()
}
