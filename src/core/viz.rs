//! Chart specifications (Vega-Lite v5) for growth curves and kinetics fits.

use crate::core::growth::TIME_HR;
use crate::core::kinetics::{KineticsResult, RATE_COLUMN};
use crate::domain::model::Value;
use crate::domain::table::Table;
use crate::utils::error::{DknError, Result};
use serde_json::json;

pub const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

/// Category10 色盤
pub const CATEGORY10: [&str; 10] = [
    "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd", "#8c564b", "#e377c2", "#7f7f7f",
    "#bcbd22", "#17becf",
];

#[derive(Debug, Clone, PartialEq)]
pub struct GrowthPlotOptions {
    pub y: String,
    pub x: String,
    pub color_by: Option<String>,
    pub plot_by: Option<String>,
    pub palette: Option<Vec<String>>,
    pub width: u32,
    pub height: u32,
    /// 分面圖每列的子圖數
    pub columns: usize,
}

impl GrowthPlotOptions {
    pub fn new(y: impl Into<String>) -> Self {
        Self {
            y: y.into(),
            x: TIME_HR.to_string(),
            color_by: None,
            plot_by: None,
            palette: None,
            width: 600,
            height: 400,
            columns: 2,
        }
    }
}

/// Vega-Lite 欄位參照需跳脫 `.`、`[`、`]`
pub fn field_ref(column: &str) -> String {
    let mut escaped = String::with_capacity(column.len());
    for c in column.chars() {
        if matches!(c, '.' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn require_column(data: &Table, column: &str, option: &str) -> Result<()> {
    if data.has_column(column) {
        Ok(())
    } else {
        Err(DknError::InvalidConfigValueError {
            field: option.to_string(),
            value: column.to_string(),
            reason: "Column does not exist. Spelling must match the intended column name in the data"
                .to_string(),
        })
    }
}

/// 檢查色盤顏色數是否足夠，回傳實際使用的顏色
fn color_range(data: &Table, color_by: &str, palette: Option<&[String]>) -> Result<Vec<String>> {
    let categories = data.unique(color_by)?.len();
    let available: Vec<String> = match palette {
        Some(colors) => colors.to_vec(),
        None => CATEGORY10.iter().map(|c| c.to_string()).collect(),
    };

    if categories > available.len() {
        return Err(DknError::ValidationError {
            message: format!(
                "There are not enough colors in the palette to support the number of categories in {}. Please specify a palette with at least {} colors.",
                color_by, categories
            ),
        });
    }
    Ok(available.into_iter().take(categories.max(1)).collect())
}

pub fn plot_growthcurves(data: &Table, options: &GrowthPlotOptions) -> Result<serde_json::Value> {
    require_column(data, &options.x, "x")?;
    require_column(data, &options.y, "y")?;
    if let Some(color_by) = &options.color_by {
        require_column(data, color_by, "color_by")?;
    }
    if let Some(plot_by) = &options.plot_by {
        require_column(data, plot_by, "plot_by")?;
    }

    let mut sorted = data.clone();
    sorted.sort_by(&options.x)?;

    let mut encoding = json!({
        "x": {"field": field_ref(&options.x), "type": "quantitative", "title": options.x},
        "y": {"field": field_ref(&options.y), "type": "quantitative", "title": options.y},
    });

    if let Some(color_by) = &options.color_by {
        let range = color_range(&sorted, color_by, options.palette.as_deref())?;
        encoding["color"] = json!({
            "field": field_ref(color_by),
            "type": "nominal",
            "title": color_by,
            "scale": {"range": range},
            "legend": {"orient": "right", "offset": 10},
        });
    }

    let layer = json!({
        "width": options.width,
        "height": options.height,
        "mark": {"type": "line", "point": false},
        "encoding": encoding,
    });

    let data_values = json!({"values": sorted.to_records()});

    let spec = match &options.plot_by {
        None => {
            let mut spec = layer;
            spec["$schema"] = json!(VEGA_LITE_SCHEMA);
            spec["data"] = data_values;
            spec
        }
        Some(plot_by) => json!({
            "$schema": VEGA_LITE_SCHEMA,
            "data": data_values,
            "facet": {"field": field_ref(plot_by), "type": "nominal", "title": plot_by},
            "columns": options.columns.max(1),
            "spec": layer,
        }),
    };
    Ok(spec)
}

/// 動力學擬合圖：資料點與擬合曲線
pub fn plot_kinetics(
    rates: &Table,
    substrate_column: &str,
    result: &KineticsResult,
) -> Result<serde_json::Value> {
    require_column(rates, substrate_column, "substrate")?;

    let mut points = rates.select(&[substrate_column, RATE_COLUMN])?;
    points.sort_by(substrate_column)?;

    let mut curve = Table::new([substrate_column, RATE_COLUMN])?;
    for value in points.column(substrate_column)? {
        if let Some(s) = value.as_f64() {
            curve.push_row(vec![value.clone(), Value::from(result.fit.predict(s))])?;
        }
    }

    let x = json!({
        "field": field_ref(substrate_column),
        "type": "quantitative",
        "title": format!("{} concentration (µM)", substrate_column),
    });
    let y = json!({
        "field": field_ref(RATE_COLUMN),
        "type": "quantitative",
        "title": "Vmax (µM / s)",
    });

    Ok(json!({
        "$schema": VEGA_LITE_SCHEMA,
        "title": {
            "text": result.protein_name,
            "subtitle": result.label,
            "fontSize": 16,
            "anchor": "middle",
        },
        "width": 500,
        "height": 350,
        "layer": [
            {
                "data": {"values": points.to_records()},
                "mark": {
                    "type": "circle",
                    "size": 49,
                    "stroke": "black",
                    "strokeWidth": 1,
                    "fill": "pink",
                    "opacity": 1,
                },
                "encoding": {"x": x, "y": y},
            },
            {
                "data": {"values": curve.to_records()},
                "mark": {"type": "line", "color": "black", "strokeWidth": 1.5},
                "encoding": {"x": x, "y": y},
            },
        ],
    }))
}

/// 產生可直接開啟的 HTML 頁面
pub fn render_html(title: &str, spec: &serde_json::Value) -> Result<String> {
    // 避免 JSON 中的 "</script>" 提前結束 script 區塊
    let spec_json = serde_json::to_string(spec)?.replace("</", "<\\/");
    let title = title
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");

    Ok(format!(
        r##"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>{title}</title>
  <script src="https://cdn.jsdelivr.net/npm/vega@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-lite@5"></script>
  <script src="https://cdn.jsdelivr.net/npm/vega-embed@6"></script>
</head>
<body>
  <div id="vis"></div>
  <script type="text/javascript">
    vegaEmbed("#vis", {spec_json});
  </script>
</body>
</html>
"##
    ))
}
