//! Imaris SYTO-9 / propidium iodide statistics.
//!
//! Each image has a `<image>_Combined_Statistics` folder of CSV exports. Four
//! of them are combined per image, by row position, and all images are
//! stacked into one table.

use crate::adapters::sheet::{parse_delimited, sheet_to_table};
use crate::domain::model::Value;
use crate::domain::table::Table;
use crate::utils::error::{DknError, Result};

pub const FOLDER_SUFFIX: &str = "_Combined_Statistics";
pub const FILE_COLUMN: &str = "File";

/// Imaris CSV 前兩列為說明，第三列為表頭
const PREAMBLE_ROWS: usize = 2;

/// 一種統計檔案：檔名樣式、保留欄位與新欄名
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsFile {
    pub pattern: &'static str,
    pub columns: &'static [(&'static str, &'static str)],
}

pub const POSITION: StatisticsFile = StatisticsFile {
    pattern: "*Position.csv",
    columns: &[("Position Z", "Position Z (µm)")],
};

pub const VOLUME: StatisticsFile = StatisticsFile {
    pattern: "*Volume.csv",
    columns: &[("Volume", "Volume (µm^3)")],
};

pub const PI_INTENSITY: StatisticsFile = StatisticsFile {
    pattern: "*Intensity_Mean_Ch=2_Img=1.csv",
    columns: &[("Intensity Mean", "PI Intensity (AU)")],
};

pub const SYTO9_INTENSITY: StatisticsFile = StatisticsFile {
    pattern: "*Intensity_Mean_Ch=1_Img=1.csv",
    columns: &[("Intensity Mean", "SYTO-9 Intensity (AU)"), ("ID", "ID")],
};

pub const STATISTICS_FILES: [StatisticsFile; 4] = [POSITION, VOLUME, PI_INTENSITY, SYTO9_INTENSITY];

/// 單一影像的統計資料，順序同 [`STATISTICS_FILES`]
#[derive(Debug, Clone, PartialEq)]
pub struct ImageStatistics {
    pub label: String,
    pub tables: Vec<Table>,
}

/// 由資料夾名稱取得影像名稱
pub fn image_label(folder_name: &str) -> String {
    folder_name
        .split(FOLDER_SUFFIX)
        .next()
        .unwrap_or(folder_name)
        .to_string()
}

pub fn parse_statistics_csv(data: &[u8]) -> Result<Table> {
    let sheet = parse_delimited(data, b',')?;
    sheet_to_table(&sheet, PREAMBLE_ROWS)
}

fn select_renamed(table: &Table, file: &StatisticsFile, label: &str) -> Result<Table> {
    let sources: Vec<&str> = file.columns.iter().map(|(source, _)| *source).collect();
    let mut selected = table.select(&sources).map_err(|_| {
        DknError::missing_column(
            sources.join(", "),
            format!("{} of image '{}'", file.pattern, label),
        )
    })?;
    for (source, target) in file.columns {
        selected.rename(source, target)?;
    }
    Ok(selected)
}

/// 合併單一影像的四個統計檔並加上檔名欄
pub fn combine_image(image: &ImageStatistics) -> Result<Table> {
    if image.tables.len() != STATISTICS_FILES.len() {
        return Err(DknError::processing(format!(
            "Image '{}' has {} statistics tables, expected {}",
            image.label,
            image.tables.len(),
            STATISTICS_FILES.len()
        )));
    }

    let parts = image
        .tables
        .iter()
        .zip(STATISTICS_FILES.iter())
        .map(|(table, file)| select_renamed(table, file, &image.label))
        .collect::<Result<Vec<_>>>()?;

    let mut combined = Table::side_by_side(&parts)?;
    combined.fill_column(FILE_COLUMN, Value::text(image.label.clone()))?;
    Ok(combined)
}

pub fn aggregate(images: &[ImageStatistics]) -> Result<Table> {
    let combined = images.iter().map(combine_image).collect::<Result<Vec<_>>>()?;
    Ok(Table::concat(&combined))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csv(title: &str, header: &str, rows: &[&str]) -> Table {
        let mut text = format!("{}\n==================\n{}\n", title, header);
        for row in rows {
            text.push_str(row);
            text.push('\n');
        }
        parse_statistics_csv(text.as_bytes()).unwrap()
    }

    fn image(label: &str) -> ImageStatistics {
        ImageStatistics {
            label: label.to_string(),
            tables: vec![
                csv(
                    "Position",
                    "Position X,Position Y,Position Z,Unit,Category,Collection,Time,ID,",
                    &["1,2,3.5,um,Spot,Position,1,0,", "1,2,4.5,um,Spot,Position,1,1,"],
                ),
                csv("Volume", "Volume,Unit,Category,Time,ID,", &["10,um^3,Spot,1,0,", "11,um^3,Spot,1,1,"]),
                csv(
                    "Intensity Mean",
                    "Intensity Mean,Unit,Category,Channel,Image,Time,ID,",
                    &["100,,Spot,2,1,1,0,", "110,,Spot,2,1,1,1,"],
                ),
                csv(
                    "Intensity Mean",
                    "Intensity Mean,Unit,Category,Channel,Image,Time,ID,",
                    &["500,,Spot,1,1,1,0,"],
                ),
            ],
        }
    }

    #[test]
    fn test_image_label() {
        assert_eq!(image_label("biofilm_1_Combined_Statistics"), "biofilm_1");
        assert_eq!(image_label("plain"), "plain");
    }

    #[test]
    fn test_combine_image_columns_and_padding() {
        let table = combine_image(&image("img1")).unwrap();
        assert_eq!(
            table.columns(),
            &[
                "Position Z (µm)",
                "Volume (µm^3)",
                "PI Intensity (AU)",
                "SYTO-9 Intensity (AU)",
                "ID",
                "File"
            ]
        );
        assert_eq!(table.len(), 2);
        assert_eq!(table.value(1, "Position Z (µm)"), Some(&Value::Number(4.5)));
        assert_eq!(table.value(1, "SYTO-9 Intensity (AU)"), Some(&Value::Missing));
        assert_eq!(table.value(1, "File"), Some(&Value::text("img1")));
    }

    #[test]
    fn test_aggregate_stacks_images() {
        let table = aggregate(&[image("img1"), image("img2")]).unwrap();
        assert_eq!(table.len(), 4);
        assert_eq!(table.value(3, "File"), Some(&Value::text("img2")));
    }

    #[test]
    fn test_missing_column_reports_file() {
        let mut broken = image("img1");
        broken.tables[1] = csv("Volume", "Area,Unit", &["1,um^2"]);
        let err = combine_image(&broken).unwrap_err();
        assert!(err.to_string().contains("*Volume.csv"));
    }
}
