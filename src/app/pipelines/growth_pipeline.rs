use crate::adapters::sheet::load_sheet;
use crate::app::output::write_outputs;
use crate::config::GrowthJob;
use crate::core::condition_map::{parse_condition_map, ConditionMapOptions, Instrument, WELL};
use crate::core::growth::{attach_conditions, merge_measurements, Measurement, TIME_HR};
use crate::core::{biotek, tecan};
use crate::core::{NamedTable, Pipeline, Storage, TransformResult};
use crate::domain::model::Sheet;
use crate::utils::error::Result;

pub const MERGED_TABLE: &str = "growth_curves";
pub const CONDITIONS_TABLE: &str = "condition_map";

/// 讀入的原始匯出檔與條件表
pub struct GrowthInput {
    pub data: Sheet,
    pub condition_map: Option<Sheet>,
}

/// Tecan 或 BioTek 生長曲線管道
pub struct GrowthPipeline<S: Storage> {
    storage: S,
    job: GrowthJob,
    instrument: Instrument,
}

impl<S: Storage> GrowthPipeline<S> {
    pub fn new(storage: S, job: GrowthJob, instrument: Instrument) -> Self {
        Self {
            storage,
            job,
            instrument,
        }
    }

    fn wrangle(&self, sheet: &Sheet) -> Result<Vec<Measurement>> {
        match self.instrument {
            Instrument::Tecan => tecan::wrangle_growthcurves(sheet),
            Instrument::Biotek => biotek::wrangle_growthcurves(sheet),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for GrowthPipeline<S> {
    type Raw = GrowthInput;

    fn name(&self) -> &str {
        self.instrument.as_str()
    }

    async fn extract(&self) -> Result<GrowthInput> {
        let data = load_sheet(&self.storage, &self.job.data).await?;
        let condition_map = match &self.job.condition_map {
            Some(path) => Some(load_sheet(&self.storage, path).await?),
            None => None,
        };
        Ok(GrowthInput {
            data,
            condition_map,
        })
    }

    async fn transform(&self, raw: GrowthInput) -> Result<TransformResult> {
        let measurements = self.wrangle(&raw.data)?;
        let names: Vec<&str> = measurements.iter().map(|m| m.name.as_str()).collect();
        tracing::info!("Found {} measurement(s): {}", names.len(), names.join(", "));

        let mut summary = serde_json::json!({
            "instrument": self.instrument.as_str(),
            "measurements": names,
        });

        if self.job.separate {
            let tables = measurements
                .iter()
                .map(|m| NamedTable::new(m.name.clone(), m.table.clone()))
                .collect();
            return Ok(TransformResult {
                tables,
                figures: Vec::new(),
                summary,
            });
        }

        let merged = merge_measurements(&measurements)?;
        let mut tables = Vec::new();

        let data = match &raw.condition_map {
            Some(sheet) => {
                let options = ConditionMapOptions {
                    instrument: self.instrument,
                    delimiter: self.job.delimiter.clone(),
                    verbose: self.job.verbose_legend,
                };
                let conditions = parse_condition_map(sheet, &options)?;
                let joined = attach_conditions(&merged, &conditions)?;
                if joined.len() < merged.len() {
                    tracing::warn!(
                        "{} rows have no matching well in the condition map",
                        merged.len() - joined.len()
                    );
                }
                tables.push(NamedTable::new(CONDITIONS_TABLE, conditions));
                joined
            }
            None => merged,
        };

        summary["wells"] = data.unique(WELL)?.len().into();
        summary["time_points"] = data.unique(TIME_HR)?.len().into();
        summary["rows"] = data.len().into();

        tables.insert(0, NamedTable::new(MERGED_TABLE, data));
        Ok(TransformResult {
            tables,
            figures: Vec::new(),
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.job.output, self.name(), &result).await
    }
}
