use crate::adapters::sheet::load_sheet;
use crate::app::output::write_outputs;
use crate::config::ConditionMapJob;
use crate::core::condition_map::{parse_condition_map, ConditionMapOptions};
use crate::core::{NamedTable, Pipeline, Storage, TransformResult};
use crate::domain::model::Sheet;
use crate::utils::error::Result;

pub struct ConditionMapPipeline<S: Storage> {
    storage: S,
    job: ConditionMapJob,
}

impl<S: Storage> ConditionMapPipeline<S> {
    pub fn new(storage: S, job: ConditionMapJob) -> Self {
        Self { storage, job }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for ConditionMapPipeline<S> {
    type Raw = Sheet;

    fn name(&self) -> &str {
        "condmap"
    }

    async fn extract(&self) -> Result<Sheet> {
        load_sheet(&self.storage, &self.job.file).await
    }

    async fn transform(&self, raw: Sheet) -> Result<TransformResult> {
        let options = ConditionMapOptions {
            instrument: self.job.instrument,
            delimiter: self.job.delimiter.clone(),
            verbose: self.job.verbose_legend,
        };
        let table = parse_condition_map(&raw, &options)?;
        tracing::info!(
            "Condition map has {} wells and {} columns",
            table.len(),
            table.width()
        );

        let summary = serde_json::json!({
            "instrument": self.job.instrument.as_str(),
            "wells": table.len(),
            "columns": table.columns(),
        });
        Ok(TransformResult {
            tables: vec![NamedTable::new("condition_map", table)],
            figures: Vec::new(),
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.job.output, self.name(), &result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipelines::tests::MockStorage;
    use crate::config::OutputConfig;
    use crate::core::condition_map::Instrument;
    use crate::core::etl::EtlEngine;

    fn template(rows: &[(&str, &str, &str)]) -> String {
        let mut text = String::from("variable,row,1,2,3,4,5,6,7,8,9,10,11,12\n");
        for (variable, row, first) in rows {
            text.push_str(&format!("{},{},\"{}\",,,,,,,,,,,\n", variable, row, first));
        }
        text
    }

    fn job(instrument: Instrument, verbose: bool) -> ConditionMapJob {
        ConditionMapJob {
            file: "condmap.csv".to_string(),
            instrument,
            delimiter: ";".to_string(),
            verbose_legend: verbose,
            output: OutputConfig {
                output_path: "out".to_string(),
                output_formats: vec!["json".to_string()],
                bundle: None,
            },
        }
    }

    #[tokio::test]
    async fn test_biotek_labels() {
        let storage = MockStorage::new();
        storage
            .insert(
                "condmap.csv",
                template(&[
                    ("Medium; Concentration (mM)", "B", "MOPS; 20"),
                    ("Condition; Concentration (µM)", "B", "PYO; 50"),
                ]),
            )
            .await;

        let pipeline = ConditionMapPipeline::new(storage, job(Instrument::Biotek, false));
        let raw = pipeline.extract().await.unwrap();
        let result = pipeline.transform(raw).await.unwrap();

        let table = &result.tables[0].table;
        assert_eq!(
            table.columns(),
            &["well", "medium", "[medium] (mM)", "condition", "[condition] (µM)"]
        );
        assert_eq!(table.len(), 12);
        assert_eq!(result.summary["wells"], 12);
    }

    #[tokio::test]
    async fn test_verbose_legend_writes_json() {
        let storage = MockStorage::new();
        storage
            .insert(
                "condmap.csv",
                template(&[
                    ("Medium; Concentration (mM)", "A", "LB"),
                    ("Condition; Concentration (µM)", "A", "PI, PYO; 5, 10"),
                ]),
            )
            .await;

        let engine = EtlEngine::new(ConditionMapPipeline::new(
            storage.clone(),
            job(Instrument::Tecan, true),
        ));
        engine.run().await.unwrap();

        let records: serde_json::Value =
            serde_json::from_slice(&storage.get("out/condition_map.json").await.unwrap()).unwrap();
        assert_eq!(records[0]["well"], "A1");
        assert_eq!(records[0]["PI Conc. (µM)"], 5.0);
        assert_eq!(records[0]["PYO Conc. (µM)"], 10.0);
        assert!(records[0].get("Condition").is_none());
    }
}
