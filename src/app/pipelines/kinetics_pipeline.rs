use crate::adapters::sheet::load_table;
use crate::app::output::{file_stem, write_outputs};
use crate::config::KineticsJob;
use crate::core::kinetics::{analyze, KineticsParams};
use crate::core::viz::plot_kinetics;
use crate::core::{Figure, NamedTable, Pipeline, Storage, TransformResult};
use crate::domain::table::Table;
use crate::utils::error::Result;

pub struct KineticsPipeline<S: Storage> {
    storage: S,
    job: KineticsJob,
}

impl<S: Storage> KineticsPipeline<S> {
    pub fn new(storage: S, job: KineticsJob) -> Self {
        Self { storage, job }
    }

    fn params(&self) -> KineticsParams {
        KineticsParams {
            ex_coeff: self.job.ex_coeff,
            substrate_column: self.job.substrate.clone(),
            slope_column: self.job.slope_column.clone(),
            protein_concentration: self.job.protein_concentration,
            protein_name: self.job.protein_name.clone(),
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for KineticsPipeline<S> {
    type Raw = Table;

    fn name(&self) -> &str {
        "kinetics"
    }

    async fn extract(&self) -> Result<Table> {
        load_table(&self.storage, &self.job.data).await
    }

    async fn transform(&self, raw: Table) -> Result<TransformResult> {
        let (rates, result) = analyze(&raw, &self.params())?;
        tracing::info!("{}: {}", result.protein_name, result.label);
        tracing::debug!(
            "Fit converged after {} iterations, SSR {:.3e}",
            result.fit.iterations,
            result.fit.sum_squared_residuals
        );

        let stem = file_stem(&self.job.protein_name);
        let spec = plot_kinetics(&rates, &self.job.substrate, &result)?;
        Ok(TransformResult {
            tables: vec![NamedTable::new(format!("{}_rates", stem), rates)],
            figures: vec![Figure {
                name: format!("{}_michaelis_menten", stem),
                spec,
            }],
            summary: serde_json::to_value(&result)?,
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
    use crate::core::etl::EtlEngine;
    use crate::core::kinetics::{michaelis_menten, RATE_COLUMN};
    use crate::utils::error::DknError;

    fn job() -> KineticsJob {
        KineticsJob {
            data: "rates.csv".to_string(),
            ex_coeff: 4100.0,
            substrate: "PYO".to_string(),
            slope_column: "slope".to_string(),
            protein_concentration: 0.5,
            protein_name: "PodA".to_string(),
            output: OutputConfig {
                output_path: "out".to_string(),
                ..OutputConfig::default()
            },
        }
    }

    fn rates_csv() -> String {
        let mut text = String::from("PYO,slope\n");
        for s in [1.0, 5.0, 10.0, 25.0, 50.0, 100.0] {
            // v (µM/s) 轉回每分鐘吸光度
            let slope = michaelis_menten(s, 2.0, 10.0) * 4100.0 * 60.0 / 1e6;
            text.push_str(&format!("{},{}\n", s, slope));
        }
        text
    }

    #[tokio::test]
    async fn test_kinetics_outputs() {
        let storage = MockStorage::new();
        storage.insert("rates.csv", rates_csv()).await;

        let engine = EtlEngine::new(KineticsPipeline::new(storage.clone(), job()));
        engine.run().await.unwrap();

        let csv = String::from_utf8(storage.get("out/PodA_rates.csv").await.unwrap()).unwrap();
        assert!(csv.starts_with(&format!("PYO,slope,{}", RATE_COLUMN)));
        assert!(storage.get("out/PodA_michaelis_menten.html").await.is_some());

        let manifest: serde_json::Value =
            serde_json::from_slice(&storage.get("out/manifest.json").await.unwrap()).unwrap();
        let km = manifest["summary"]["fit"]["km"].as_f64().unwrap();
        assert!((km - 10.0).abs() < 1e-3);
        assert_eq!(manifest["summary"]["n_points"], 6);
    }

    #[tokio::test]
    async fn test_missing_slope_column() {
        let storage = MockStorage::new();
        storage.insert("rates.csv", "PYO,rate\n1,0.1\n").await;

        let pipeline = KineticsPipeline::new(storage, job());
        let raw = pipeline.extract().await.unwrap();
        assert!(matches!(
            pipeline.transform(raw).await,
            Err(DknError::MissingColumnError { .. })
        ));
    }
}
