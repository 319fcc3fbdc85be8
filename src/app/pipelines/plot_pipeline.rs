use crate::adapters::sheet::load_table;
use crate::app::output::write_outputs;
use crate::config::PlotJob;
use crate::core::viz::{plot_growthcurves, GrowthPlotOptions};
use crate::core::{Figure, Pipeline, Storage, TransformResult};
use crate::domain::table::Table;
use crate::utils::error::Result;

pub struct PlotPipeline<S: Storage> {
    storage: S,
    job: PlotJob,
}

impl<S: Storage> PlotPipeline<S> {
    pub fn new(storage: S, job: PlotJob) -> Self {
        Self { storage, job }
    }

    fn options(&self) -> GrowthPlotOptions {
        GrowthPlotOptions {
            x: self.job.x.clone(),
            color_by: self.job.color_by.clone(),
            plot_by: self.job.plot_by.clone(),
            palette: self.job.palette.clone(),
            width: self.job.width,
            height: self.job.height,
            ..GrowthPlotOptions::new(self.job.y.clone())
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage> Pipeline for PlotPipeline<S> {
    type Raw = Table;

    fn name(&self) -> &str {
        "plot"
    }

    async fn extract(&self) -> Result<Table> {
        load_table(&self.storage, &self.job.data).await
    }

    async fn transform(&self, raw: Table) -> Result<TransformResult> {
        let spec = plot_growthcurves(&raw, &self.options())?;
        let summary = serde_json::json!({
            "rows": raw.len(),
            "x": self.job.x,
            "y": self.job.y,
            "color_by": self.job.color_by,
            "plot_by": self.job.plot_by,
        });
        Ok(TransformResult {
            tables: Vec::new(),
            figures: vec![Figure {
                name: self.job.name.clone(),
                spec,
            }],
            summary,
        })
    }

    async fn load(&self, result: TransformResult) -> Result<String> {
        write_outputs(&self.storage, &self.job.output, self.name(), &result).await
    }
}
