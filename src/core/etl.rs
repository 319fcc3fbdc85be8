use crate::core::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<String> {
        let name = self.pipeline.name();
        tracing::info!("🚀 Starting {} job", name);
        self.monitor.log_stats("Start");

        // Extract
        tracing::info!("📥 Extracting input data...");
        let raw = self.pipeline.extract().await?;
        self.monitor.log_stats("Extract");

        // Transform
        tracing::info!("🔄 Transforming data...");
        let result = self.pipeline.transform(raw).await?;
        tracing::info!(
            "Transformed {} records into {} table(s) and {} figure(s)",
            result.record_count(),
            result.tables.len(),
            result.figures.len()
        );
        self.monitor.log_stats("Transform");

        // Load
        tracing::info!("💾 Loading results...");
        let output_path = self.pipeline.load(result).await?;
        self.monitor.log_stats("Load");
        tracing::info!("📁 {} output saved to: {}", name, output_path);

        self.monitor.log_final_stats();
        Ok(output_path)
    }
}
