use crate::app::pipelines::{
    ConditionMapPipeline, GrowthPipeline, ImarisPipeline, KineticsPipeline, PlotPipeline,
};
use crate::config::JobSpec;
use crate::core::condition_map::Instrument;
use crate::core::etl::EtlEngine;
use crate::core::{Pipeline, Storage};
use crate::utils::error::Result;

async fn run_pipeline<P: Pipeline>(pipeline: P, monitor: bool) -> Result<String> {
    EtlEngine::new_with_monitoring(pipeline, monitor).run().await
}

/// 依工作種類建立對應的管道並執行
pub async fn run_job<S: Storage>(storage: S, job: JobSpec, monitor: bool) -> Result<String> {
    match job {
        JobSpec::Tecan(job) => {
            run_pipeline(GrowthPipeline::new(storage, job, Instrument::Tecan), monitor).await
        }
        JobSpec::Biotek(job) => {
            run_pipeline(GrowthPipeline::new(storage, job, Instrument::Biotek), monitor).await
        }
        JobSpec::Condmap(job) => run_pipeline(ConditionMapPipeline::new(storage, job), monitor).await,
        JobSpec::Kinetics(job) => run_pipeline(KineticsPipeline::new(storage, job), monitor).await,
        JobSpec::Imaris(job) => run_pipeline(ImarisPipeline::new(storage, job), monitor).await,
        JobSpec::Plot(job) => run_pipeline(PlotPipeline::new(storage, job), monitor).await,
    }
}

/// 依序執行所有工作，遇到錯誤即停止
pub async fn run_all<S: Storage + Clone>(
    storage: S,
    jobs: Vec<JobSpec>,
    monitor: bool,
) -> Result<Vec<String>> {
    let total = jobs.len();
    let mut outputs = Vec::with_capacity(total);

    for (i, job) in jobs.into_iter().enumerate() {
        let kind = job.kind();
        tracing::info!("▶️  Job {}/{} ({})", i + 1, total, kind);
        match run_job(storage.clone(), job, monitor).await {
            Ok(path) => outputs.push(path),
            Err(e) => {
                tracing::error!("❌ Job {}/{} ({}) failed: {}", i + 1, total, kind, e);
                return Err(e);
            }
        }
    }
    Ok(outputs)
}
