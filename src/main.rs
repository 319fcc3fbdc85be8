use clap::Parser;
use dknlab_tools::config::Command;
use dknlab_tools::utils::error::DknError;
use dknlab_tools::utils::{logger, validation::Validate};
use dknlab_tools::{run_all, run_job, CliConfig, LocalStorage, RunConfig};
use std::path::Path;

fn report_failure(e: &DknError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ dknlab failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    std::process::exit(e.exit_code());
}

/// 執行批次設定檔；回傳各工作的輸出位置
async fn run_config_file(
    workdir: &str,
    config_path: &str,
    dry_run: bool,
    monitor: bool,
) -> Result<Vec<String>, DknError> {
    let path = Path::new(workdir).join(config_path);
    let run = RunConfig::from_file(&path)?;
    run.validate()?;

    tracing::info!(
        "📋 Run '{}' with {} job(s){}",
        run.run.name,
        run.jobs.len(),
        if run.run.description.is_empty() {
            String::new()
        } else {
            format!(": {}", run.run.description)
        }
    );

    if dry_run {
        for (i, job) in run.jobs.iter().enumerate() {
            println!("{}. {} -> {}", i + 1, job.kind(), job.output().output_path);
        }
        return Ok(Vec::new());
    }

    // 設定檔內的工作目錄相對於 --workdir
    let base = match run.working_directory() {
        Some(dir) => Path::new(workdir).join(dir),
        None => Path::new(workdir).to_path_buf(),
    };
    let monitor = monitor || run.monitoring_enabled();
    run_all(LocalStorage::new(base), run.jobs, monitor).await
}

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    logger::init_logger(config.verbose, config.json_logs);

    tracing::info!("Starting dknlab CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        report_failure(&e);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    let outcome = match &config.command {
        Command::Run { config: file, dry_run } => {
            run_config_file(&config.workdir, file, *dry_run, config.monitor).await
        }
        command => match command.job() {
            Some(job) => run_job(LocalStorage::new(&config.workdir), job, config.monitor)
                .await
                .map(|path| vec![path]),
            None => Ok(Vec::new()),
        },
    };

    match outcome {
        Ok(paths) => {
            tracing::info!("✅ dknlab completed successfully!");
            for path in paths {
                println!("📁 Output saved to: {}", path);
            }
        }
        Err(e) => report_failure(&e),
    }
}
