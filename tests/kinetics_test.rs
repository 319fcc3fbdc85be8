use dknlab_tools::config::{KineticsJob, OutputConfig};
use dknlab_tools::core::kinetics::michaelis_menten;
use dknlab_tools::{run_job, DknError, JobSpec, LocalStorage};
use std::fs;
use tempfile::TempDir;

const EX_COEFF: f64 = 4100.0;

/// 由已知參數產生 SpectraMax 斜率 (每分鐘吸光度)
fn slopes_csv(vmax: f64, km: f64, noise: &[f64]) -> String {
    let substrate = [0.5, 1.0, 2.5, 5.0, 10.0, 25.0, 50.0, 100.0];
    let mut text = String::from("Sample,PYO,Slope (mOD/min)\n");
    for (i, (&s, e)) in substrate.iter().zip(noise.iter().cycle()).enumerate() {
        let rate = michaelis_menten(s, vmax, km) * (1.0 + e);
        let slope = rate * EX_COEFF * 60.0 / 1e6;
        text.push_str(&format!("S{},{},{}\n", i + 1, s, slope));
    }
    text
}

fn job(output: &str) -> KineticsJob {
    KineticsJob {
        data: "slopes.csv".to_string(),
        ex_coeff: EX_COEFF,
        substrate: "PYO".to_string(),
        slope_column: "Slope (mOD/min)".to_string(),
        protein_concentration: 0.05,
        protein_name: "PodA".to_string(),
        output: OutputConfig {
            output_path: output.to_string(),
            output_formats: vec!["csv".to_string(), "json".to_string()],
            bundle: None,
        },
    }
}

#[tokio::test]
async fn test_michaelis_menten_fit_end_to_end() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("slopes.csv"),
        slopes_csv(0.8, 12.0, &[0.005, -0.005, 0.004, -0.003]),
    )?;

    run_job(LocalStorage::new(dir.path()), JobSpec::Kinetics(job("fit")), false).await?;

    let out = dir.path().join("fit");
    let manifest: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("manifest.json"))?)?;
    let summary = &manifest["summary"];

    let vmax = summary["fit"]["vmax"].as_f64().unwrap();
    let km = summary["fit"]["km"].as_f64().unwrap();
    assert!((vmax - 0.8).abs() < 0.05, "vmax {}", vmax);
    assert!((km - 12.0).abs() < 1.5, "km {}", km);

    let kcat = summary["kcat"].as_f64().unwrap();
    assert!((kcat - vmax / 0.05).abs() < 1e-9);
    assert!(summary["label"].as_str().unwrap().starts_with("Km = "));

    let records: serde_json::Value = serde_json::from_slice(&fs::read(out.join("PodA_rates.json"))?)?;
    assert_eq!(records.as_array().unwrap().len(), 8);
    assert!(records[0]["Vmax_(uM_s-1)"].as_f64().unwrap() > 0.0);

    let spec: serde_json::Value =
        serde_json::from_slice(&fs::read(out.join("PodA_michaelis_menten.vl.json"))?)?;
    assert_eq!(spec["title"]["text"], "PodA");
    assert_eq!(spec["title"]["subtitle"], summary["label"]);
    Ok(())
}

#[tokio::test]
async fn test_too_few_points_is_a_fit_error() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(
        dir.path().join("slopes.csv"),
        "PYO,Slope (mOD/min)\n1,0.01\n2,0.02\n",
    )?;

    let err = run_job(LocalStorage::new(dir.path()), JobSpec::Kinetics(job("fit")), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DknError::FitError { .. }));
    assert_eq!(err.exit_code(), 2);
    assert!(!dir.path().join("fit").exists());
    Ok(())
}
