use dknlab_tools::utils::validation::Validate;
use dknlab_tools::{run_all, JobSpec, LocalStorage, RunConfig};
use std::fs;
use tempfile::TempDir;

const TECAN_EXPORT: &str = "\
OD600,,,
Cycle Nr.,Time [s],A1,A2
1,0,0.10,0.11
2,1800,0.14,0.12
3,3600,0.22,0.13
,,,
End Time,,,
";

const CONDITION_MAP: &str = "\
variable,row,1,2,3,4,5,6,7,8,9,10,11,12
Medium; Concentration (mM),A,LB; 10,LB; 10,,,,,,,,,,
Condition; Concentration (µM),A,PYO; 100,PYO; 0,,,,,,,,,,
Strain,A,WT,dphz,,,,,,,,,,
";

const RUN_FILE: &str = r#"
[run]
name = "pyo-screen"
description = "Growth with PYO"

[global]
monitoring = false

[[jobs]]
kind = "tecan"
data = "${DKNLAB_IT_PLATE}"
condition_map = "condmap.csv"
output_path = "tidy"

[[jobs]]
kind = "condmap"
file = "condmap.csv"
output_path = "conditions"
output_formats = ["json"]

[[jobs]]
kind = "plot"
data = "tidy/growth_curves.csv"
y = "OD600"
color_by = "Strain"
plot_by = "Condition"
name = "od600"
output_path = "plots"
bundle = "plots.zip"
"#;

#[tokio::test]
async fn test_run_file_executes_jobs_in_order() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("plate.csv"), TECAN_EXPORT)?;
    fs::write(dir.path().join("condmap.csv"), CONDITION_MAP)?;
    fs::write(dir.path().join("dknlab.toml"), RUN_FILE)?;

    std::env::set_var("DKNLAB_IT_PLATE", "plate.csv");
    let config = RunConfig::from_file(dir.path().join("dknlab.toml"))?;
    std::env::remove_var("DKNLAB_IT_PLATE");

    config.validate()?;
    assert!(!config.monitoring_enabled());
    assert!(matches!(config.jobs[0], JobSpec::Tecan(_)));

    let outputs = run_all(LocalStorage::new(dir.path()), config.jobs, false).await?;
    assert_eq!(outputs, vec!["tidy", "conditions", "plots/plots.zip"]);

    assert!(dir.path().join("tidy/growth_curves.csv").exists());
    assert!(dir.path().join("conditions/condition_map.json").exists());
    assert!(dir.path().join("plots/od600.html").exists());
    assert!(dir.path().join("plots/plots.zip").exists());

    let spec: serde_json::Value =
        serde_json::from_slice(&fs::read(dir.path().join("plots/od600.vl.json"))?)?;
    assert_eq!(spec["facet"]["field"], "Condition");
    assert_eq!(spec["spec"]["encoding"]["color"]["field"], "Strain");
    assert_eq!(spec["data"]["values"].as_array().unwrap().len(), 6);
    Ok(())
}

#[test]
fn test_invalid_run_file_fails_validation() -> anyhow::Result<()> {
    let config = RunConfig::from_toml_str(
        r#"
[run]
name = "bad"

[[jobs]]
kind = "kinetics"
data = "rates.csv"
ex_coeff = -4100
substrate = "PYO"
slope_column = "slope"
protein_concentration = 0.5
protein_name = "PodA"
"#,
    )?;
    assert!(config.validate().is_err());
    Ok(())
}
