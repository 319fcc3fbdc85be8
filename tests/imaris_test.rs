use dknlab_tools::config::{ImarisJob, OutputConfig};
use dknlab_tools::{run_job, JobSpec, LocalStorage, Table};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn statistics(title: &str, header: &str, rows: &[String]) -> String {
    let mut text = format!("{}\n==================\n{}\n", title, header);
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// 建立一個 Imaris 影像資料夾，每個物件一列
fn write_image(dir: &Path, image: &str, z: &[f64]) -> anyhow::Result<()> {
    let folder = dir.join(format!("{}_Combined_Statistics", image));
    fs::create_dir_all(&folder)?;

    let position: Vec<String> = z
        .iter()
        .enumerate()
        .map(|(id, z)| format!("10.5,20.5,{},um,Spot,Position,1,{},", z, id))
        .collect();
    let volume: Vec<String> = z
        .iter()
        .enumerate()
        .map(|(id, z)| format!("{},um^3,Spot,1,{},", z * 3.0, id))
        .collect();
    let intensity = |scale: f64, channel: u32| -> Vec<String> {
        z.iter()
            .enumerate()
            .map(|(id, z)| format!("{},,Spot,{},1,1,{},", z * scale, channel, id))
            .collect()
    };

    fs::write(
        folder.join(format!("{}_Position.csv", image)),
        statistics(
            "Position",
            "Position X,Position Y,Position Z,Unit,Category,Collection,Time,ID,",
            &position,
        ),
    )?;
    fs::write(
        folder.join(format!("{}_Volume.csv", image)),
        statistics("Volume", "Volume,Unit,Category,Time,ID,", &volume),
    )?;
    fs::write(
        folder.join(format!("{}_Intensity_Mean_Ch=2_Img=1.csv", image)),
        statistics(
            "Intensity Mean",
            "Intensity Mean,Unit,Category,Channel,Image,Time,ID,",
            &intensity(100.0, 2),
        ),
    )?;
    fs::write(
        folder.join(format!("{}_Intensity_Mean_Ch=1_Img=1.csv", image)),
        statistics(
            "Intensity Mean",
            "Intensity Mean,Unit,Category,Channel,Image,Time,ID,",
            &intensity(500.0, 1),
        ),
    )?;
    Ok(())
}

#[tokio::test]
async fn test_aggregate_image_folders() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    let biofilm = dir.path().join("biofilm");
    write_image(&biofilm, "day2", &[1.5])?;
    write_image(&biofilm, "day1", &[0.5, 1.0])?;
    fs::write(biofilm.join("README.txt"), "not an image")?;

    let job = ImarisJob {
        folder: "biofilm".to_string(),
        single_image: false,
        output: OutputConfig {
            output_path: "results".to_string(),
            ..OutputConfig::default()
        },
    };
    run_job(LocalStorage::new(dir.path()), JobSpec::Imaris(job), false).await?;

    let table = Table::from_delimited(
        &fs::read(dir.path().join("results/SYTO9_PI_statistics.csv"))?,
        b',',
    )?;
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
    assert_eq!(table.len(), 3);

    let files: Vec<String> = table
        .column("File")?
        .map(|v| v.to_string())
        .collect();
    assert_eq!(files, vec!["day1", "day1", "day2"]);
    assert_eq!(table.rows()[1][2].to_string(), "100");
    Ok(())
}

#[tokio::test]
async fn test_single_image_mode() -> anyhow::Result<()> {
    let dir = TempDir::new()?;
    write_image(dir.path(), "tile7", &[2.0, 4.0])?;

    let job = ImarisJob {
        folder: "tile7_Combined_Statistics".to_string(),
        single_image: true,
        output: OutputConfig {
            output_path: "results".to_string(),
            ..OutputConfig::default()
        },
    };
    run_job(LocalStorage::new(dir.path()), JobSpec::Imaris(job), false).await?;

    let csv = fs::read_to_string(dir.path().join("results/SYTO9_PI_statistics.csv"))?;
    assert!(csv.contains("4,12,400,2000,1,tile7"));
    Ok(())
}
