#![allow(clippy::unwrap_used)] // okay in tests

use assert_cmd::cargo::CommandCargoExt;
use gdal::DriverManager;
use gdal::raster::Buffer;
use h3o::{LatLng, Resolution};
use std::path::Path;
use std::process::Command;

fn write_geotiff(path: &Path, center: LatLng, value: f64) {
    const SIZE: usize = 100;
    const PIXEL_SIZE: f64 = 0.001;

    let driver = DriverManager::get_driver_by_name("GTiff").unwrap();
    let mut dataset = driver
        .create_with_band_type::<f64, _>(path, SIZE, SIZE, 1)
        .unwrap();

    let half_extent = PIXEL_SIZE * SIZE as f64 / 2.;
    dataset
        .set_geo_transform(&[
            center.lng() - half_extent,
            PIXEL_SIZE,
            0.,
            center.lat() + half_extent,
            0.,
            -PIXEL_SIZE,
        ])
        .unwrap();

    let mut buffer = Buffer::new((SIZE, SIZE), vec![value; SIZE * SIZE]);
    dataset
        .rasterband(1)
        .unwrap()
        .write((0, 0), (SIZE, SIZE), &mut buffer)
        .unwrap();
}

#[test]
fn it_prints_help() {
    let output = Command::cargo_bin("popgrid-cli")
        .unwrap()
        .args(["convert", "--help"])
        .output()
        .unwrap();

    assert!(output.status.success());

    let help = String::from_utf8(output.stdout).unwrap();
    assert!(help.contains("--h3-res"));
    assert!(help.contains("--group-h3-res"));
    assert!(help.contains("--fgb"));
}

#[test]
fn it_fails_on_invalid_resolutions() {
    let dir = tempfile::tempdir().unwrap();

    let output = Command::cargo_bin("popgrid-cli")
        .unwrap()
        .current_dir(dir.path())
        .args(["convert", "aoi.geojson", "out", "--h3-res", "16"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(1));

    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid H3 resolution 16"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn it_converts_an_area_of_interest() {
    let dir = tempfile::tempdir().unwrap();

    let tile = LatLng::new(50.0, 8.0).unwrap().to_cell(Resolution::Three);
    let center = LatLng::from(tile);
    write_geotiff(&dir.path().join("hrsl_general.tif"), center, 2.0);

    std::fs::write(
        dir.path().join("Settings.toml"),
        format!(
            r#"
[raster_source]
path_template = "{}/{{dataset}}.tif"

[[datasets]]
name = "hrsl_general"
column = "population"
"#,
            dir.path().display()
        ),
    )
    .unwrap();

    let (x, y) = (center.lng(), center.lat());
    let aoi = serde_json::json!({
        "type": "Feature",
        "properties": {},
        "geometry": {
            "type": "Polygon",
            "coordinates": [[
                [x - 0.01, y - 0.01],
                [x + 0.01, y - 0.01],
                [x + 0.01, y + 0.01],
                [x - 0.01, y + 0.01],
                [x - 0.01, y - 0.01]
            ]]
        }
    });
    std::fs::write(dir.path().join("aoi.geojson"), aoi.to_string()).unwrap();

    let output = Command::cargo_bin("popgrid-cli")
        .unwrap()
        .current_dir(dir.path())
        .env("POPGRID__LOGGING__LOG_SPEC", "warn")
        .args([
            "convert",
            "aoi.geojson",
            "out",
            "--h3-res",
            "8",
            "--group-h3-res",
            "6",
            "--fgb",
        ])
        .output()
        .unwrap();

    assert!(output.status.success(), "conversion failed: {output:?}");

    let files: Vec<String> = std::fs::read_dir(dir.path().join("out").join("6").join("8"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();

    assert_eq!(
        files.iter().filter(|file| file.ends_with(".arrow")).count(),
        343
    );
    assert!(files.iter().any(|file| file.ends_with(".fgb")));
    assert!(!files.iter().any(|file| file.contains("popgrid-tmp")));
}
