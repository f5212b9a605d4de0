use crate::aoi::read_aoi;
use crate::config::{self, get_config_element};
use crate::error::{self, Result};
use clap::Parser;
use h3o::Resolution;
use popgrid_datatypes::hexgrid::ResolutionPlan;
use popgrid_operators::pipeline::{Conversion, ConversionSummary};
use popgrid_operators::sink::{TileWriter, TileWriterOptions};
use popgrid_operators::source::GdalRasterSource;
use snafu::ResultExt;
use std::path::PathBuf;
use tracing::info;

/// Converts population rasters within an area of interest into H3 hexagon tiles
#[derive(Debug, Parser)]
pub struct Convert {
    /// GeoJSON file with the area of interest
    aoi: PathBuf,

    /// Root directory of the written tiles
    out_dir: PathBuf,

    /// H3 resolution of the written cells
    #[arg(long, default_value_t = 10)]
    h3_res: u8,

    /// H3 resolution of the output tiles, capped at `h3-res`
    #[arg(long, default_value_t = 6)]
    group_h3_res: u8,

    /// Additionally write FlatGeobuf files
    #[arg(long)]
    fgb: bool,
}

fn resolution(resolution: u8) -> Result<Resolution> {
    Resolution::try_from(resolution).context(error::InvalidResolution { resolution })
}

pub fn convert(params: Convert) -> Result<ConversionSummary> {
    let plan = ResolutionPlan::new(resolution(params.h3_res)?, resolution(params.group_h3_res)?);

    let raster_source: config::RasterSource = get_config_element()?;
    let output: config::Output = get_config_element()?;
    let config::Datasets(datasets) = get_config_element()?;

    let aoi = read_aoi(&params.aoi)?;

    let source = GdalRasterSource::new(raster_source.into())?;
    let writer = TileWriter::new(
        &params.out_dir,
        plan,
        TileWriterOptions {
            vector_export: params.fgb,
            vector_layer_name: output.vector_layer_name,
        },
    );

    let summary = Conversion::new(source, datasets, plan, writer)?.run(&aoi)?;

    info!(
        "converted {} fetch tiles into {} files below {:?}",
        summary.fetch_tiles.len(),
        summary.files_written,
        params.out_dir
    );

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_parses_arguments() {
        let params = Convert::try_parse_from([
            "convert",
            "aoi.geojson",
            "out",
            "--h3-res",
            "8",
            "--fgb",
        ])
        .unwrap();

        assert_eq!(params.aoi, PathBuf::from("aoi.geojson"));
        assert_eq!(params.out_dir, PathBuf::from("out"));
        assert_eq!(params.h3_res, 8);
        assert_eq!(params.group_h3_res, 6);
        assert!(params.fgb);
    }

    #[test]
    fn it_rejects_invalid_resolutions_before_reading_the_aoi() {
        let params = Convert::try_parse_from([
            "convert",
            "/does/not/exist.geojson",
            "out",
            "--h3-res",
            "16",
        ])
        .unwrap();

        assert!(matches!(
            convert(params),
            Err(error::Error::InvalidResolution { resolution: 16, .. })
        ));
    }
}
