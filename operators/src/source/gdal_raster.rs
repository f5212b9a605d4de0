use super::{DatasetColumn, FetchedTable, RasterSource};
use crate::error;
use crate::util::gdal::gdal_open_dataset_ex;
use crate::util::{Result, TemporaryGdalThreadLocalConfigOptions};
use gdal::{DatasetOptions, GdalOpenFlags};
use h3o::Resolution;
use popgrid_datatypes::hexgrid::{BinningMode, HexBinner, nearest_resolution, pixel_area_m2};
use popgrid_datatypes::primitives::BoundingBox2D;
use popgrid_datatypes::raster::GeoTransform;
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, instrument};

/// Placeholder in path templates that is replaced by the dataset name
pub const DATASET_PLACEHOLDER: &str = "{dataset}";

pub const DEFAULT_PATH_TEMPLATE: &str =
    "/vsis3/dataforgood-fb-data/hrsl-cogs/{dataset}/{dataset}-latest.vrt";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GdalRasterSourceParameters {
    /// Location of a dataset, `{dataset}` is replaced by its name
    pub path_template: String,
    /// Set for the reading thread while a dataset is fetched
    pub gdal_config_options: Option<Vec<(String, String)>>,
    /// Maximum number of raster rows held in memory at once
    pub read_block_rows: usize,
    pub rasterband_channel: usize,
}

impl Default for GdalRasterSourceParameters {
    fn default() -> Self {
        Self {
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            gdal_config_options: Some(vec![(
                "AWS_NO_SIGN_REQUEST".to_string(),
                "YES".to_string(),
            )]),
            read_block_rows: 1024,
            rasterband_channel: 1,
        }
    }
}

/// Reads population rasters with GDAL and bins their pixels into cells.
#[derive(Clone, Debug)]
pub struct GdalRasterSource {
    params: GdalRasterSourceParameters,
}

impl GdalRasterSource {
    pub fn new(params: GdalRasterSourceParameters) -> Result<Self> {
        ensure!(
            params.path_template.contains(DATASET_PLACEHOLDER),
            error::InvalidPathTemplate {
                template: params.path_template.clone(),
                placeholder: DATASET_PLACEHOLDER,
            }
        );

        Ok(Self { params })
    }

    pub fn dataset_path(&self, dataset: &str) -> PathBuf {
        PathBuf::from(self.params.path_template.replace(DATASET_PLACEHOLDER, dataset))
    }
}

impl RasterSource for GdalRasterSource {
    #[instrument(skip_all, fields(dataset = %dataset.name, %bbox, ?pinned))]
    fn fetch(
        &self,
        dataset: &DatasetColumn,
        bbox: BoundingBox2D,
        pinned: Option<Resolution>,
    ) -> Result<FetchedTable> {
        let start = Instant::now();

        // reverts the thread local configs on drop
        let _thread_local_configs = self
            .params
            .gdal_config_options
            .as_deref()
            .map(TemporaryGdalThreadLocalConfigOptions::new)
            .transpose()?;

        let path = self.dataset_path(&dataset.name);
        let gdal_dataset = gdal_open_dataset_ex(
            &path,
            DatasetOptions {
                open_flags: GdalOpenFlags::GDAL_OF_RASTER,
                ..DatasetOptions::default()
            },
        )?;

        let geo_transform = GeoTransform::try_from(gdal_dataset.geo_transform()?)?;
        let rasterband = gdal_dataset.rasterband(self.params.rasterband_channel)?;

        let pixel_area = pixel_area_m2(&geo_transform, bbox.center());
        let resolution = pinned.unwrap_or_else(|| nearest_resolution(pixel_area));
        let mode = BinningMode::for_pixel_area(pixel_area, resolution);

        let mut binner = HexBinner::new(
            resolution,
            geo_transform,
            rasterband.no_data_value(),
            mode,
        );

        match geo_transform.read_window(bbox, gdal_dataset.raster_size()) {
            Some(window) => {
                debug!(
                    "reading window {:?} of {:?} at resolution {} ({:?})",
                    window, path, resolution, mode
                );

                for block in window.row_blocks(self.params.read_block_rows) {
                    let buffer = rasterband.read_as::<f64>(
                        block.gdal_window_start(), // pixelspace origin
                        block.gdal_window_size(),  // pixelspace size
                        block.gdal_window_size(),  // requested raster size
                        None,                      // sampling mode
                    )?;
                    binner.add_block(&block, buffer.data())?;
                }
            }
            None => debug!("{:?} does not cover {}", path, bbox),
        }

        let table = binner.finish(&dataset.column)?;

        debug!(
            "fetched {} cells at resolution {}, took {:?}",
            table.len(),
            resolution,
            start.elapsed()
        );

        Ok(FetchedTable {
            dataset: dataset.name.clone(),
            table,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_resolves_dataset_paths() {
        let source = GdalRasterSource::new(GdalRasterSourceParameters::default()).unwrap();

        assert_eq!(
            source.dataset_path("hrsl_general"),
            PathBuf::from("/vsis3/dataforgood-fb-data/hrsl-cogs/hrsl_general/hrsl_general-latest.vrt")
        );
    }

    #[test]
    fn it_requires_the_placeholder() {
        let result = GdalRasterSource::new(GdalRasterSourceParameters {
            path_template: "/data/population.tif".to_string(),
            ..GdalRasterSourceParameters::default()
        });

        assert!(matches!(
            result,
            Err(error::Error::InvalidPathTemplate { .. })
        ));
    }
}
