mod gdal_raster;
mod mock;

pub use self::gdal_raster::{
    DATASET_PLACEHOLDER, DEFAULT_PATH_TEMPLATE, GdalRasterSource, GdalRasterSourceParameters,
};
pub use self::mock::MockRasterSource;

use crate::util::Result;
use h3o::Resolution;
use popgrid_datatypes::hexgrid::HexTable;
use popgrid_datatypes::primitives::BoundingBox2D;
use serde::{Deserialize, Serialize};

/// A raster dataset and the name of the column its values are written to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetColumn {
    /// Name of the raster dataset, used to resolve its location
    pub name: String,
    /// Name of the output column
    pub column: String,
}

impl DatasetColumn {
    pub fn new(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
        }
    }
}

/// The cells of one dataset within a bounding box.
#[derive(Clone, Debug, PartialEq)]
pub struct FetchedTable {
    pub dataset: String,
    pub table: HexTable,
}

impl FetchedTable {
    /// The resolution the raster was binned at
    pub fn conversion_resolution(&self) -> Resolution {
        self.table.resolution()
    }
}

/// Reads raster datasets as hexagon tables.
pub trait RasterSource {
    /// Bins the pixels of `dataset` within `bbox` into cells.
    ///
    /// The cells have the `pinned` resolution if one is given and a resolution matching the
    /// raster's pixel size otherwise. No raster coverage results in an empty table.
    fn fetch(
        &self,
        dataset: &DatasetColumn,
        bbox: BoundingBox2D,
        pinned: Option<Resolution>,
    ) -> Result<FetchedTable>;
}

impl<S: RasterSource + ?Sized> RasterSource for &S {
    fn fetch(
        &self,
        dataset: &DatasetColumn,
        bbox: BoundingBox2D,
        pinned: Option<Resolution>,
    ) -> Result<FetchedTable> {
        (**self).fetch(dataset, bbox, pinned)
    }
}
