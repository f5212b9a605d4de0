use geo::Coord;
use h3o::{CellIndex, Resolution};
use snafu::Snafu;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("Arrow internal error: {:?}", source))]
    ArrowInternal {
        source: arrow::error::ArrowError,
    },

    #[snafu(display("Column is reserved or already in use: {}", name))]
    ColumnNameConflict {
        name: String,
    },

    #[snafu(display("Column `{}` does not exist", name))]
    ColumnDoesNotExist {
        name: String,
    },

    #[snafu(display(
        "Column `{}` has {} values, but the table has {} cells",
        name,
        found,
        expected
    ))]
    ColumnLengthMismatch {
        name: String,
        expected: usize,
        found: usize,
    },

    #[snafu(display(
        "Column `{}` has type {}, expected {}",
        name,
        found,
        expected
    ))]
    InvalidColumnType {
        name: String,
        expected: String,
        found: String,
    },

    #[snafu(display("Schema metadata `{}` is missing", key))]
    MissingSchemaMetadata {
        key: String,
    },

    #[snafu(display("Schema metadata `{}` has the invalid value `{}`", key, value))]
    InvalidSchemaMetadata {
        key: String,
        value: String,
    },

    #[snafu(display("Cell {} is contained more than once", cell))]
    DuplicateCell {
        cell: CellIndex,
    },

    #[snafu(display("Cell {} has resolution {}, expected {}", cell, found, expected))]
    CellResolutionMismatch {
        cell: CellIndex,
        expected: Resolution,
        found: Resolution,
    },

    #[snafu(display(
        "Tables with resolutions {} and {} cannot be joined without aggregation",
        left,
        right
    ))]
    ResolutionMismatch {
        left: Resolution,
        right: Resolution,
    },

    #[snafu(display(
        "Target resolution {} is finer than the conversion resolution {}. Up-scaling is not supported",
        target,
        conversion
    ))]
    UpscalingNotSupported {
        target: Resolution,
        conversion: Resolution,
    },

    #[snafu(display("Invalid H3 resolution: {}", source))]
    InvalidResolution {
        source: h3o::error::InvalidResolution,
    },

    #[snafu(display("Invalid H3 cell index: {}", source))]
    InvalidCellIndex {
        source: h3o::error::InvalidCellIndex,
    },

    #[snafu(display("Invalid coordinate: {}", source))]
    InvalidLatLng {
        source: h3o::error::InvalidLatLng,
    },

    #[snafu(display("Geometry cannot be converted to H3 cells: {}", source))]
    InvalidGeometry {
        source: h3o::error::InvalidGeometry,
    },

    #[snafu(display(
        "The conditions ll.x < ur.x && ll.y < ur.y are not met by ll:{:?} ur:{:?}",
        lower_left_coordinate,
        upper_right_coordinate
    ))]
    InvalidBoundingBox {
        lower_left_coordinate: Coord<f64>,
        upper_right_coordinate: Coord<f64>,
    },

    #[snafu(display(
        "Pixel sizes must be finite and non-zero, found x: {} y: {}",
        x_pixel_size,
        y_pixel_size
    ))]
    InvalidGeoTransform {
        x_pixel_size: f64,
        y_pixel_size: f64,
    },

    #[snafu(display(
        "Raster block has {} values, but its window has {} pixels",
        data_len,
        pixels
    ))]
    RasterBlockShapeMismatch {
        data_len: usize,
        pixels: usize,
    },

    #[snafu(display("Unable to create projection `{}`: {}", definition, source))]
    ProjCreation {
        definition: String,
        source: proj::ProjCreateError,
    },

    #[snafu(display("Coordinate projection failed: {}", source))]
    Projection {
        source: proj::ProjError,
    },
}

impl From<arrow::error::ArrowError> for Error {
    fn from(source: arrow::error::ArrowError) -> Self {
        Error::ArrowInternal { source }
    }
}
