use h3o::{CellIndex, Resolution};
use popgrid_datatypes::primitives::BoundingBox2D;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("DataTypeError: {}", source))]
    DataType {
        source: popgrid_datatypes::error::Error,
    },

    #[snafu(display("GdalError: {}", source))]
    Gdal {
        source: gdal::errors::GdalError,
    },

    #[snafu(display("Could not open gdal dataset for file path {:?}: {}", file_path, source))]
    CouldNotOpenGdalDataset {
        file_path: String,
        source: gdal::errors::GdalError,
    },

    #[snafu(display(
        "Path template `{}` must contain the placeholder `{}`",
        template,
        placeholder
    ))]
    InvalidPathTemplate {
        template: String,
        placeholder: &'static str,
    },

    #[snafu(display("At least one dataset is required"))]
    NoDatasets,

    #[snafu(display(
        "Fetching dataset `{}` for tile {} within {} failed: {}",
        dataset,
        tile,
        bbox,
        source
    ))]
    FetchDataset {
        dataset: String,
        tile: CellIndex,
        bbox: BoundingBox2D,
        #[snafu(source(from(Error, Box::new)))]
        source: Box<Error>,
    },

    #[snafu(display(
        "Dataset `{}` resolves to resolution {}, but target resolution {} was requested. Up-scaling is not supported",
        dataset,
        conversion,
        target
    ))]
    UpscalingNotSupported {
        dataset: String,
        target: Resolution,
        conversion: Resolution,
    },

    #[snafu(display("Could not create output directory {:?}: {}", path, source))]
    CreateOutputDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not create file {:?}: {}", path, source))]
    CreateArtifact {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Could not write Arrow file {:?}: {}", path, source))]
    WriteArrowIpc {
        path: PathBuf,
        source: popgrid_datatypes::error::Error,
    },

    #[snafu(display("Could not write vector file {:?}: {}", path, source))]
    WriteVectorFile {
        path: PathBuf,
        source: gdal::errors::GdalError,
    },

    #[snafu(display("Could not move {:?} to {:?}: {}", from, to, source))]
    RenameArtifact {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

impl From<popgrid_datatypes::error::Error> for Error {
    fn from(datatype_error: popgrid_datatypes::error::Error) -> Self {
        Self::DataType {
            source: datatype_error,
        }
    }
}

impl From<gdal::errors::GdalError> for Error {
    fn from(gdal_error: gdal::errors::GdalError) -> Self {
        Self::Gdal { source: gdal_error }
    }
}
