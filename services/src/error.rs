use snafu::Snafu;
use std::path::PathBuf;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[snafu(context(suffix(false)))] // disables default `Snafu` suffix
pub enum Error {
    #[snafu(display("OperatorError: {}", source))]
    Operator {
        source: popgrid_operators::error::Error,
    },

    #[snafu(display("Invalid settings: {}", source))]
    Config { source: config::ConfigError },

    #[snafu(display("Could not load the settings: {}", message))]
    SettingsUnavailable { message: String },

    #[snafu(display("Could not access the settings because their lock is poisoned"))]
    ConfigLockFailed,

    #[snafu(display("Could not determine the working directory: {}", source))]
    MissingWorkingDirectory { source: std::io::Error },

    #[snafu(display("Invalid log spec `{}`: {}", log_spec, source))]
    InvalidLogSpec {
        log_spec: String,
        source: tracing_subscriber::filter::ParseError,
    },

    #[snafu(display("Could not install the logger: {}", source))]
    LoggerInstallation {
        source: tracing_subscriber::util::TryInitError,
    },

    #[snafu(display("Invalid H3 resolution {}: {}", resolution, source))]
    InvalidResolution {
        resolution: u8,
        source: h3o::error::InvalidResolution,
    },

    #[snafu(display("Could not read the area of interest {:?}: {}", path, source))]
    ReadAoi {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("The area of interest {:?} is no valid GeoJSON: {}", path, source))]
    ParseAoi {
        path: PathBuf,
        source: Box<geojson::Error>,
    },

    #[snafu(display(
        "The area of interest {:?} contains a {} geometry, only polygons are supported",
        path,
        geometry_type
    ))]
    UnsupportedAoiGeometry {
        path: PathBuf,
        geometry_type: String,
    },
}

impl From<popgrid_operators::error::Error> for Error {
    fn from(operator_error: popgrid_operators::error::Error) -> Self {
        Self::Operator {
            source: operator_error,
        }
    }
}

impl From<config::ConfigError> for Error {
    fn from(config_error: config::ConfigError) -> Self {
        Self::Config {
            source: config_error,
        }
    }
}
