pub mod gdal;

use crate::error::Error;

pub use self::gdal::TemporaryGdalThreadLocalConfigOptions;

pub type Result<T, E = Error> = std::result::Result<T, E>;
