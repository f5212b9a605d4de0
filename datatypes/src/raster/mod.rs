mod geo_transform;
mod read_window;

pub use self::geo_transform::{GdalGeoTransform, GeoTransform};
pub use self::read_window::ReadWindow;
