mod ipc;
mod raster_conversion;
mod resolution;
mod table;

pub use self::ipc::{H3_RESOLUTION_KEY, arrow_schema};
pub use self::raster_conversion::{BinningMode, HexBinner, NO_DATA_VALUE, replace_no_data};
pub use self::resolution::{
    MAX_FETCH_RESOLUTION, ResolutionPlan, nearest_resolution, pixel_area_m2,
};
pub use self::table::{H3INDEX_COLUMN_NAME, HexTable};
