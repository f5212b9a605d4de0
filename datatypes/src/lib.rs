pub mod error;
pub mod hexgrid;
pub mod operations;
pub mod primitives;
pub mod raster;
pub mod util;
