mod fetch_tiles;
mod reconcile;

pub use fetch_tiles::{fetch_tile_bounding_box, fetch_tiles};
pub use reconcile::{ensure_target_resolution, reconcile};
