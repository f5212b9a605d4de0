use crate::error;
use crate::util::Result;
use geo::MultiPolygon;
use h3o::geom::{PolyfillConfig, ToCells, ToGeo};
use h3o::{CellIndex, Resolution};
use popgrid_datatypes::hexgrid::ResolutionPlan;
use popgrid_datatypes::operations::hex_buffer;
use popgrid_datatypes::primitives::BoundingBox2D;
use snafu::ResultExt;
use tracing::debug;

/// The fetch tiles covering the area of interest, sorted by cell index.
///
/// The AOI is buffered by one edge length of the fetch resolution first, so every cell whose
/// centroid lies in the buffered AOI is a fetch tile. An empty AOI has no fetch tiles.
pub fn fetch_tiles(aoi: &MultiPolygon<f64>, plan: &ResolutionPlan) -> Result<Vec<CellIndex>> {
    let buffered = hex_buffer(aoi, plan.fetch)?;
    if buffered.0.is_empty() {
        return Ok(Vec::new());
    }

    let buffered = h3o::geom::MultiPolygon::from_degrees(buffered)
        .map_err(|source| popgrid_datatypes::error::Error::InvalidGeometry { source })?;

    let mut tiles: Vec<CellIndex> = buffered
        .to_cells(PolyfillConfig::new(plan.fetch))
        .collect();
    tiles.sort_unstable_by_key(|&tile| u64::from(tile));
    tiles.dedup();

    debug!(
        "{} fetch tiles at resolution {} cover the area of interest",
        tiles.len(),
        plan.fetch
    );

    Ok(tiles)
}

/// The region read from the rasters for `tile`.
///
/// It is the bounding box of the tile's boundary, buffered by one edge length of the next
/// finer resolution, so that cells whose ancestor is `tile` but which reach beyond its
/// boundary are read completely.
pub fn fetch_tile_bounding_box(tile: CellIndex) -> Result<BoundingBox2D> {
    let Ok(boundary) = tile.to_geom(true);

    let margin_resolution = tile.resolution().succ().unwrap_or(Resolution::Fifteen);
    let buffered = hex_buffer(&MultiPolygon::new(vec![boundary]), margin_resolution)?;

    BoundingBox2D::from_geometry(&buffered).context(error::DataType)
}
