use crate::error;
use crate::util::Result;
use geo::orient::Direction;
use geo::{
    Centroid, Coord, Line, LineString, MapCoords, MultiPolygon, Orient, Polygon, unary_union,
};
use h3o::Resolution;
use proj::{Proj, ProjError};
use snafu::ResultExt;
use std::f64::consts::{PI, TAU};
use tracing::instrument;

const GEOGRAPHIC_CRS: &str = "EPSG:4326";

/// Segments of the circles drawn around vertices
const CIRCLE_SEGMENTS: usize = 16;

/// Projects lon/lat coordinates into an azimuthal equidistant projection centered at a
/// given location, where distances from the center are true to scale in meters.
pub struct LocalMetricProjector {
    forward: Proj,
    inverse: Proj,
}

impl LocalMetricProjector {
    pub fn centered_at(center: Coord<f64>) -> Result<Self> {
        let definition = format!(
            "+proj=aeqd +lat_0={} +lon_0={} +x_0=0 +y_0=0 +datum=WGS84 +units=m +no_defs",
            center.y, center.x
        );

        let forward = Proj::new_known_crs(GEOGRAPHIC_CRS, &definition, None).context(
            error::ProjCreation {
                definition: definition.clone(),
            },
        )?;
        let inverse = Proj::new_known_crs(&definition, GEOGRAPHIC_CRS, None)
            .context(error::ProjCreation { definition })?;

        Ok(Self { forward, inverse })
    }

    /// lon/lat to meters
    pub fn project(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        convert(&self.forward, geometry)
    }

    /// meters to lon/lat
    pub fn unproject(&self, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
        convert(&self.inverse, geometry)
    }
}

fn convert(projection: &Proj, geometry: &MultiPolygon<f64>) -> Result<MultiPolygon<f64>> {
    geometry
        .try_map_coords(|coord| -> Result<Coord<f64>, ProjError> {
            let (x, y) = projection.convert((coord.x, coord.y))?;
            Ok(Coord { x, y })
        })
        .context(error::Projection)
}

/// Grows a lon/lat geometry by `distance_m` meters.
///
/// The buffer is computed in a local metric projection centered on the geometry's
/// centroid, so it is accurate for geometries of regional extent. Empty geometries stay
/// empty.
#[instrument(skip(geometry))]
pub fn buffer_meters(geometry: &MultiPolygon<f64>, distance_m: f64) -> Result<MultiPolygon<f64>> {
    let Some(centroid) = geometry.centroid() else {
        return Ok(MultiPolygon::new(Vec::new()));
    };

    let projector = LocalMetricProjector::centered_at(centroid.0)?;

    let buffered = dilate(&projector.project(geometry)?, distance_m);

    projector.unproject(&buffered)
}

/// Planar Minkowski sum of `geometry` and a disc of radius `distance`: the union of the
/// geometry, a strip along every edge and a circle around every vertex.
///
/// Non-positive distances return the geometry unchanged.
fn dilate(geometry: &MultiPolygon<f64>, distance: f64) -> MultiPolygon<f64> {
    if distance <= 0. || geometry.0.is_empty() {
        return geometry.clone();
    }

    let mut parts: Vec<Polygon<f64>> = geometry
        .iter()
        .map(|polygon| polygon.orient(Direction::Default))
        .collect();

    let rings = geometry
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()));

    for ring in rings {
        parts.extend(ring.lines().filter_map(|line| edge_strip(line, distance)));
        // rings are closed, the first coordinate repeats as the last one
        parts.extend(
            ring.coords()
                .skip(1)
                .map(|&vertex| vertex_circle(vertex, distance)),
        );
    }

    unary_union(&parts)
}

fn edge_strip(line: Line<f64>, distance: f64) -> Option<Polygon<f64>> {
    let delta = line.delta();
    let length = delta.x.hypot(delta.y);
    if length <= 0. {
        return None;
    }

    let normal = Coord {
        x: -delta.y / length * distance,
        y: delta.x / length * distance,
    };

    let strip = Polygon::new(
        LineString::new(vec![
            line.start + normal,
            line.end + normal,
            line.end - normal,
            line.start - normal,
            line.start + normal,
        ]),
        Vec::new(),
    );

    Some(strip.orient(Direction::Default))
}

/// A circumscribed polygon, its edges touch the circle of radius `distance` and the
/// axis-parallel ones lie on the tangents at 0°, 90°, 180° and 270°
fn vertex_circle(center: Coord<f64>, distance: f64) -> Polygon<f64> {
    let radius = distance / (PI / CIRCLE_SEGMENTS as f64).cos();

    let ring = (0..=CIRCLE_SEGMENTS)
        .map(|i| {
            let angle = TAU * ((i % CIRCLE_SEGMENTS) as f64 + 0.5) / CIRCLE_SEGMENTS as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();

    Polygon::new(LineString::new(ring), Vec::new())
}

/// Grows a geometry by one average edge length of `resolution`, so that the cells of
/// `resolution` whose centroid lies in the result cover the original geometry.
///
/// This is a heuristic. It is applied once per resolution change, buffering a buffered
/// geometry again does not yield the buffer of the summed distances.
pub fn hex_buffer(geometry: &MultiPolygon<f64>, resolution: Resolution) -> Result<MultiPolygon<f64>> {
    buffer_meters(geometry, resolution.edge_length_m())
}
