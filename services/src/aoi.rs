use crate::error::{self, Result};
use geo::orient::Direction;
use geo::{Geometry, MultiPolygon, Orient, Polygon, unary_union};
use geojson::GeoJson;
use snafu::ResultExt;
use std::path::Path;

/// Reads an area of interest from a GeoJSON file.
///
/// The file may hold a geometry, a feature or a feature collection. All polygonal geometries
/// are unioned into a single multi polygon, features without geometry are skipped.
pub fn read_aoi(path: &Path) -> Result<MultiPolygon<f64>> {
    let content = std::fs::read_to_string(path).context(error::ReadAoi { path })?;
    parse_aoi(path, &content)
}

fn parse_aoi(path: &Path, content: &str) -> Result<MultiPolygon<f64>> {
    let geojson: GeoJson = content
        .parse()
        .map_err(Box::new)
        .context(error::ParseAoi { path })?;

    let geometries: Vec<geojson::Geometry> = match geojson {
        GeoJson::Geometry(geometry) => vec![geometry],
        GeoJson::Feature(feature) => feature.geometry.into_iter().collect(),
        GeoJson::FeatureCollection(collection) => collection
            .features
            .into_iter()
            .filter_map(|feature| feature.geometry)
            .collect(),
    };

    let mut polygons = Vec::new();
    for geometry in geometries {
        let geometry = Geometry::<f64>::try_from(geometry)
            .map_err(Box::new)
            .context(error::ParseAoi { path })?;
        collect_polygons(path, geometry, &mut polygons)?;
    }

    let polygons: Vec<Polygon<f64>> = polygons
        .iter()
        .map(|polygon| polygon.orient(Direction::Default))
        .collect();

    Ok(unary_union(&polygons))
}

fn collect_polygons(
    path: &Path,
    geometry: Geometry<f64>,
    polygons: &mut Vec<Polygon<f64>>,
) -> Result<()> {
    match geometry {
        Geometry::Polygon(polygon) => polygons.push(polygon),
        Geometry::MultiPolygon(multi_polygon) => polygons.extend(multi_polygon),
        Geometry::Rect(rect) => polygons.push(rect.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for geometry in collection {
                collect_polygons(path, geometry, polygons)?;
            }
        }
        other => {
            return error::UnsupportedAoiGeometry {
                path,
                geometry_type: geometry_type_name(&other),
            }
            .fail();
        }
    }

    Ok(())
}

fn geometry_type_name(geometry: &Geometry<f64>) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::MultiPolygon(_) => "MultiPolygon",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
    }
}
