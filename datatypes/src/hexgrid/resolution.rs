use crate::raster::GeoTransform;
use geo::{Coord, GeodesicArea, Rect};
use h3o::Resolution;

/// Coarsest resolution used for fetching raster data
pub const MAX_FETCH_RESOLUTION: Resolution = Resolution::Three;

/// The resolutions of one conversion run.
///
/// `target` is the resolution of the written cells, `group` the resolution of the output
/// tiles and `fetch` the resolution of the units of work. `fetch <= group <= target` holds
/// by construction.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolutionPlan {
    pub target: Resolution,
    pub group: Resolution,
    pub fetch: Resolution,
}

impl ResolutionPlan {
    pub fn new(target: Resolution, group: Resolution) -> Self {
        let group = group.min(target);
        Self {
            target,
            group,
            fetch: group.min(MAX_FETCH_RESOLUTION),
        }
    }
}

/// The geodesic area in m² of a pixel of `geo_transform` whose center is `center`.
pub fn pixel_area_m2(geo_transform: &GeoTransform, center: Coord<f64>) -> f64 {
    let half_x = geo_transform.x_pixel_size.abs() / 2.;
    let half_y = geo_transform.y_pixel_size.abs() / 2.;

    Rect::new(
        Coord {
            x: center.x - half_x,
            y: (center.y - half_y).max(-90.),
        },
        Coord {
            x: center.x + half_x,
            y: (center.y + half_y).min(90.),
        },
    )
    .to_polygon()
    .geodesic_area_unsigned()
}

/// The resolution whose average cell area is closest to `area_m2`
pub fn nearest_resolution(area_m2: f64) -> Resolution {
    Resolution::range(Resolution::Zero, Resolution::Fifteen)
        .min_by(|a, b| {
            (a.area_m2() - area_m2)
                .abs()
                .total_cmp(&(b.area_m2() - area_m2).abs())
        })
        .unwrap_or(Resolution::Fifteen)
}
