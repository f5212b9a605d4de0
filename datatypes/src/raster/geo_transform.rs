use crate::error;
use crate::primitives::BoundingBox2D;
use crate::util::Result;
use geo::{Coord, Rect};
use serde::{Deserialize, Serialize};
use snafu::ensure;

use super::ReadWindow;

/// This is a typedef for the `GDAL GeoTransform`. It represents an affine transformation matrix.
pub type GdalGeoTransform = [f64; 6];

/// The `GeoTransform` is a more user friendly representation of the `GDAL GeoTransform` affine transformation matrix.
/// Rotation terms are not supported and are ignored when converting from GDAL.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct GeoTransform {
    pub origin_coordinate: Coord<f64>,
    pub x_pixel_size: f64,
    pub y_pixel_size: f64,
}

impl GeoTransform {
    /// Generates a new `GeoTransform`
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::coord;
    /// use popgrid_datatypes::raster::GeoTransform;
    ///
    /// let geo_transform = GeoTransform::new(coord! { x: 0.0, y: 0.0 }, 1.0, -1.0).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// Fails if a pixel size is zero or not finite
    ///
    pub fn new(origin_coordinate: Coord<f64>, x_pixel_size: f64, y_pixel_size: f64) -> Result<Self> {
        ensure!(
            x_pixel_size.is_finite()
                && y_pixel_size.is_finite()
                && x_pixel_size != 0.
                && y_pixel_size != 0.,
            error::InvalidGeoTransform {
                x_pixel_size,
                y_pixel_size
            }
        );

        Ok(Self {
            origin_coordinate,
            x_pixel_size,
            y_pixel_size,
        })
    }

    /// Transforms a pixel index (column, row) into the coordinate of the pixel's upper left edge
    pub fn pixel_to_coordinate(&self, column: f64, row: f64) -> Coord<f64> {
        Coord {
            x: self.origin_coordinate.x + column * self.x_pixel_size,
            y: self.origin_coordinate.y + row * self.y_pixel_size,
        }
    }

    /// Transforms a pixel index (column, row) into the coordinate of the pixel's center
    pub fn pixel_center(&self, column: usize, row: usize) -> Coord<f64> {
        self.pixel_to_coordinate(column as f64 + 0.5, row as f64 + 0.5)
    }

    /// The area covered by the pixel (column, row)
    pub fn pixel_rect(&self, column: usize, row: usize) -> Rect<f64> {
        Rect::new(
            self.pixel_to_coordinate(column as f64, row as f64),
            self.pixel_to_coordinate(column as f64 + 1., row as f64 + 1.),
        )
    }

    /// Transforms a coordinate into fractional pixel space (column, row)
    pub fn coordinate_to_pixel(&self, coordinate: Coord<f64>) -> (f64, f64) {
        (
            (coordinate.x - self.origin_coordinate.x) / self.x_pixel_size,
            (coordinate.y - self.origin_coordinate.y) / self.y_pixel_size,
        )
    }

    /// Computes the minimal pixel window of a raster with `raster_size` (width, height)
    /// that covers the `bounding_box`. Returns `None` if the bounding box is outside the raster.
    pub fn read_window(
        &self,
        bounding_box: BoundingBox2D,
        raster_size: (usize, usize),
    ) -> Option<ReadWindow> {
        let (x_a, y_a) = self.coordinate_to_pixel(bounding_box.upper_left());
        let (x_b, y_b) = self.coordinate_to_pixel(bounding_box.lower_right());

        let start_x = x_a.min(x_b).floor().max(0.);
        let start_y = y_a.min(y_b).floor().max(0.);
        let end_x = x_a.max(x_b).ceil().min(raster_size.0 as f64);
        let end_y = y_a.max(y_b).ceil().min(raster_size.1 as f64);

        if start_x >= end_x || start_y >= end_y {
            return None;
        }

        Some(ReadWindow::new(
            (start_x as usize, start_y as usize),
            ((end_x - start_x) as usize, (end_y - start_y) as usize),
        ))
    }
}

impl TryFrom<GdalGeoTransform> for GeoTransform {
    type Error = error::Error;

    fn try_from(gdal_geo_transform: GdalGeoTransform) -> Result<Self> {
        Self::new(
            Coord {
                x: gdal_geo_transform[0],
                y: gdal_geo_transform[3],
            },
            gdal_geo_transform[1],
            // gdal_geo_transform[2],
            // gdal_geo_transform[4],
            gdal_geo_transform[5],
        )
    }
}

impl From<GeoTransform> for GdalGeoTransform {
    fn from(geo_transform: GeoTransform) -> GdalGeoTransform {
        [
            geo_transform.origin_coordinate.x,
            geo_transform.x_pixel_size,
            0.0, // self.x_rotation,
            geo_transform.origin_coordinate.y,
            0.0, // self.y_rotation,
            geo_transform.y_pixel_size,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::coord;

    fn bbox(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> BoundingBox2D {
        BoundingBox2D::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }).unwrap()
    }

    #[test]
    fn geo_transform_rejects_zero_pixel_size() {
        assert!(GeoTransform::new(coord! { x: 0.0, y: 0.0 }, 0.0, -1.0).is_err());
        assert!(GeoTransform::new(coord! { x: 0.0, y: 0.0 }, 1.0, f64::NAN).is_err());
    }

    #[test]
    fn geo_transform_pixel_center() {
        let geo_transform = GeoTransform::new(coord! { x: 5.0, y: 5.0 }, 1.0, -1.0).unwrap();
        assert_eq!(geo_transform.pixel_center(0, 0), coord! { x: 5.5, y: 4.5 });
        assert_eq!(geo_transform.pixel_center(2, 1), coord! { x: 7.5, y: 3.5 });
    }

    #[test]
    fn geo_transform_gdal_round_trip() {
        let gdal: GdalGeoTransform = [-180.0, 0.1, 0.0, 90.0, 0.0, -0.1];
        let geo_transform = GeoTransform::try_from(gdal).unwrap();

        assert_eq!(geo_transform.origin_coordinate, coord! { x: -180.0, y: 90.0 });
        assert_eq!(GdalGeoTransform::from(geo_transform), gdal);
    }

    #[test]
    fn read_window_inside() {
        let geo_transform = GeoTransform::new(coord! { x: 0.0, y: 10.0 }, 1.0, -1.0).unwrap();

        let window = geo_transform
            .read_window(bbox(2.5, 3.0, 4.2, 7.5), (10, 10))
            .unwrap();

        assert_eq!(window.start(), (2, 2));
        assert_eq!(window.size(), (3, 5));
    }

    #[test]
    fn read_window_is_clipped_to_raster() {
        let geo_transform = GeoTransform::new(coord! { x: 0.0, y: 10.0 }, 1.0, -1.0).unwrap();

        let window = geo_transform
            .read_window(bbox(-5.0, -5.0, 3.0, 20.0), (10, 10))
            .unwrap();

        assert_eq!(window.start(), (0, 0));
        assert_eq!(window.size(), (3, 10));
    }

    #[test]
    fn read_window_outside() {
        let geo_transform = GeoTransform::new(coord! { x: 0.0, y: 10.0 }, 1.0, -1.0).unwrap();

        assert!(
            geo_transform
                .read_window(bbox(20.0, 20.0, 30.0, 30.0), (10, 10))
                .is_none()
        );
    }
}
