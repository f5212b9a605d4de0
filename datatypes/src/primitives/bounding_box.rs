use crate::error;
use crate::util::Result;
use geo::{BoundingRect, Coord, Rect};
use serde::{Deserialize, Serialize};
use snafu::ensure;
use std::fmt;

#[derive(Copy, Clone, Serialize, Deserialize, PartialEq, Debug)]
/// An axis-aligned bounding box in geographic coordinates (longitude/latitude).
/// Note: unlike a general purpose bounding box it never degenerates to a line or point.
pub struct BoundingBox2D {
    lower_left_coordinate: Coord<f64>,
    upper_right_coordinate: Coord<f64>,
}

impl BoundingBox2D {
    /// Creates a new bounding box
    ///
    /// # Examples
    ///
    /// ```
    /// use geo::coord;
    /// use popgrid_datatypes::primitives::BoundingBox2D;
    ///
    /// let bbox = BoundingBox2D::new(coord! { x: 1.0, y: 1.0 }, coord! { x: 2.0, y: 2.0 }).unwrap();
    /// ```
    ///
    /// # Errors
    ///
    /// This constructor fails if the coordinates are not finite, not in order or span no area
    ///
    pub fn new(
        lower_left_coordinate: Coord<f64>,
        upper_right_coordinate: Coord<f64>,
    ) -> Result<Self> {
        ensure!(
            lower_left_coordinate.x.is_finite()
                && lower_left_coordinate.y.is_finite()
                && upper_right_coordinate.x.is_finite()
                && upper_right_coordinate.y.is_finite()
                && lower_left_coordinate.x < upper_right_coordinate.x
                && lower_left_coordinate.y < upper_right_coordinate.y,
            error::InvalidBoundingBox {
                lower_left_coordinate,
                upper_right_coordinate
            }
        );
        Ok(Self {
            lower_left_coordinate,
            upper_right_coordinate,
        })
    }

    /// Creates the bounding box of a geometry.
    /// Fails for empty geometries and for geometries without an area.
    pub fn from_geometry<G>(geometry: &G) -> Result<Self>
    where
        G: BoundingRect<f64>,
        G::Output: Into<Option<Rect<f64>>>,
    {
        let rect: Option<Rect<f64>> = geometry.bounding_rect().into();
        let Some(rect) = rect else {
            return Err(error::Error::InvalidBoundingBox {
                lower_left_coordinate: Coord { x: f64::NAN, y: f64::NAN },
                upper_right_coordinate: Coord { x: f64::NAN, y: f64::NAN },
            });
        };
        Self::new(rect.min(), rect.max())
    }

    /// Returns the upper left edge, which is the origin of north-up rasters
    pub fn upper_left(&self) -> Coord<f64> {
        Coord {
            x: self.lower_left_coordinate.x,
            y: self.upper_right_coordinate.y,
        }
    }

    pub fn lower_right(&self) -> Coord<f64> {
        Coord {
            x: self.upper_right_coordinate.x,
            y: self.lower_left_coordinate.y,
        }
    }

    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.lower_left_coordinate.x + self.upper_right_coordinate.x) / 2.,
            y: (self.lower_left_coordinate.y + self.upper_right_coordinate.y) / 2.,
        }
    }

    pub fn size_x(&self) -> f64 {
        self.upper_right_coordinate.x - self.lower_left_coordinate.x
    }

    pub fn size_y(&self) -> f64 {
        self.upper_right_coordinate.y - self.lower_left_coordinate.y
    }

    pub fn contains_coordinate(&self, coordinate: Coord<f64>) -> bool {
        coordinate.x >= self.lower_left_coordinate.x
            && coordinate.y >= self.lower_left_coordinate.y
            && coordinate.x <= self.upper_right_coordinate.x
            && coordinate.y <= self.upper_right_coordinate.y
    }
}

impl From<BoundingBox2D> for Rect<f64> {
    fn from(bbox: BoundingBox2D) -> Self {
        Rect::new(bbox.lower_left_coordinate, bbox.upper_right_coordinate)
    }
}

impl fmt::Display for BoundingBox2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.lower_left_coordinate.x,
            self.lower_left_coordinate.y,
            self.upper_right_coordinate.x,
            self.upper_right_coordinate.y
        )
    }
}
