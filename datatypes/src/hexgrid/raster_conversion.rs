use super::{HexTable, nearest_resolution};
use crate::error;
use crate::raster::{GeoTransform, ReadWindow};
use crate::util::Result;
use h3o::geom::{PolyfillConfig, ToCells};
use h3o::{CellIndex, LatLng, Resolution};
use snafu::{ResultExt, ensure};
use std::collections::HashMap;

/// Value of pixels without data. Such pixels do not produce cells.
pub const NO_DATA_VALUE: f64 = 0.0;

/// Maps NaN and the band's no-data value to [`NO_DATA_VALUE`].
/// A missing measurement and a measured zero are not distinguished afterwards.
#[allow(clippy::float_cmp)]
pub fn replace_no_data(value: f64, no_data_value: Option<f64>) -> f64 {
    if value.is_nan() || no_data_value.is_some_and(|no_data| value == no_data) {
        NO_DATA_VALUE
    } else {
        value
    }
}

/// How pixel values are assigned to cells
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinningMode {
    /// The whole value goes to the cell containing the pixel center.
    PixelCenter,
    /// The value is spread evenly over all cells whose centroid lies inside the pixel.
    PixelArea,
}

impl BinningMode {
    /// Pixels are spread only if `resolution` is finer than the one matching their area,
    /// which requires a pinned resolution. A derived resolution always bins by center.
    pub fn for_pixel_area(pixel_area_m2: f64, resolution: Resolution) -> Self {
        if resolution > nearest_resolution(pixel_area_m2) {
            Self::PixelArea
        } else {
            Self::PixelCenter
        }
    }
}

/// Accumulates raster blocks into per cell sums at a single resolution.
#[derive(Debug)]
pub struct HexBinner {
    resolution: Resolution,
    geo_transform: GeoTransform,
    no_data_value: Option<f64>,
    mode: BinningMode,
    values: HashMap<CellIndex, f64>,
}

impl HexBinner {
    /// `geo_transform` describes the whole raster, windows are given in its pixel space.
    pub fn new(
        resolution: Resolution,
        geo_transform: GeoTransform,
        no_data_value: Option<f64>,
        mode: BinningMode,
    ) -> Self {
        Self {
            resolution,
            geo_transform,
            no_data_value,
            mode,
            values: HashMap::new(),
        }
    }

    /// Adds the row-major pixel values `data` of `window`.
    pub fn add_block(&mut self, window: &ReadWindow, data: &[f64]) -> Result<()> {
        ensure!(
            data.len() == window.number_of_pixels(),
            error::RasterBlockShapeMismatch {
                data_len: data.len(),
                pixels: window.number_of_pixels(),
            }
        );

        let (start_x, start_y) = window.start();

        for (index, &value) in data.iter().enumerate() {
            let value = replace_no_data(value, self.no_data_value);
            if value == NO_DATA_VALUE {
                continue;
            }

            let column = start_x + index % window.width();
            let row = start_y + index / window.width();

            match self.mode {
                BinningMode::PixelCenter => {
                    let cell = self.center_cell(column, row)?;
                    *self.values.entry(cell).or_default() += value;
                }
                BinningMode::PixelArea => self.spread(column, row, value)?,
            }
        }

        Ok(())
    }

    /// Creates the table with a single column named `column_name`.
    pub fn finish(self, column_name: &str) -> Result<HexTable> {
        HexTable::from_cell_values(self.resolution, column_name, self.values)
    }

    fn center_cell(&self, column: usize, row: usize) -> Result<CellIndex> {
        let center = self.geo_transform.pixel_center(column, row);
        let lat_lng = LatLng::new(center.y, center.x).context(error::InvalidLatLng)?;
        Ok(lat_lng.to_cell(self.resolution))
    }

    fn spread(&mut self, column: usize, row: usize, value: f64) -> Result<()> {
        let pixel = h3o::geom::Polygon::from_degrees(
            self.geo_transform.pixel_rect(column, row).to_polygon(),
        )
        .context(error::InvalidGeometry)?;

        let mut cells: Vec<CellIndex> = pixel
            .to_cells(PolyfillConfig::new(self.resolution))
            .collect();
        if cells.is_empty() {
            cells.push(self.center_cell(column, row)?);
        }

        let share = value / cells.len() as f64;
        for cell in cells {
            *self.values.entry(cell).or_default() += share;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::coord;

    fn thirty_arc_seconds() -> GeoTransform {
        let size = 30. / 3600.;
        GeoTransform::new(coord! { x: 8.0, y: 50.0 }, size, -size).unwrap()
    }

    #[test]
    #[allow(clippy::float_cmp)]
    fn it_replaces_no_data() {
        assert_eq!(replace_no_data(f64::NAN, None), 0.0);
        assert_eq!(replace_no_data(-9999.0, Some(-9999.0)), 0.0);
        assert_eq!(replace_no_data(3.5, Some(-9999.0)), 3.5);
        assert_eq!(replace_no_data(-9999.0, None), -9999.0);
    }

    #[test]
    fn it_chooses_the_binning_mode() {
        let area = Resolution::Eight.area_m2();

        assert_eq!(
            BinningMode::for_pixel_area(area, Resolution::Eight),
            BinningMode::PixelCenter
        );
        assert_eq!(
            BinningMode::for_pixel_area(7. * area, Resolution::Eight),
            BinningMode::PixelArea
        );
    }

    #[test]
    fn derived_resolutions_bin_by_pixel_center() {
        let mut pixel_area = 1.0;
        while pixel_area < 1e13 {
            assert_eq!(
                BinningMode::for_pixel_area(pixel_area, nearest_resolution(pixel_area)),
                BinningMode::PixelCenter,
                "pixel area {pixel_area}"
            );
            pixel_area *= 1.7;
        }

        // a 0.001° pixel at 50°N is about 8000 m², between three and four cells of resolution 11
        assert_eq!(nearest_resolution(8_000.), Resolution::Eleven);
        assert_eq!(
            BinningMode::for_pixel_area(8_000., Resolution::Eleven),
            BinningMode::PixelCenter
        );
        assert_eq!(
            BinningMode::for_pixel_area(8_000., Resolution::Twelve),
            BinningMode::PixelArea
        );
    }

    #[test]
    fn pixel_center_binning_conserves_sum() {
        let mut binner = HexBinner::new(
            Resolution::Seven,
            thirty_arc_seconds(),
            None,
            BinningMode::PixelCenter,
        );

        let window = ReadWindow::new((10, 20), (4, 3));
        binner.add_block(&window, &[1.5; 12]).unwrap();

        let table = binner.finish("population").unwrap();

        assert_eq!(table.resolution(), Resolution::Seven);
        assert!(table.len() < 12);
        assert_relative_eq!(table.column_sum("population").unwrap(), 18.0);
    }

    #[test]
    fn pixel_area_binning_conserves_sum() {
        let geo_transform = GeoTransform::new(coord! { x: 8.0, y: 50.0 }, 1.0, -1.0).unwrap();
        let mut binner =
            HexBinner::new(Resolution::Five, geo_transform, None, BinningMode::PixelArea);

        binner
            .add_block(&ReadWindow::new((0, 0), (1, 1)), &[1000.0])
            .unwrap();

        let table = binner.finish("population").unwrap();

        assert!(table.len() > 10);
        assert_relative_eq!(
            table.column_sum("population").unwrap(),
            1000.0,
            max_relative = 1e-9
        );
    }

    #[test]
    fn pixel_area_binning_falls_back_to_center() {
        let mut binner = HexBinner::new(
            Resolution::Two,
            thirty_arc_seconds(),
            None,
            BinningMode::PixelArea,
        );

        binner
            .add_block(&ReadWindow::new((0, 0), (1, 1)), &[7.0])
            .unwrap();

        let table = binner.finish("population").unwrap();

        assert_eq!(table.len(), 1);
        assert_relative_eq!(table.column_sum("population").unwrap(), 7.0);
    }

    #[test]
    fn all_no_data_produces_no_rows() {
        let mut binner = HexBinner::new(
            Resolution::Eight,
            thirty_arc_seconds(),
            Some(-1.0),
            BinningMode::PixelCenter,
        );

        binner
            .add_block(
                &ReadWindow::new((0, 0), (2, 2)),
                &[f64::NAN, -1.0, 0.0, f64::NAN],
            )
            .unwrap();

        let table = binner.finish("population").unwrap();

        assert!(table.is_empty());
        assert!(table.column("population").is_some_and(<[f64]>::is_empty));
    }

    #[test]
    fn it_rejects_blocks_of_wrong_size() {
        let mut binner = HexBinner::new(
            Resolution::Eight,
            thirty_arc_seconds(),
            None,
            BinningMode::PixelCenter,
        );

        assert!(matches!(
            binner.add_block(&ReadWindow::new((0, 0), (2, 2)), &[1.0; 3]),
            Err(error::Error::RasterBlockShapeMismatch { .. })
        ));
    }
}
