use serde::{Deserialize, Serialize};

/// A rectangular pixel window of a raster, addressed like GDAL's `RasterIO`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadWindow {
    start_x: usize,
    start_y: usize,
    size_x: usize,
    size_y: usize,
}

impl ReadWindow {
    pub fn new((start_x, start_y): (usize, usize), (size_x, size_y): (usize, usize)) -> Self {
        Self {
            start_x,
            start_y,
            size_x,
            size_y,
        }
    }

    pub fn start(&self) -> (usize, usize) {
        (self.start_x, self.start_y)
    }

    pub fn size(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    pub fn width(&self) -> usize {
        self.size_x
    }

    pub fn height(&self) -> usize {
        self.size_y
    }

    pub fn number_of_pixels(&self) -> usize {
        self.size_x * self.size_y
    }

    pub fn gdal_window_start(&self) -> (isize, isize) {
        (self.start_x as isize, self.start_y as isize)
    }

    pub fn gdal_window_size(&self) -> (usize, usize) {
        (self.size_x, self.size_y)
    }

    /// Splits the window into consecutive full-width blocks of at most `rows` rows.
    pub fn row_blocks(&self, rows: usize) -> impl Iterator<Item = ReadWindow> + '_ {
        let rows = rows.max(1);
        let Self {
            start_x,
            start_y,
            size_x,
            size_y,
        } = *self;

        (0..size_y).step_by(rows).map(move |offset| ReadWindow {
            start_x,
            start_y: start_y + offset,
            size_x,
            size_y: rows.min(size_y - offset),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_blocks_cover_window() {
        let window = ReadWindow::new((3, 10), (5, 7));

        let blocks: Vec<ReadWindow> = window.row_blocks(3).collect();

        assert_eq!(
            blocks,
            vec![
                ReadWindow::new((3, 10), (5, 3)),
                ReadWindow::new((3, 13), (5, 3)),
                ReadWindow::new((3, 16), (5, 1)),
            ]
        );
        assert_eq!(
            blocks.iter().map(ReadWindow::number_of_pixels).sum::<usize>(),
            window.number_of_pixels()
        );
    }

    #[test]
    fn row_blocks_of_empty_window() {
        let window = ReadWindow::new((0, 0), (5, 0));

        assert_eq!(window.number_of_pixels(), 0);
        assert_eq!(window.row_blocks(10).count(), 0);
    }

    #[test]
    fn gdal_window() {
        let window = ReadWindow::new((1, 2), (3, 4));

        assert_eq!(window.gdal_window_start(), (1, 2));
        assert_eq!(window.gdal_window_size(), (3, 4));
    }
}
