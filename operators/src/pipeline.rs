use crate::error;
use crate::processing::{ensure_target_resolution, fetch_tile_bounding_box, fetch_tiles, reconcile};
use crate::sink::TileWriter;
use crate::source::{DatasetColumn, FetchedTable, RasterSource};
use crate::util::Result;
use geo::MultiPolygon;
use h3o::{CellIndex, Resolution};
use popgrid_datatypes::hexgrid::{HexTable, ResolutionPlan};
use snafu::{ResultExt, ensure};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, instrument};

/// The outcome of a conversion run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversionSummary {
    pub fetch_tiles: Vec<CellIndex>,
    pub files_written: usize,
}

/// Converts population rasters within an area of interest into hexagon tiles.
///
/// Fetch tiles are processed one after another. Any error aborts the run.
#[derive(Debug)]
pub struct Conversion<S> {
    source: S,
    datasets: Vec<DatasetColumn>,
    plan: ResolutionPlan,
    writer: TileWriter,
}

impl<S: RasterSource> Conversion<S> {
    pub fn new(
        source: S,
        datasets: Vec<DatasetColumn>,
        plan: ResolutionPlan,
        writer: TileWriter,
    ) -> Result<Self> {
        ensure!(!datasets.is_empty(), error::NoDatasets);

        Ok(Self {
            source,
            datasets,
            plan,
            writer,
        })
    }

    /// Writes the tiles of all fetch tiles covering `aoi`.
    ///
    /// The output directory is created even if no fetch tile covers `aoi`.
    pub fn run(&self, aoi: &MultiPolygon<f64>) -> Result<ConversionSummary> {
        let start = Instant::now();

        let output_directory = self.writer.create_output_directory()?;
        let tiles = fetch_tiles(aoi, &self.plan)?;

        info!(
            "converting {} datasets for {} fetch tiles at resolution {} into {:?}",
            self.datasets.len(),
            tiles.len(),
            self.plan.target,
            output_directory
        );

        let mut files_written = 0;
        for (i, &tile) in tiles.iter().enumerate() {
            info!("processing fetch tile {} ({}/{})", tile, i + 1, tiles.len());
            files_written += self.process_fetch_tile(tile)?.len();
        }

        info!(
            "wrote {} files for {} fetch tiles, took {:?}",
            files_written,
            tiles.len(),
            start.elapsed()
        );

        Ok(ConversionSummary {
            fetch_tiles: tiles,
            files_written,
        })
    }

    pub fn process_fetch_tile(&self, tile: CellIndex) -> Result<Vec<PathBuf>> {
        let table = self.fetch_tile_table(tile)?;
        self.writer.write_fetch_tile(tile, &table)
    }

    /// The reconciled cells of all datasets whose ancestor at the fetch resolution is `tile`.
    #[instrument(skip(self))]
    pub fn fetch_tile_table(&self, tile: CellIndex) -> Result<HexTable> {
        let bbox = fetch_tile_bounding_box(tile)?;

        let mut pinned: Option<Resolution> = None;
        let mut fetched: Vec<FetchedTable> = Vec::with_capacity(self.datasets.len());

        for dataset in &self.datasets {
            let table = self
                .source
                .fetch(dataset, bbox, pinned)
                .context(error::FetchDataset {
                    dataset: &dataset.name,
                    tile,
                    bbox,
                })?;

            if pinned.is_none() {
                let conversion = table.conversion_resolution();
                ensure_target_resolution(&dataset.name, conversion, self.plan.target)?;
                pinned = Some(conversion);
            }

            fetched.push(table);
        }

        let table = reconcile(fetched, self.plan.target)?.filter_by_ancestor(tile);

        for name in table.column_names() {
            debug!(
                "{} sums up to {} in fetch tile {}",
                name,
                table.column_sum(name).unwrap_or_default(),
                tile
            );
        }

        Ok(table)
    }
}
