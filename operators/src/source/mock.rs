use super::{DatasetColumn, FetchedTable, RasterSource};
use crate::util::Result;
use geo::Coord;
use h3o::{LatLng, Resolution};
use popgrid_datatypes::hexgrid::HexTable;
use popgrid_datatypes::primitives::BoundingBox2D;
use std::collections::HashMap;
use std::sync::Mutex;

/// A `RasterSource` serving prepared single column tables. It records every request.
#[derive(Debug, Default)]
pub struct MockRasterSource {
    tables: HashMap<String, HexTable>,
    requests: Mutex<Vec<(String, BoundingBox2D, Option<Resolution>)>>,
}

impl MockRasterSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves `table` for the dataset `name`. The table's only column is renamed on fetch.
    #[must_use]
    pub fn with_dataset(mut self, name: &str, table: HexTable) -> Self {
        self.tables.insert(name.to_string(), table);
        self
    }

    /// All requests as (dataset name, bbox, pinned resolution)
    pub fn requests(&self) -> Vec<(String, BoundingBox2D, Option<Resolution>)> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RasterSource for MockRasterSource {
    fn fetch(
        &self,
        dataset: &DatasetColumn,
        bbox: BoundingBox2D,
        pinned: Option<Resolution>,
    ) -> Result<FetchedTable> {
        match self.requests.lock() {
            Ok(mut requests) => requests.push((dataset.name.clone(), bbox, pinned)),
            Err(poisoned) => poisoned
                .into_inner()
                .push((dataset.name.clone(), bbox, pinned)),
        }

        let Some(table) = self.tables.get(&dataset.name) else {
            return Ok(FetchedTable {
                dataset: dataset.name.clone(),
                table: HexTable::empty(pinned.unwrap_or(Resolution::Fifteen), &[&dataset.column])?,
            });
        };

        let source_values = table
            .columns()
            .next()
            .map(|(_, values)| values)
            .unwrap_or_default();

        let mut cells = Vec::new();
        let mut values = Vec::new();
        for (&cell, &value) in table.cells().iter().zip(source_values) {
            let center = LatLng::from(cell);
            if bbox.contains_coordinate(Coord {
                x: center.lng(),
                y: center.lat(),
            }) {
                cells.push(cell);
                values.push(value);
            }
        }

        let table = HexTable::try_new(
            table.resolution(),
            cells,
            vec![(dataset.column.clone(), values)],
        )?;
        let table = match pinned {
            Some(resolution) => table.to_resolution(resolution)?,
            None => table,
        };

        Ok(FetchedTable {
            dataset: dataset.name.clone(),
            table,
        })
    }
}
