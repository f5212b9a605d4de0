use crate::error;
use crate::util::Result;
use h3o::{CellIndex, Resolution};
use itertools::Itertools;
use rayon::prelude::*;
use snafu::{OptionExt, ensure};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Name of the cell index column in every persisted table.
pub const H3INDEX_COLUMN_NAME: &str = "h3index";

/// An uncompacted, columnar table of H3 cells of a single resolution.
///
/// Rows are kept sorted by their 64 bit cell index. Each named column holds exactly one
/// value per cell.
#[derive(Clone, Debug)]
pub struct HexTable {
    resolution: Resolution,
    cells: Vec<CellIndex>,
    columns: Vec<(String, Vec<f64>)>,
}

impl HexTable {
    /// Creates a table without rows
    ///
    /// # Errors
    ///
    /// Fails if the column names are not unique or collide with the cell index column
    ///
    pub fn empty<S: AsRef<str>>(resolution: Resolution, column_names: &[S]) -> Result<Self> {
        Self::try_new(
            resolution,
            Vec::new(),
            column_names
                .iter()
                .map(|name| (name.as_ref().to_string(), Vec::new()))
                .collect(),
        )
    }

    /// Creates a table with the same resolution and columns but without rows
    pub fn empty_like(&self) -> Self {
        Self {
            resolution: self.resolution,
            cells: Vec::new(),
            columns: self
                .columns
                .iter()
                .map(|(name, _)| (name.clone(), Vec::new()))
                .collect(),
        }
    }

    /// Creates a single column table from per cell values
    pub fn from_cell_values(
        resolution: Resolution,
        column_name: &str,
        values: HashMap<CellIndex, f64>,
    ) -> Result<Self> {
        let (cells, values) = values.into_iter().unzip();
        Self::try_new(resolution, cells, vec![(column_name.to_string(), values)])
    }

    /// Creates a table from cells and columns. The rows are sorted by cell index.
    ///
    /// # Errors
    ///
    /// Fails if
    /// - a column name is used twice or equals [`H3INDEX_COLUMN_NAME`],
    /// - a column does not have one value per cell,
    /// - a cell has another resolution than `resolution`,
    /// - a cell is contained more than once.
    ///
    pub fn try_new(
        resolution: Resolution,
        cells: Vec<CellIndex>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self> {
        let mut names = HashSet::with_capacity(columns.len());
        for (name, values) in &columns {
            ensure!(
                name != H3INDEX_COLUMN_NAME && names.insert(name.as_str()),
                error::ColumnNameConflict { name: name.clone() }
            );
            ensure!(
                values.len() == cells.len(),
                error::ColumnLengthMismatch {
                    name: name.clone(),
                    expected: cells.len(),
                    found: values.len(),
                }
            );
        }

        for &cell in &cells {
            ensure!(
                cell.resolution() == resolution,
                error::CellResolutionMismatch {
                    cell,
                    expected: resolution,
                    found: cell.resolution(),
                }
            );
        }

        let mut order: Vec<usize> = (0..cells.len()).collect();
        order.sort_unstable_by_key(|&i| u64::from(cells[i]));

        for (&a, &b) in order.iter().tuple_windows() {
            ensure!(
                cells[a] != cells[b],
                error::DuplicateCell { cell: cells[a] }
            );
        }

        Ok(Self {
            resolution,
            cells: order.iter().map(|&i| cells[i]).collect(),
            columns: columns
                .into_iter()
                .map(|(name, values)| (name, order.iter().map(|&i| values[i]).collect()))
                .collect(),
        })
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cells(&self) -> &[CellIndex] {
        &self.cells
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.columns
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|(column_name, _)| column_name == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn column_sum(&self, name: &str) -> Option<f64> {
        self.column(name).map(|values| values.iter().sum())
    }

    /// Aggregates the table to a coarser (or the same) resolution by summing the values of
    /// all cells sharing an ancestor.
    ///
    /// # Errors
    ///
    /// Fails if `resolution` is finer than the table's resolution
    ///
    pub fn to_resolution(self, resolution: Resolution) -> Result<Self> {
        ensure!(
            resolution <= self.resolution,
            error::UpscalingNotSupported {
                target: resolution,
                conversion: self.resolution,
            }
        );

        if resolution == self.resolution {
            return Ok(self);
        }

        let ancestors: Vec<CellIndex> = self
            .cells
            .par_iter()
            .map(|cell| cell.parent(resolution))
            .collect::<Option<Vec<_>>>()
            .ok_or(error::Error::UpscalingNotSupported {
                target: resolution,
                conversion: self.resolution,
            })?;

        let mut order: Vec<usize> = (0..ancestors.len()).collect();
        order.sort_by_key(|&i| u64::from(ancestors[i]));

        let mut cells = Vec::new();
        let mut columns: Vec<(String, Vec<f64>)> = self
            .columns
            .iter()
            .map(|(name, _)| (name.clone(), Vec::new()))
            .collect();

        for (ancestor, rows) in &order.into_iter().chunk_by(|&i| ancestors[i]) {
            let rows: Vec<usize> = rows.collect();
            cells.push(ancestor);
            for ((_, source), (_, target)) in self.columns.iter().zip(columns.iter_mut()) {
                target.push(rows.iter().map(|&i| source[i]).sum());
            }
        }

        Ok(Self {
            resolution,
            cells,
            columns,
        })
    }

    /// Full outer join on the cell index. Values missing on one side are `0.0`.
    ///
    /// # Errors
    ///
    /// Fails if the resolutions differ or if both tables share a column name
    ///
    pub fn outer_join(&self, other: &Self) -> Result<Self> {
        ensure!(
            self.resolution == other.resolution,
            error::ResolutionMismatch {
                left: self.resolution,
                right: other.resolution,
            }
        );
        for name in other.column_names() {
            ensure!(
                self.column(name).is_none(),
                error::ColumnNameConflict { name }
            );
        }

        let capacity = self.len().max(other.len());
        let mut cells = Vec::with_capacity(capacity);
        let mut left_rows = Vec::with_capacity(capacity);
        let mut right_rows = Vec::with_capacity(capacity);

        let (mut i, mut j) = (0, 0);
        while i < self.cells.len() || j < other.cells.len() {
            let ordering = match (self.cells.get(i), other.cells.get(j)) {
                (Some(&left), Some(&right)) => u64::from(left).cmp(&u64::from(right)),
                (Some(_), None) => Ordering::Less,
                (None, _) => Ordering::Greater,
            };

            match ordering {
                Ordering::Less => {
                    cells.push(self.cells[i]);
                    left_rows.push(Some(i));
                    right_rows.push(None);
                    i += 1;
                }
                Ordering::Greater => {
                    cells.push(other.cells[j]);
                    left_rows.push(None);
                    right_rows.push(Some(j));
                    j += 1;
                }
                Ordering::Equal => {
                    cells.push(self.cells[i]);
                    left_rows.push(Some(i));
                    right_rows.push(Some(j));
                    i += 1;
                    j += 1;
                }
            }
        }

        let columns = gather_columns(&self.columns, &left_rows)
            .chain(gather_columns(&other.columns, &right_rows))
            .collect();

        Ok(Self {
            resolution: self.resolution,
            cells,
            columns,
        })
    }

    /// Keeps the rows whose ancestor at the resolution of `ancestor` is `ancestor`
    pub fn filter_by_ancestor(&self, ancestor: CellIndex) -> Self {
        let rows: Vec<usize> = self
            .cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.parent(ancestor.resolution()) == Some(ancestor))
            .map(|(i, _)| i)
            .collect();

        self.take_rows(&rows)
    }

    /// Splits the table by the ancestors of its cells at `resolution`.
    /// Ancestors without rows have no entry.
    ///
    /// # Errors
    ///
    /// Fails if `resolution` is finer than the table's resolution
    ///
    pub fn partition_by_ancestor(&self, resolution: Resolution) -> Result<HashMap<CellIndex, Self>> {
        ensure!(
            resolution <= self.resolution,
            error::UpscalingNotSupported {
                target: resolution,
                conversion: self.resolution,
            }
        );

        let mut partitions: HashMap<CellIndex, Vec<usize>> = HashMap::new();
        for (i, cell) in self.cells.iter().enumerate() {
            if let Some(ancestor) = cell.parent(resolution) {
                partitions.entry(ancestor).or_default().push(i);
            }
        }

        Ok(partitions
            .into_iter()
            .map(|(ancestor, rows)| (ancestor, self.take_rows(&rows)))
            .collect())
    }

    /// Appends the rows of `other`, which must have the same resolution and columns.
    pub fn concat(self, other: Self) -> Result<Self> {
        ensure!(
            self.resolution == other.resolution,
            error::ResolutionMismatch {
                left: self.resolution,
                right: other.resolution,
            }
        );
        for name in other.column_names() {
            ensure!(
                self.column(name).is_some(),
                error::ColumnDoesNotExist { name }
            );
        }

        let Self {
            resolution,
            mut cells,
            mut columns,
        } = self;

        cells.extend_from_slice(&other.cells);
        for (name, values) in &mut columns {
            let other_values = other
                .column(name)
                .context(error::ColumnDoesNotExist { name: name.as_str() })?;
            values.extend_from_slice(other_values);
        }

        Self::try_new(resolution, cells, columns)
    }

    /// Selects rows by position. `rows` must be ascending to keep the sort order.
    fn take_rows(&self, rows: &[usize]) -> Self {
        Self {
            resolution: self.resolution,
            cells: rows.iter().map(|&i| self.cells[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|(name, values)| (name.clone(), rows.iter().map(|&i| values[i]).collect()))
                .collect(),
        }
    }
}

fn gather_columns<'a>(
    columns: &'a [(String, Vec<f64>)],
    rows: &'a [Option<usize>],
) -> impl Iterator<Item = (String, Vec<f64>)> + 'a {
    columns.iter().map(move |(name, values)| {
        (
            name.clone(),
            rows.iter()
                .map(|row| row.map_or(0.0, |i| values[i]))
                .collect(),
        )
    })
}

impl PartialEq for HexTable {
    fn eq(&self, other: &Self) -> bool {
        self.resolution == other.resolution
            && self.cells == other.cells
            && self.columns.len() == other.columns.len()
            && self
                .columns()
                .all(|(name, values)| other.column(name) == Some(values))
    }
}
