use crate::error;
use crate::util::Result;
use gdal::DriverManager;
use gdal::spatial_ref::SpatialRef;
use gdal::vector::{
    Defn, Feature, FieldDefn, Geometry, LayerOptions, OGRFieldType, OGRwkbGeometryType,
};
use h3o::CellIndex;
use popgrid_datatypes::hexgrid::{H3INDEX_COLUMN_NAME, HexTable, ResolutionPlan};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Suffix of files that are not completely written yet
const INTERMEDIATE_FILE_SUFFIX: &str = "popgrid-tmp";

const ARROW_EXTENSION: &str = "arrow";
const FLATGEOBUF_EXTENSION: &str = "fgb";
const FLATGEOBUF_DRIVER: &str = "FlatGeobuf";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileWriterOptions {
    /// Additionally write a FlatGeobuf file per non-empty group cell
    pub vector_export: bool,
    pub vector_layer_name: String,
}

impl Default for TileWriterOptions {
    fn default() -> Self {
        Self {
            vector_export: false,
            vector_layer_name: "population".to_string(),
        }
    }
}

/// Persists the cells of a fetch tile as one file per group cell.
#[derive(Clone, Debug)]
pub struct TileWriter {
    output_root: PathBuf,
    plan: ResolutionPlan,
    options: TileWriterOptions,
}

impl TileWriter {
    pub fn new(
        output_root: impl Into<PathBuf>,
        plan: ResolutionPlan,
        options: TileWriterOptions,
    ) -> Self {
        Self {
            output_root: output_root.into(),
            plan,
            options,
        }
    }

    /// `{output_root}/{group resolution}/{target resolution}`
    pub fn output_directory(&self) -> PathBuf {
        self.output_root
            .join(u8::from(self.plan.group).to_string())
            .join(u8::from(self.plan.target).to_string())
    }

    pub fn create_output_directory(&self) -> Result<PathBuf> {
        let path = self.output_directory();
        std::fs::create_dir_all(&path).context(error::CreateOutputDirectory { path: &path })?;
        Ok(path)
    }

    /// Writes the rows of `table` grouped by their ancestor at the group resolution.
    ///
    /// Every group cell below `tile` gets an Arrow file, even if it has no rows. Returns the
    /// paths of all written files.
    pub fn write_fetch_tile(&self, tile: CellIndex, table: &HexTable) -> Result<Vec<PathBuf>> {
        let directory = self.create_output_directory()?;
        let mut partitions = table.partition_by_ancestor(self.plan.group)?;

        let mut files = Vec::new();
        for group_cell in tile.children(self.plan.group) {
            let partition = partitions
                .remove(&group_cell)
                .unwrap_or_else(|| table.empty_like());

            files.push(write_arrow(&directory, group_cell, &partition)?);

            if self.options.vector_export && !partition.is_empty() {
                files.push(self.write_flatgeobuf(&directory, group_cell, &partition)?);
            }
        }

        info!(
            "wrote {} files for fetch tile {} to {:?}",
            files.len(),
            tile,
            directory
        );

        Ok(files)
    }

    fn write_flatgeobuf(
        &self,
        directory: &Path,
        group_cell: CellIndex,
        table: &HexTable,
    ) -> Result<PathBuf> {
        let path = write_artifact(directory, group_cell, FLATGEOBUF_EXTENSION, |intermediate| {
            write_hexagon_layer(intermediate, &self.options.vector_layer_name, table)
                .context(error::WriteVectorFile { path: intermediate })
        })?;

        debug!("wrote {} hexagons to {:?}", table.len(), path);

        Ok(path)
    }
}

fn write_arrow(directory: &Path, group_cell: CellIndex, table: &HexTable) -> Result<PathBuf> {
    let path = write_artifact(directory, group_cell, ARROW_EXTENSION, |intermediate| {
        let file =
            File::create(intermediate).context(error::CreateArtifact { path: intermediate })?;
        let mut writer = table
            .write_arrow_ipc(BufWriter::new(file))
            .context(error::WriteArrowIpc { path: intermediate })?;
        writer
            .flush()
            .context(error::CreateArtifact { path: intermediate })
    })?;

    debug!("wrote {} rows to {:?}", table.len(), path);

    Ok(path)
}

/// Writes an artifact to its intermediate path with `write` and renames it afterwards.
///
/// If `write` fails, the intermediate file is removed again.
fn write_artifact<F>(
    directory: &Path,
    group_cell: CellIndex,
    extension: &str,
    write: F,
) -> Result<PathBuf>
where
    F: FnOnce(&Path) -> Result<()>,
{
    let (intermediate, path) = artifact_paths(directory, group_cell, extension);

    if let Err(error) = write(&intermediate) {
        remove_intermediate(&intermediate);
        return Err(error);
    }

    rename_artifact(&intermediate, &path)?;

    Ok(path)
}

fn remove_intermediate(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!("removed incomplete file {:?}", path),
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
        Err(error) => warn!("could not remove incomplete file {:?}: {}", path, error),
    }
}

/// The intermediate and the final path of an artifact.
///
/// GDAL picks the FlatGeobuf output mode by the file extension, so the intermediate name keeps it.
fn artifact_paths(directory: &Path, group_cell: CellIndex, extension: &str) -> (PathBuf, PathBuf) {
    (
        directory.join(format!("{group_cell}.{INTERMEDIATE_FILE_SUFFIX}.{extension}")),
        directory.join(format!("{group_cell}.{extension}")),
    )
}

fn rename_artifact(from: &Path, to: &Path) -> Result<()> {
    std::fs::rename(from, to).context(error::RenameArtifact { from, to })
}

fn write_hexagon_layer(
    path: &Path,
    layer_name: &str,
    table: &HexTable,
) -> std::result::Result<(), gdal::errors::GdalError> {
    let driver = DriverManager::get_driver_by_name(FLATGEOBUF_DRIVER)?;
    let mut dataset = driver.create_vector_only(path)?;

    let spatial_ref = SpatialRef::from_epsg(4326)?;
    let layer = dataset.create_layer(LayerOptions {
        name: layer_name,
        srs: Some(&spatial_ref),
        ty: OGRwkbGeometryType::wkbPolygon,
        options: None,
    })?;

    FieldDefn::new(H3INDEX_COLUMN_NAME, OGRFieldType::OFTInteger64)?.add_to_layer(&layer)?;
    for name in table.column_names() {
        FieldDefn::new(name, OGRFieldType::OFTReal)?.add_to_layer(&layer)?;
    }

    let defn = Defn::from_layer(&layer);
    let h3index_idx = defn.field_index(H3INDEX_COLUMN_NAME)?;
    let column_indices = table
        .column_names()
        .map(|name| defn.field_index(name))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    for (row, &cell) in table.cells().iter().enumerate() {
        let mut feature = Feature::new(&defn)?;
        feature.set_geometry(hexagon(cell)?)?;

        feature.set_field_integer64(h3index_idx, u64::from(cell) as i64)?;

        for ((_, values), &idx) in table.columns().zip(&column_indices) {
            feature.set_field_double(idx, values[row])?;
        }

        feature.create(&layer)?;
    }

    Ok(())
}

fn hexagon(cell: CellIndex) -> std::result::Result<Geometry, gdal::errors::GdalError> {
    let mut ring = Geometry::empty(OGRwkbGeometryType::wkbLinearRing)?;

    let boundary = cell.boundary();
    for vertex in boundary.iter() {
        ring.add_point_2d((vertex.lng(), vertex.lat()));
    }
    if let Some(first) = boundary.iter().next() {
        ring.add_point_2d((first.lng(), first.lat()));
    }

    let mut polygon = Geometry::empty(OGRwkbGeometryType::wkbPolygon)?;
    polygon.add_geometry(ring)?;

    Ok(polygon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;
    use gdal::Dataset;
    use gdal::vector::LayerAccess;
    use h3o::{LatLng, Resolution};
    use std::collections::HashMap;

    fn test_table(tile: CellIndex, plan: &ResolutionPlan) -> HexTable {
        // all values below the tile's center child at the group resolution
        let group_cell = tile.center_child(plan.group).unwrap();
        let values: HashMap<CellIndex, f64> = group_cell
            .children(plan.target)
            .take(10)
            .map(|cell| (cell, 1.5))
            .collect();

        HexTable::from_cell_values(plan.target, "population", values).unwrap()
    }

    #[test]
    fn it_writes_one_arrow_file_per_group_cell() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ResolutionPlan::new(Resolution::Eight, Resolution::Five);
        let tile = LatLng::new(50.0, 8.0).unwrap().to_cell(plan.fetch);
        let table = test_table(tile, &plan);

        let writer = TileWriter::new(dir.path(), plan, TileWriterOptions::default());
        let files = writer.write_fetch_tile(tile, &table).unwrap();

        assert_eq!(writer.output_directory(), dir.path().join("5").join("8"));
        assert_eq!(files.len(), 49);
        assert!(files.iter().all(|file| file.extension().unwrap() == "arrow"));
        assert!(files.iter().all(|file| file.exists()));

        let mut total = 0.0;
        let mut non_empty = 0;
        for file in &files {
            let read = HexTable::read_arrow_ipc(File::open(file).unwrap()).unwrap();
            assert_eq!(read.resolution(), Resolution::Eight);
            assert_eq!(read.column_names().collect::<Vec<_>>(), vec!["population"]);
            if !read.is_empty() {
                non_empty += 1;
            }
            total += read.column_sum("population").unwrap();
        }

        assert_eq!(non_empty, 1);
        assert!(approx_eq!(f64, total, 15.0));

        let leftovers = std::fs::read_dir(writer.output_directory())
            .unwrap()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_name().to_string_lossy().contains(INTERMEDIATE_FILE_SUFFIX))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn it_writes_flatgeobuf_files_for_non_empty_group_cells() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ResolutionPlan::new(Resolution::Eight, Resolution::Five);
        let tile = LatLng::new(50.0, 8.0).unwrap().to_cell(plan.fetch);
        let table = test_table(tile, &plan);

        let writer = TileWriter::new(
            dir.path(),
            plan,
            TileWriterOptions {
                vector_export: true,
                vector_layer_name: "hexagons".to_string(),
            },
        );
        let files = writer.write_fetch_tile(tile, &table).unwrap();

        let vector_files: Vec<&PathBuf> = files
            .iter()
            .filter(|file| file.extension().unwrap() == "fgb")
            .collect();
        assert_eq!(vector_files.len(), 1);

        let group_cell = tile.center_child(plan.group).unwrap();
        assert_eq!(
            vector_files[0],
            &writer.output_directory().join(format!("{group_cell}.fgb"))
        );

        let dataset = Dataset::open(vector_files[0]).unwrap();
        let mut layer = dataset.layer_by_name("hexagons").unwrap();
        assert_eq!(layer.feature_count(), 10);

        for feature in layer.features() {
            let h3index = feature
                .field_as_integer64(feature.field_index(H3INDEX_COLUMN_NAME).unwrap())
                .unwrap()
                .unwrap();
            let cell = CellIndex::try_from(h3index as u64).unwrap();
            assert_eq!(cell.parent(plan.group), Some(group_cell));

            let population = feature
                .field_as_double(feature.field_index("population").unwrap())
                .unwrap()
                .unwrap();
            assert!(approx_eq!(f64, population, 1.5));
        }
    }

    #[test]
    fn failed_writes_leave_no_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        let group_cell = LatLng::new(50.0, 8.0).unwrap().to_cell(Resolution::Five);

        let result = write_artifact(dir.path(), group_cell, ARROW_EXTENSION, |intermediate| {
            std::fs::write(intermediate, b"partial").unwrap();
            Err::<(), _>(std::io::Error::other("disk full"))
                .context(error::CreateArtifact { path: intermediate })
        });

        assert!(matches!(result, Err(error::Error::CreateArtifact { .. })));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn interrupted_vector_exports_leave_no_intermediate_files() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ResolutionPlan::new(Resolution::Eight, Resolution::Five);
        let tile = LatLng::new(50.0, 8.0).unwrap().to_cell(plan.fetch);
        let table = test_table(tile, &plan);

        let writer = TileWriter::new(dir.path(), plan, TileWriterOptions::default());
        let directory = writer.create_output_directory().unwrap();
        let group_cell = tile.center_child(plan.group).unwrap();

        let result = write_artifact(&directory, group_cell, FLATGEOBUF_EXTENSION, |intermediate| {
            write_hexagon_layer(intermediate, "population", &table)
                .context(error::WriteVectorFile { path: intermediate })?;
            // the vector file is complete, but a later step fails
            Err::<(), _>(std::io::Error::other("interrupted"))
                .context(error::CreateArtifact { path: intermediate })
        });

        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(directory).unwrap().count(), 0);
    }

    #[test]
    fn empty_tables_have_empty_arrow_files_but_no_flatgeobuf_files() {
        let dir = tempfile::tempdir().unwrap();
        let plan = ResolutionPlan::new(Resolution::Six, Resolution::Four);
        let tile = LatLng::new(-10.0, 120.0).unwrap().to_cell(plan.fetch);
        let table = HexTable::empty(plan.target, &["population", "population_youth_15_24"]).unwrap();

        let writer = TileWriter::new(
            dir.path(),
            plan,
            TileWriterOptions {
                vector_export: true,
                ..TileWriterOptions::default()
            },
        );
        let files = writer.write_fetch_tile(tile, &table).unwrap();

        assert_eq!(files.len(), 7);
        for file in &files {
            assert_eq!(file.extension().unwrap(), "arrow");

            let read = HexTable::read_arrow_ipc(File::open(file).unwrap()).unwrap();
            assert!(read.is_empty());
            assert_eq!(
                read.column_names().collect::<Vec<_>>(),
                vec!["population", "population_youth_15_24"]
            );
        }
    }
}
