use super::{H3INDEX_COLUMN_NAME, HexTable};
use crate::error;
use crate::util::Result;
use arrow::ipc::{
    reader::FileReader,
    writer::{FileWriter, IpcWriteOptions},
};
use arrow_array::{Array, ArrayRef, Float64Array, RecordBatch, UInt64Array};
use arrow_schema::{DataType, Field, Schema, SchemaRef};
use h3o::{CellIndex, Resolution};
use snafu::{OptionExt, ResultExt};
use std::collections::HashMap;
use std::io::{Read, Seek, Write};
use std::sync::Arc;

pub const H3_RESOLUTION_KEY: &str = "h3_resolution";

/// The Arrow schema of a table with the given value columns at `resolution`.
pub fn arrow_schema<S: AsRef<str>>(resolution: Resolution, column_names: &[S]) -> Schema {
    let fields: Vec<Field> = std::iter::once(Field::new(H3INDEX_COLUMN_NAME, DataType::UInt64, false))
        .chain(
            column_names
                .iter()
                .map(|name| Field::new(name.as_ref(), DataType::Float64, false)),
        )
        .collect();

    let metadata: HashMap<String, String> =
        [(H3_RESOLUTION_KEY.to_string(), u8::from(resolution).to_string())].into();

    Schema::new(fields).with_metadata(metadata)
}

impl HexTable {
    pub fn to_arrow_record_batch(&self) -> Result<RecordBatch> {
        let column_names: Vec<&str> = self.column_names().collect();
        let schema: SchemaRef = Arc::new(arrow_schema(self.resolution(), &column_names));

        let mut columns: Vec<ArrayRef> = Vec::with_capacity(column_names.len() + 1);
        columns.push(Arc::new(UInt64Array::from_iter_values(
            self.cells().iter().map(|&cell| u64::from(cell)),
        )));
        for (_, values) in self.columns() {
            columns.push(Arc::new(Float64Array::from(values.to_vec())));
        }

        RecordBatch::try_new(schema, columns).map_err(Into::into)
    }

    /// Restores a table from a record batch written by [`HexTable::to_arrow_record_batch`].
    pub fn from_arrow_record_batch(batch: &RecordBatch) -> Result<Self> {
        let schema = batch.schema();
        let resolution = resolution_from_metadata(schema.metadata())?;

        let cells = batch
            .column_by_name(H3INDEX_COLUMN_NAME)
            .context(error::ColumnDoesNotExist {
                name: H3INDEX_COLUMN_NAME,
            })?;
        let cells = downcast::<UInt64Array>(H3INDEX_COLUMN_NAME, cells, &DataType::UInt64)?
            .values()
            .iter()
            .map(|&index| CellIndex::try_from(index).context(error::InvalidCellIndex))
            .collect::<Result<Vec<_>>>()?;

        let mut columns = Vec::with_capacity(schema.fields().len().saturating_sub(1));
        for (field, column) in schema.fields().iter().zip(batch.columns()) {
            if field.name() == H3INDEX_COLUMN_NAME {
                continue;
            }

            let values = downcast::<Float64Array>(field.name(), column, &DataType::Float64)?;
            columns.push((field.name().clone(), values.values().to_vec()));
        }

        Self::try_new(resolution, cells, columns)
    }

    /// Writes the table as an Arrow IPC file containing a single record batch.
    /// Tables without rows still carry the full schema.
    pub fn write_arrow_ipc<W: Write>(&self, writer: W) -> Result<W> {
        let record_batch = self.to_arrow_record_batch()?;

        let mut file_writer = FileWriter::try_new_with_options(
            writer,
            record_batch.schema().as_ref(),
            IpcWriteOptions::default(),
        )?;
        file_writer.write(&record_batch)?;
        file_writer.finish()?;

        Ok(file_writer.into_inner()?)
    }

    /// Reads an Arrow IPC file and concatenates all of its record batches.
    pub fn read_arrow_ipc<R: Read + Seek>(reader: R) -> Result<Self> {
        let reader = FileReader::try_new(reader, None)?;
        let schema = reader.schema();
        let resolution = resolution_from_metadata(schema.metadata())?;

        let column_names: Vec<&str> = schema
            .fields()
            .iter()
            .map(|field| field.name().as_str())
            .filter(|name| *name != H3INDEX_COLUMN_NAME)
            .collect();
        let mut table = Self::empty(resolution, &column_names)?;

        for batch in reader {
            let batch = Self::from_arrow_record_batch(&batch?)?;
            table = table.concat(batch)?;
        }

        Ok(table)
    }
}

fn resolution_from_metadata(metadata: &HashMap<String, String>) -> Result<Resolution> {
    let value = metadata
        .get(H3_RESOLUTION_KEY)
        .context(error::MissingSchemaMetadata {
            key: H3_RESOLUTION_KEY,
        })?;

    let resolution: u8 = value.parse().map_err(|_| error::Error::InvalidSchemaMetadata {
        key: H3_RESOLUTION_KEY.to_string(),
        value: value.clone(),
    })?;

    Resolution::try_from(resolution).context(error::InvalidResolution)
}

fn downcast<'a, T: Array + 'static>(
    name: &str,
    array: &'a ArrayRef,
    expected: &DataType,
) -> Result<&'a T> {
    array
        .as_any()
        .downcast_ref::<T>()
        .context(error::InvalidColumnType {
            name,
            expected: expected.to_string(),
            found: array.data_type().to_string(),
        })
}
