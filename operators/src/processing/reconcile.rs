use crate::error;
use crate::source::FetchedTable;
use crate::util::Result;
use h3o::Resolution;
use popgrid_datatypes::hexgrid::HexTable;
use snafu::ensure;

/// Fails if `target` is finer than the `conversion` resolution of `dataset`.
pub fn ensure_target_resolution(
    dataset: &str,
    conversion: Resolution,
    target: Resolution,
) -> Result<()> {
    ensure!(
        target <= conversion,
        error::UpscalingNotSupported {
            dataset,
            target,
            conversion,
        }
    );
    Ok(())
}

/// Brings the fetched tables to the `target` resolution and joins them into one table.
///
/// Coarser targets are reached by summing all cells with the same ancestor. Cells missing in
/// a dataset get the value `0.0`. The result does not depend on the order of `fetched`
/// besides its column order.
pub fn reconcile(fetched: Vec<FetchedTable>, target: Resolution) -> Result<HexTable> {
    let mut merged: Option<HexTable> = None;

    for FetchedTable { dataset, table } in fetched {
        ensure_target_resolution(&dataset, table.resolution(), target)?;

        let table = table.to_resolution(target)?;

        merged = Some(match merged {
            Some(merged) => merged.outer_join(&table)?,
            None => table,
        });
    }

    merged.ok_or(error::Error::NoDatasets)
}
