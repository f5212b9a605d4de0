use std::path::Path;

use gdal::{Dataset, DatasetOptions};
use snafu::ResultExt;

use crate::{error, util::Result};

/// Opens a Gdal Dataset with the given `path` and `dataset_options`.
/// Other crates should use this method for Gdal Dataset access as a workaround to avoid strange errors.
pub fn gdal_open_dataset_ex(path: &Path, dataset_options: DatasetOptions) -> Result<Dataset> {
    #[cfg(debug_assertions)]
    let dataset_options = {
        let mut dataset_options = dataset_options;
        dataset_options.open_flags |= gdal::GdalOpenFlags::GDAL_OF_VERBOSE_ERROR;
        dataset_options
    };

    Dataset::open_ex(path, dataset_options).context(error::CouldNotOpenGdalDataset {
        file_path: path.to_string_lossy().to_string(),
    })
}

/// Sets GDAL config options for the current thread and reverts them on drop.
#[derive(Debug)]
pub struct TemporaryGdalThreadLocalConfigOptions {
    original_configs: Vec<(String, Option<String>)>,
}

impl TemporaryGdalThreadLocalConfigOptions {
    pub fn new(configs: &[(String, String)]) -> Result<Self> {
        let mut original_configs = Vec::with_capacity(configs.len());

        for (key, value) in configs {
            let previous = gdal::config::get_thread_local_config_option(key, "")?;
            let previous = (!previous.is_empty()).then_some(previous);

            gdal::config::set_thread_local_config_option(key, value)?;

            original_configs.push((key.clone(), previous));
        }

        Ok(Self { original_configs })
    }
}

impl Drop for TemporaryGdalThreadLocalConfigOptions {
    fn drop(&mut self) {
        // reverse order, so keys given twice end up with their first previous value
        for (key, value) in self.original_configs.iter().rev() {
            let result = match value {
                Some(value) => gdal::config::set_thread_local_config_option(key, value),
                None => gdal::config::clear_thread_local_config_option(key),
            };

            if let Err(error) = result {
                tracing::warn!("could not restore GDAL config option {key}: {error}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_restores_thread_local_config_options() {
        const KEY: &str = "POPGRID_TEST_OPTION";

        gdal::config::set_thread_local_config_option(KEY, "before").unwrap();

        {
            let _options = TemporaryGdalThreadLocalConfigOptions::new(&[
                (KEY.to_string(), "during".to_string()),
                ("POPGRID_TEST_UNSET".to_string(), "YES".to_string()),
            ])
            .unwrap();

            assert_eq!(
                gdal::config::get_thread_local_config_option(KEY, "").unwrap(),
                "during"
            );
            assert_eq!(
                gdal::config::get_thread_local_config_option("POPGRID_TEST_UNSET", "").unwrap(),
                "YES"
            );
        }

        assert_eq!(
            gdal::config::get_thread_local_config_option(KEY, "").unwrap(),
            "before"
        );
        assert_eq!(
            gdal::config::get_thread_local_config_option("POPGRID_TEST_UNSET", "").unwrap(),
            ""
        );

        gdal::config::clear_thread_local_config_option(KEY).unwrap();
    }

    #[test]
    fn it_reports_the_path_of_missing_datasets() {
        let result =
            gdal_open_dataset_ex(Path::new("/does/not/exist.tif"), DatasetOptions::default());

        assert!(matches!(
            result,
            Err(error::Error::CouldNotOpenGdalDataset { ref file_path, .. }) if file_path == "/does/not/exist.tif"
        ));
    }
}
