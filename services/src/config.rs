use crate::error::{self, Result};
use config::{Config, Environment, File, FileFormat};
use popgrid_operators::source::{DatasetColumn, GdalRasterSourceParameters};
use serde::Deserialize;
use snafu::ResultExt;
use std::path::PathBuf;
use std::sync::{LazyLock, RwLock};

/// Settings shipped with the binary, overridden by `Settings.toml` and the environment
const DEFAULT_SETTINGS: &str = include_str!("../Settings-default.toml");

static SETTINGS: LazyLock<std::result::Result<RwLock<Config>, String>> =
    LazyLock::new(init_settings);

fn init_settings() -> std::result::Result<RwLock<Config>, String> {
    let mut settings =
        Config::builder().add_source(File::from_str(DEFAULT_SETTINGS, FileFormat::Toml));

    let dir = retrieve_settings_dir().map_err(|error| error.to_string())?;

    #[cfg(test)]
    let files = ["Settings-test.toml"];

    #[cfg(not(test))]
    let files = ["Settings.toml"];

    let files: Vec<File<_, _>> = files
        .iter()
        .map(|f| dir.join(f))
        .filter(|p| p.exists())
        .map(File::from)
        .collect();

    settings = settings.add_source(files);

    // Override config with environment variables that start with `POPGRID__`,
    // e.g. `POPGRID__LOGGING__LOG_SPEC=debug`
    // Note: Since variables contain underscores, we need to use something different
    // for separating groups, for instance double underscores `__`
    settings = settings.add_source(Environment::with_prefix("popgrid").separator("__"));

    settings
        .build()
        .map(RwLock::new)
        .map_err(|error| error.to_string())
}

fn retrieve_settings_dir() -> Result<PathBuf> {
    std::env::current_dir().context(error::MissingWorkingDirectory)
}

fn settings() -> Result<&'static RwLock<Config>> {
    SETTINGS
        .as_ref()
        .map_err(|message| error::Error::SettingsUnavailable {
            message: message.clone(),
        })
}

#[cfg(test)]
pub fn set_config<T>(key: &str, value: T) -> Result<()>
where
    T: Into<config::Value>,
{
    let mut settings = settings()?
        .write()
        .map_err(|_error| error::Error::ConfigLockFailed)?;

    let builder = Config::builder()
        .add_source(settings.clone())
        .set_override(key, value)
        .context(error::Config)?;

    *settings = builder.build().context(error::Config)?;
    Ok(())
}

pub fn get_config<'a, T>(key: &str) -> Result<T>
where
    T: Deserialize<'a>,
{
    settings()?
        .read()
        .map_err(|_error| error::Error::ConfigLockFailed)?
        .get::<T>(key)
        .context(error::Config)
}

pub fn get_config_element<'a, T>() -> Result<T>
where
    T: ConfigElement + Deserialize<'a>,
{
    get_config(T::KEY)
}

pub trait ConfigElement {
    const KEY: &'static str;
}

#[derive(Debug, Deserialize)]
pub struct Logging {
    pub log_spec: String,
    pub raw_error_messages: bool,
}

impl ConfigElement for Logging {
    const KEY: &'static str = "logging";
}

#[derive(Debug, Deserialize)]
pub struct RasterSource {
    pub path_template: String,
    pub gdal_config_options: Option<Vec<(String, String)>>,
    pub read_block_rows: usize,
    pub rasterband_channel: usize,
}

impl ConfigElement for RasterSource {
    const KEY: &'static str = "raster_source";
}

impl From<RasterSource> for GdalRasterSourceParameters {
    fn from(value: RasterSource) -> Self {
        Self {
            path_template: value.path_template,
            gdal_config_options: value.gdal_config_options,
            read_block_rows: value.read_block_rows,
            rasterband_channel: value.rasterband_channel,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Output {
    pub vector_layer_name: String,
}

impl ConfigElement for Output {
    const KEY: &'static str = "output";
}

/// The datasets to convert and their output columns, in column order
#[derive(Debug, Deserialize)]
#[serde(transparent)]
pub struct Datasets(pub Vec<DatasetColumn>);

impl ConfigElement for Datasets {
    const KEY: &'static str = "datasets";
}
