use crate::config::Logging;
use crate::error::{self, Result};
use snafu::ResultExt;
use tracing_subscriber::layer::Filter;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer};

/// Installs the global tracing subscriber and routes GDAL's messages into it.
pub fn init_logging(logging_config: &Logging) -> Result<()> {
    reroute_gdal_logging();
    configure_error_report_formatting(logging_config);

    let console_filter =
        EnvFilter::try_new(&logging_config.log_spec).context(error::InvalidLogSpec {
            log_spec: &logging_config.log_spec,
        })?;

    tracing_subscriber::Registry::default()
        .with(console_layer_with_filter(console_filter))
        .try_init()
        .context(error::LoggerInstallation)
}

fn console_layer_with_filter<S, F: Filter<S> + 'static>(filter: F) -> impl Layer<S>
where
    S: tracing::Subscriber,
    for<'a> S: LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_file(false)
        .with_target(true)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(filter)
}

/// We install a GDAL error handler that logs all messages with our log macros.
fn reroute_gdal_logging() {
    gdal::config::set_error_handler(|error_type, error_num, error_msg| {
        const LOG_TARGET: &str = "GDAL";
        match error_type {
            gdal::errors::CplErrType::None => {
                tracing::info!(target: LOG_TARGET, "GDAL None {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Debug => {
                tracing::debug!(target: LOG_TARGET, "GDAL Debug {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Warning => {
                tracing::warn!(target: LOG_TARGET, "GDAL Warning {error_num}: {error_msg}");
            }
            gdal::errors::CplErrType::Failure | gdal::errors::CplErrType::Fatal => {
                tracing::error!(target: LOG_TARGET, "GDAL {error_type:?} {error_num}: {error_msg}");
            }
        }
    });
}

fn configure_error_report_formatting(logging_config: &Logging) {
    if logging_config.raw_error_messages {
        // there is no way to configure snafu::Report other than through env variables
        unsafe { std::env::set_var("SNAFU_RAW_ERROR_MESSAGES", "1") };
    }
}
