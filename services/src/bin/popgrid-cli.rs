use clap::{Parser, Subcommand};
use popgrid_services::cli::{Convert, convert};
use popgrid_services::config::{self, get_config_element};
use popgrid_services::error::Result;
use popgrid_services::logging::init_logging;

/// CLI for converting population rasters into H3 hexagon tiles
#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Converts population rasters within an area of interest into hexagon tiles
    Convert(Convert),
}

impl Commands {
    fn execute(self) -> Result<()> {
        let logging_config: config::Logging = get_config_element()?;
        init_logging(&logging_config)?;

        match self {
            Commands::Convert(params) => convert(params).map(|_summary| ()),
        }
    }
}

#[allow(clippy::print_stderr)]
fn main() {
    let cli = Cli::parse();

    if let Err(err) = cli.command.execute() {
        eprintln!("Error: {}", snafu::Report::from_error(err));
        std::process::exit(1);
    }
}
