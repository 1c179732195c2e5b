use std::{error::Error, path::Path, process};

use aemet_loader::{
    api::aemet::{
        daily_values::DailyValuesApi,
        lib_opendata::{HttpTransport, OpenDataClient},
    },
    config::{Config, RunSettings},
    db::prod_db::ProdDb,
    etl::Pipeline,
    interval::window::WindowSplit,
    utils::confirm::{AutoConfirm, Confirm, Prompt},
};
use clap::Parser;
use log::{error, info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// AEMET climatological station id.  Default is Madrid, Retiro
    #[arg(long, default_value = "3195")]
    station: String,

    /// First year to load
    #[arg(long, default_value_t = 2015)]
    start_year: i16,

    /// Last year to load, inclusive
    #[arg(long, default_value_t = 2019)]
    end_year: i16,

    /// Request size, half-year or full-year
    #[arg(long, default_value = "half-year")]
    split: WindowSplit,

    /// Don't load the field metadata
    #[arg(long)]
    no_metadata: bool,

    /// Don't ask before replacing the tables
    #[arg(short, long)]
    yes: bool,
}

/// Replace the yearly tables of daily values of an AEMET station.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stdout)
        .init();
    let env_file = format!(".env/{}.env", args.env);
    if let Err(e) = dotenvy::from_path(Path::new(&env_file)) {
        warn!("Could not read {}: {}", env_file, e);
    }

    let config = Config::from_env()?;
    let settings = RunSettings::new(
        &args.station,
        (args.start_year..=args.end_year).collect(),
        args.split,
        !args.no_metadata,
    )?;
    info!(
        "Loading station {} for years {:?} in {} windows",
        settings.station_id, settings.years, settings.split
    );

    let client = OpenDataClient::new(HttpTransport::default(), &config.base_url, &config.api_key);
    let api = DailyValuesApi::new(client, &settings.station_id);
    let archive = ProdDb::aemet_daily_values(&config, &settings.station_id);
    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoConfirm)
    } else {
        Box::new(Prompt::stdio())
    };

    let mut pipeline = Pipeline::new(api, archive, confirm, settings);
    match pipeline.run() {
        Ok(report) => {
            report.log_summary();
            Ok(())
        }
        Err(e) => {
            error!("{}", e);
            process::exit(1);
        }
    }
}
