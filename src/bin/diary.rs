use netschool::netschool::helpers::get_config;
use netschool::netschool::models::Args;
use netschool::netschool::run_tool::run;

use std::process::ExitCode;

use clap::Parser;
use log::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    /* Get config and run the requested command */
    let args = Args::parse();
    let config = match get_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("Cannot read config: {}", err);
            return ExitCode::FAILURE;
        }
    };
    info!("Working with diary at {}", config.url);

    match run(&args.command, config).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Diary request failed: {}", err);
            eprintln!("Не удалось получить данные из дневника, попробуйте ещё раз.");
            ExitCode::FAILURE
        }
    }
}
