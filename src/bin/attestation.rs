use netschool::attestation::helpers::{get_attestation_from_diary, get_config, update_user_cookie};
use netschool::attestation::models::Args;

use std::process::ExitCode;

use clap::Parser;
use log::error;

#[tokio::main]
async fn main() -> ExitCode {
    /* Setup logging */
    env_logger::builder()
        .target(env_logger::Target::Stdout)
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let args = Args::parse();
    let config = match get_config(&args) {
        Ok(config) => config,
        Err(err) => {
            error!("Cannot read config: {}", err);
            return ExitCode::FAILURE;
        }
    };
    let http_client = reqwest::Client::new();

    /* Log in to get a cookie, then forward the report request with it */
    let cookie = match update_user_cookie(&http_client, &config).await {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Cannot update cookie of '{}': {}", config.login, err);
            eprintln!("Не удалось войти в дневник, попробуйте ещё раз.");
            return ExitCode::FAILURE;
        }
    };
    match get_attestation_from_diary(&http_client, &config.server_url, &cookie).await {
        Ok(attestation) => {
            println!("{}", attestation);
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!("Cannot get attestation: {}", err);
            eprintln!("Не удалось получить ведомость, попробуйте ещё раз.");
            ExitCode::FAILURE
        }
    }
}
