use std::path::PathBuf;

use clap::{command, Parser};
use serde::{Deserialize, Serialize};

/// Diary credentials collected from one chat.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Registration {
    pub login: String,
    pub password: String,
    pub school: String,
    pub url: String,
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
}

/// A model for describing configuration of the intake bot.
/// Consists of:
/// 1. Telegram bot token
/// 2. Postgres connection string
#[derive(Deserialize)]
pub struct Config {
    pub telegram_token: String,
    pub database_url: String,
}
