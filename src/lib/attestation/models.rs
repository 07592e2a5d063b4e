use std::path::PathBuf;

use clap::{command, Parser};
use serde::{Deserialize, Serialize};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
}

/// A model for describing configuration of the attestation tool.
/// Consists of:
/// 1. Address of the diary web application
/// 2. Login, password and school of the diary account
#[derive(Deserialize)]
pub struct Config {
    pub server_url: String,
    pub login: String,
    pub password: String,
    pub school: String,
}

/// Body of the diary web application login request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody<'a> {
    pub login: &'a str,
    pub password: &'a str,
    pub school: &'a str,
    pub is_remember: bool,
}
