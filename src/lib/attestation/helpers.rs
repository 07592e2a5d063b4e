use std::error::Error;

use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use log::{info, warn};
use reqwest::{
    header::{HeaderMap, COOKIE, SET_COOKIE},
    Client,
};

use super::models::{Args, Config, LoginBody};

pub fn get_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    info!(
        "Reading config from {}",
        std::path::absolute(&args.config_json_path)?.display()
    );
    let config: Config = Figment::new()
        .merge(Json::file(&args.config_json_path))
        .merge(Env::prefixed("ATTESTATION_"))
        .extract()?;
    Ok(config)
}

/// Joins the `name=value` part of every `Set-Cookie` header into one `Cookie` value.
pub fn cookie_extractor(headers: &HeaderMap) -> String {
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .map(str::trim)
        .filter(|pair| !pair.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Logs into the diary web application and returns a fresh session cookie.
pub async fn update_user_cookie(
    http_client: &Client,
    config: &Config,
) -> Result<String, Box<dyn Error>> {
    info!("Updating cookie of user '{}'", config.login);
    let response = http_client
        .post(&config.server_url)
        .json(&LoginBody {
            login: &config.login,
            password: &config.password,
            school: &config.school,
            is_remember: true,
        })
        .send()
        .await?;

    if !response.status().is_success() {
        warn!(
            "Diary answered {} instead of a session for '{}'",
            response.status(),
            config.login
        );
        return Err(format!("diary login failed with {}", response.status()).into());
    }

    let cookie = cookie_extractor(response.headers());
    if cookie.is_empty() {
        return Err("diary login answer has no cookies".into());
    }
    Ok(cookie)
}

/// Fetches the average marks report and returns its body text untouched,
/// key order and number formatting included.
pub async fn get_attestation_from_diary(
    http_client: &Client,
    server_url: &str,
    cookie: &str,
) -> Result<String, reqwest::Error> {
    let path = format!(
        "{}/app/school/reports/studentaveragemark",
        server_url.trim_end_matches('/')
    );
    info!("Getting attestation from {}", path);
    http_client
        .get(path)
        .header(COOKIE, cookie)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
