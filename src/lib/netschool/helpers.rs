use std::{
    error::Error,
    time::{Duration, TryFromFloatSecsError},
};

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use encoding_rs::WINDOWS_1251;
use figment::{
    providers::{Env, Format, Json},
    Figment,
};
use log::info;
use md5::{Digest, Md5};
use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

use crate::netschool::{
    models::{Args, Config},
    requester::RequestTimeout,
};

/// NetSchool sends dates as midnight timestamps, e.g. `2023-09-04T00:00:00`.
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
pub const TIME_FORMAT: &str = "%H:%M";
/// `%.f` also accepts a missing fractional part.
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

pub fn get_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    info!(
        "Reading config from {}",
        std::path::absolute(&args.config_json_path)?.display()
    );
    let config: Config = Figment::new()
        .merge(Json::file(&args.config_json_path))
        .merge(Env::prefixed("NS_"))
        .extract()?;
    Ok(config)
}

/// Converts the configured timeout in seconds, fractions allowed. `0` selects
/// [`RequestTimeout::Unbounded`], a negative or non-finite value is an error.
pub fn requests_timeout(
    seconds: Option<f64>,
) -> Result<Option<RequestTimeout>, TryFromFloatSecsError> {
    seconds
        .map(|seconds| Duration::try_from_secs_f64(seconds).map(RequestTimeout::from))
        .transpose()
}

/// Login metadata goes back to the server as form fields; `null` becomes an
/// empty field.
pub fn form_value(value: Value) -> String {
    match value {
        Value::String(value) => value,
        Value::Null => String::new(),
        value => value.to_string(),
    }
}

/// Returns `(pw2, pw)` of the login form: `pw2` is the MD5 of the salt
/// followed by the MD5 of the windows-1251 encoded password, `pw` is `pw2`
/// cut to the password length.
pub fn encode_password(password: &str, salt: &str) -> (String, String) {
    let (cp1251_password, _, _) = WINDOWS_1251.encode(password);
    let encoded_password = format!("{:x}", Md5::digest(cp1251_password.as_ref()));
    let pw2 = format!(
        "{:x}",
        Md5::digest(format!("{}{}", salt, encoded_password).as_bytes())
    );
    let pw = pw2.chars().take(password.chars().count()).collect();
    (pw2, pw)
}

/// Fills the missing ends of a diary window: Monday of the week of `today`
/// and five days after the start.
pub fn week_bounds(
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    let start = start.unwrap_or_else(|| {
        today - Days::new(u64::from(today.weekday().num_days_from_monday()))
    });
    let end = end.unwrap_or_else(|| start + Days::new(5));
    (start, end)
}

pub fn deserialize_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, DATE_FORMAT)
        .map(|date_time| date_time.date())
        .map_err(|err| de::Error::custom(format!("bad date {:?}: {}", raw, err)))
}

pub fn deserialize_time<'de, D>(deserializer: D) -> Result<NaiveTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveTime::parse_from_str(&raw, TIME_FORMAT)
        .map_err(|err| de::Error::custom(format!("bad time {:?}: {}", raw, err)))
}

pub fn deserialize_date_time<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT)
        .map_err(|err| de::Error::custom(format!("bad date and time {:?}: {}", raw, err)))
}

#[cfg(test)]
#[path = "tests/tests.rs"]
mod tests;
