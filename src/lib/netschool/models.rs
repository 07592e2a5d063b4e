use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{command, Parser, Subcommand};
use serde::Deserialize;

use super::client::SchoolRef;

pub mod announcement_model;
pub mod diary_model;
pub mod school_model;

/// A model for describing ARGS of the diary tool.
/// Consists of:
/// 1. Path to config.json with the diary address and the credentials.
/// 2. The diary operation to run.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[arg(long, value_name = "FILE", default_value = "config.json")]
    pub config_json_path: PathBuf,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Lessons and assignments of a week (the current one by default)
    Diary {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Overdue mandatory assignments
    Overdue {
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    Announcements {
        #[arg(long, default_value_t = -1)]
        take: i64,
    },
    /// Files attached to an assignment
    Attachments { assignment_id: i64 },
    /// Card of the school of the logged in user
    School,
    /// Schools found by name
    Schools {
        #[arg(long)]
        name: Option<String>,
    },
    DownloadAttachment {
        attachment_id: i64,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    DownloadProfilePicture {
        user_id: i64,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
}

/// A model for describing configuration of the diary tool.
/// Consists of:
/// 1. Diary address, e.g. `https://sgo.edu-74.ru`
/// 2. Login and password of the diary account
/// 3. School short name or numeric id
/// 4. Optional request timeout in seconds (fractions allowed), `0` means "retry forever"
#[derive(Deserialize)]
pub struct Config {
    pub url: String,
    pub login: String,
    pub password: String,
    pub school: SchoolRef,
    pub requests_timeout: Option<f64>,
}
