//! Client for the NetSchool electronic diary REST API (`/webapi`).
pub mod client;
pub mod errors;
pub mod helpers;
pub mod models;
pub mod requester;
pub mod run_tool;

pub use client::{NetSchoolApi, SchoolRef};
pub use errors::NetSchoolError;
pub use requester::RequestTimeout;
