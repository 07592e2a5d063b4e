//! Forwarding of the diary's "average marks" report, authorized with a
//! session cookie of the diary web application.
pub mod helpers;
pub mod models;
