//! Telegram intake of diary credentials: a per-chat prompt sequence and the
//! storage the completed registrations end up in.
pub mod conversation;
pub mod helpers;
pub mod models;
pub mod user_store;
