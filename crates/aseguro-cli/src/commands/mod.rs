//! CLI command handlers

pub mod ask;
pub mod cache;
pub mod chat;
pub mod classify;
pub mod compare;
pub mod ingest;
pub mod status;
