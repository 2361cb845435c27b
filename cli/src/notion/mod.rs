//! Typed client for the Notion REST API.

mod client;
pub mod types;

pub use client::{NotionClient, DEFAULT_PARALLELISM};
