// src/models/mod.rs

//! Domain models for the harvester.
//!
//! This module contains the data structures shared by crawlers, sinks and
//! the publishing services.

mod config;
mod record;
mod repository;

// Re-export all public types
pub use config::{
    Config, ENV_INDEX_URL, ENV_OUTPUT_DIR, HttpConfig, IndexConfig, OutputConfig, ThreddsConfig,
    UrlStrategy,
};
pub use record::{Record, RecordBuilder, RecordType, field};
pub use repository::{RepositoryRef, RepositoryType};
