// src/lib.rs

//! Metadata harvester library.
//!
//! Crawls THREDDS catalogs, CAS RDF feeds and OAI-PMH repositories, turns
//! what it finds into flat search records and fans them out to index and
//! file sinks.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
