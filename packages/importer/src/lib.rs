//! Feldplan Importer - Download the BLV plant protection product registry.
//!
//! This crate fetches the published Pflanzenschutzmittelverzeichnis (the
//! Swiss federal registry of plant protection products) as a ZIP-compressed
//! XML export, extracts the payload, and parses it into plain data types.
//! Persisting the result is the backend's job; this crate has no database
//! dependency and can be used standalone to inspect the live feed.
//!
//! # Architecture
//!
//! - [`config`]: archive URL and HTTP constants
//! - [`error`]: error types and Result alias
//! - [`http`]: blocking HTTP client for the archive download
//! - [`archive`]: ZIP extraction and character decoding
//! - [`xml`]: namespace-agnostic node helpers
//! - [`parser`]: registry XML to [`types::ParsedRegistry`]
//! - [`fetch`]: end-to-end download + parse
//! - [`cli`]: command-line interface

pub mod archive;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod http;
pub mod parser;
pub mod types;
pub mod xml;

pub use error::{ImporterError, Result};
pub use fetch::fetch_registry;
pub use types::{MetaEntry, ParsedIndication, ParsedProduct, ParsedRegistry};
