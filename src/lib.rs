//! Docconv Server Library
//!
//! The HTTP service lives in main.rs; everything it is built from is
//! exposed here so integration tests can assemble the router with mock
//! converters.
//!
//! # Modules
//!
//! - `convert`: the conversion pipeline (input, format resolution, temp files)
//! - `converter`: pandoc and LibreOffice subprocess backends
//! - `routes`: HTTP endpoints

pub mod config;
pub mod convert;
pub mod converter;
pub mod error;
pub mod routes;
pub mod state;
