//! Exoscope - Kepler KOI dashboard toolkit
//!
//! Chart aggregation over the KOI dataset, a typed client for the remote
//! ML service and the Gemini API, and the HTTP relay that fronts them.

pub mod analysis;
pub mod cli;
pub mod client;
pub mod config;
pub mod models;
pub mod relay;
pub mod report;
