//! Client for a crop-health monitoring backend: capture a field boundary,
//! save it as a parcel, run a satellite health analysis and display the
//! resulting heatmap and statistics.

pub mod analysis;
pub mod cancel;
pub mod capture;
pub mod config;
pub mod error;
pub mod fetch;
pub mod geometry;
pub mod infra;
pub mod location;
pub mod models;
pub mod notify;
pub mod output;
pub mod parcels;
pub mod render;
pub mod services;
pub mod submit;
pub mod workflow;

pub use error::{Error, Result};
