//! `sellout-recon`: sell-out reconciliation engine.
//!
//! Pure engine crate: receives normalized sales batches and master rows,
//! returns the enriched fact table and the per-store distribution.
//! No file or database IO.

pub mod calendar;
pub mod config;
pub mod dimension;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod model;
pub mod precision;

pub use config::PipelineConfig;
pub use engine::run;
pub use error::ReconError;
pub use model::{MasterRow, Reconciliation, SalesBatch, SalesFact, SalesRecord};
