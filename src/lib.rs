//! Sourcing - Marketplace Product Sourcing
//! 
//! Finds wholesale listings on a Chinese B2B marketplace for construction
//! materials described in French: image-first search with keyword fallback,
//! term and title translation, quality ranking and rate-limited batches.

pub mod cli;
pub mod config;
pub mod currency;
pub mod error;
pub mod marketplace;
pub mod model;
pub mod ranking;
pub mod search;
pub mod translate;
pub mod workflow;
