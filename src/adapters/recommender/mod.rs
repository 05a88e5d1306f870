//! AI Recommendation Service Adapter
//!
//! HTTP client for the external yield-prediction service. The engine
//! consumes its output as an opaque weight vector; everything else the
//! service returns (predicted yields, risk scores, confidence) is
//! observability-only.

pub mod client;

pub use client::{Recommendation, RecommenderClient, RecommenderError};
