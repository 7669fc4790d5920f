//! Data profiling for uploaded survey datasets.
//!
//! # Features
//!
//! - **Health check**: per-column missing-data percentages with severity bands
//! - **Variable inference**: one typed [`saw_model::Variable`] per column
//! - **Demographic detection**: keyword and value-profile classification
//!
//! Profiling never reads files; it works on an already parsed
//! [`saw_model::Dataset`].

mod demographic;
mod error;
mod health;
mod inference;

// === Error Types ===
pub use error::{ProfileError, Result};

// === Health Check ===
pub use health::{
    DataHealthAnalyzer, HealthEntry, HealthReport, HealthStatus, HealthSummary, MissingSeverity,
};

// === Variable Inference ===
pub use inference::{humanize, infer_variables, split_words};

// === Demographics ===
pub use demographic::{DemographicDetector, DemographicSuggestion};
