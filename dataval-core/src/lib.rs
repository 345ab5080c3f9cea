//! dataval core library - staged valuation of data assets

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Pure computation; no I/O outside config and input loading
// - No global mutable state
// - No randomness, clocks, threads, or async
// - Score maps are ordered; iteration order is explicit
// - Identical input yields byte-for-byte identical output

pub mod config;
pub mod error;
pub mod factor;
pub mod grading;
pub mod input;
pub mod model;
pub mod pipeline;
pub mod profile;
pub mod report;
pub mod risk;
pub mod scoring;
pub mod session;

pub use config::ResolvedConfig;
pub use error::{Result, ValuationError};
pub use input::{run_workflow, EvaluationInput};
pub use pipeline::Composition;
pub use profile::WorkflowProfile;
pub use report::{render_csv, render_json, render_text, ValuationReport};
pub use session::{SessionState, Stage};

use chrono::{DateTime, FixedOffset};

/// Run a complete evaluation and assemble its report
pub fn evaluate(
    input: &EvaluationInput,
    profile: &WorkflowProfile,
    generated_at: DateTime<FixedOffset>,
) -> Result<ValuationReport> {
    let (state, composition) = run_workflow(input, profile)?;
    Ok(ValuationReport::new(&state, &composition, profile, generated_at))
}
