//! Batch evaluation input
//!
//! One JSON document carries the user inputs of every stage, so a full
//! valuation can run without interaction.
//!
//! Global invariants enforced:
//! - The document drives the same stage machine as interactive use
//! - `null` grades are unselected, never coerced to C
//! - A missing risk register means the default register; an empty list means no risks

use crate::error::Result;
use crate::factor::FactorKind;
use crate::grading::Grade;
use crate::model::{ModelInputs, ValuationModel};
use crate::pipeline::{
    advance_stage, apply_quality, apply_risk, compose_report, record_factor_grades,
    record_feasibility, select_model, set_metadata, Composition,
};
use crate::profile::WorkflowProfile;
use crate::risk::{default_register, RiskMode, RiskRow};
use crate::session::{FeasibilityInputs, Metadata, SessionState, Stage};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Grades for every factor block, in criterion order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FactorGrades {
    pub quality: Vec<Option<Grade>>,
    pub rights: Vec<Option<Grade>>,
    pub market: Vec<Option<Grade>>,
    pub business: Vec<Option<Grade>>,
}

impl FactorGrades {
    pub fn get(&self, kind: FactorKind) -> &[Option<Grade>] {
        match kind {
            FactorKind::Quality => &self.quality,
            FactorKind::Rights => &self.rights,
            FactorKind::Market => &self.market,
            FactorKind::Business => &self.business,
        }
    }
}

/// Model choice and the raw inputs for it
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSection {
    pub choice: ValuationModel,
    pub inputs: ModelInputs,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RiskSection {
    /// Overrides the profile's aggregation mode
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RiskMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<RiskRow>>,
}

impl RiskSection {
    pub fn rows_or_default(&self) -> Vec<RiskRow> {
        self.rows.clone().unwrap_or_else(default_register)
    }
}

/// Every stage's inputs for one dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationInput {
    pub metadata: Metadata,
    #[serde(default)]
    pub feasibility: FeasibilityInputs,
    #[serde(default)]
    pub factors: FactorGrades,
    #[serde(default)]
    pub model: ModelSection,
    #[serde(default)]
    pub risk: RiskSection,
}

impl EvaluationInput {
    /// Starter document printed by `dataval template`
    pub fn template() -> Self {
        EvaluationInput {
            metadata: Metadata {
                name: "regional foot traffic".to_string(),
                owner: "data platform team".to_string(),
                description: "hourly pedestrian counts from street sensors".to_string(),
                ..Metadata::default()
            },
            feasibility: FeasibilityInputs {
                sliders: vec![3, 3, 3],
                purpose: "retail site selection".to_string(),
                scope: "metro area, 2 years of history".to_string(),
                audience: "commercial real estate analysts".to_string(),
            },
            factors: FactorGrades {
                quality: vec![Some(Grade::B); 5],
                rights: vec![Some(Grade::B); 7],
                market: vec![Some(Grade::B); 6],
                business: vec![Some(Grade::B); 6],
            },
            model: ModelSection {
                choice: ValuationModel::Revenue,
                inputs: ModelInputs {
                    revenue: 1_000_000.0,
                    cost: 400_000.0,
                    ..ModelInputs::default()
                },
            },
            risk: RiskSection {
                mode: None,
                rows: Some(default_register()),
            },
        }
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize evaluation input")
    }
}

/// Load an evaluation input document
pub fn load_input(path: &Path) -> anyhow::Result<EvaluationInput> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse input file: {}", path.display()))
}

/// Drive the stage machine from stage 1 through 7
pub fn run_workflow(
    input: &EvaluationInput,
    profile: &WorkflowProfile,
) -> Result<(SessionState, Composition)> {
    let state = SessionState::new(profile);
    let state = set_metadata(&state, input.metadata.clone())?;

    let state = advance_stage(&state, Stage::Feasibility, profile)?;
    let state = record_feasibility(&state, input.feasibility.clone(), profile)?;

    let state = advance_stage(&state, Stage::FactorAnalysis, profile)?;
    let state = record_factor_grades(&state, &input.factors, profile)?;

    let state = advance_stage(&state, Stage::ModelSelection, profile)?;
    let state = select_model(&state, input.model.choice, &input.model.inputs, profile)?;

    let state = advance_stage(&state, Stage::QualityAdjustment, profile)?;
    let state = apply_quality(&state, profile)?;

    let state = advance_stage(&state, Stage::RiskAdjustment, profile)?;
    let mode = input.risk.mode.unwrap_or(profile.risk_mode);
    let state = apply_risk(&state, input.risk.rows_or_default(), mode, profile)?;

    let state = advance_stage(&state, Stage::Report, profile)?;
    compose_report(&state, profile)
}
