//! Valuation pipeline (stage machine)
//!
//! Stages run in order 1..7 but any stage may be entered directly. Each
//! handler takes the current state by reference and returns a new state;
//! a rejected transition leaves the caller's state untouched.
//!
//! Final value:
//! final = base × Π(factor coefficients) × risk coefficient
//!
//! Global invariants enforced:
//! - Leaving stage 1 requires a non-blank data name
//! - A handler only runs while its own stage is current
//! - The report stage recomputes every coefficient from current state, never from a cache
//! - Stage results persist across navigation unless the profile enables reset-on-revisit

use crate::error::{Result, ValuationError};
use crate::factor::{adjust_factor, combined_coefficient, FactorAdjustment, FactorKind};
use crate::input::FactorGrades;
use crate::model::{compute_base_value, ModelInputs, ValuationModel};
use crate::profile::WorkflowProfile;
use crate::risk::{compute_risk_coefficient, RiskAssessment, RiskMode, RiskRow};
use crate::scoring::{score_sliders, score_table};
use crate::session::{
    factor_key, keys, FeasibilityInputs, Metadata, QualityState, RiskState, SessionState, Stage,
};
use serde::Serialize;

/// Move to `target`, enforcing the stage-1 identity gate
pub fn advance_stage(
    state: &SessionState,
    target: Stage,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    let current = state.current_stage;
    if current == Stage::Preparation
        && target != Stage::Preparation
        && !state.metadata.has_identity()
    {
        tracing::warn!(from = %current, to = %target, "blocked: data name is empty");
        return Err(ValuationError::MissingIdentity);
    }

    let mut next = state.clone();
    if profile.reset_on_revisit && target != current && next.has_visited(target) {
        tracing::debug!(stage = %target, "resetting revisited stage");
        clear_stage(&mut next, target);
    }

    next.current_stage = target;
    next.visited.insert(target);
    tracing::debug!(from = %current, to = %target, "stage transition");
    Ok(next)
}

/// Move to a stage by number (sidebar jump)
pub fn jump_to(
    state: &SessionState,
    number: u8,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    advance_stage(state, Stage::from_number(number)?, profile)
}

/// Move to the following stage; the report stage stays put
pub fn next_stage(state: &SessionState, profile: &WorkflowProfile) -> Result<SessionState> {
    let target = state.current_stage.next().unwrap_or(state.current_stage);
    advance_stage(state, target, profile)
}

/// Move to the preceding stage; stage 1 stays put
pub fn previous_stage(state: &SessionState, profile: &WorkflowProfile) -> Result<SessionState> {
    let target = state.current_stage.previous().unwrap_or(state.current_stage);
    advance_stage(state, target, profile)
}

/// Drop the results a stage owns, plus its derived sub-state
fn clear_stage(state: &mut SessionState, stage: Stage) {
    for key in stage.owned_keys() {
        state.scores.remove(*key);
    }
    match stage {
        // Identity is kept; blanking it would re-lock the gate
        Stage::Preparation => {}
        Stage::Feasibility => state.feasibility = FeasibilityInputs::default(),
        Stage::FactorAnalysis => state.factor_blocks.clear(),
        // Model inputs are never cleared
        Stage::ModelSelection => {}
        Stage::QualityAdjustment => state.quality = QualityState::default(),
        Stage::RiskAdjustment => {
            state.risk = RiskState {
                mode: state.risk.mode,
                rows: Vec::new(),
                assessment: None,
            }
        }
        Stage::Report => {}
    }
}

fn ensure_stage(state: &SessionState, stage: Stage) -> Result<()> {
    if state.current_stage == stage {
        Ok(())
    } else {
        Err(ValuationError::StageMismatch {
            requested: stage.number(),
            current: state.current_stage.number(),
        })
    }
}

/// Stage 1: record identity fields
pub fn set_metadata(state: &SessionState, metadata: Metadata) -> Result<SessionState> {
    ensure_stage(state, Stage::Preparation)?;
    let mut next = state.clone();
    next.metadata = metadata;
    Ok(next)
}

/// Stage 2: score the feasibility sliders
///
/// An empty slider list counts as every slider at 0.
pub fn record_feasibility(
    state: &SessionState,
    inputs: FeasibilityInputs,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    ensure_stage(state, Stage::Feasibility)?;

    let sliders = if inputs.sliders.is_empty() {
        vec![0; profile.feasibility.len()]
    } else {
        inputs.sliders.clone()
    };
    let total = score_sliders(&profile.feasibility, &sliders)?;

    let mut next = state.clone();
    next.feasibility = FeasibilityInputs { sliders, ..inputs };
    next.scores.insert(keys::FEASIBILITY.to_string(), total);
    tracing::debug!(score = total, "feasibility scored");
    Ok(next)
}

/// Stage 3: score every factor block
///
/// A block with no grades supplied is scored as all unselected.
pub fn record_factor_grades(
    state: &SessionState,
    grades: &FactorGrades,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    ensure_stage(state, Stage::FactorAnalysis)?;

    let mut next = state.clone();
    for kind in FactorKind::ALL {
        let table = profile.table(kind);
        let supplied = grades.get(kind);
        let selections = if supplied.is_empty() {
            vec![None; table.criteria.len()]
        } else {
            supplied.to_vec()
        };
        let block = score_table(table, &selections)?;
        tracing::debug!(
            factor = %kind,
            score = block.score,
            any_selected = block.any_selected,
            "factor scored"
        );
        next.scores.insert(factor_key(kind).to_string(), block.score);
        next.factor_blocks.insert(kind, block);
    }
    Ok(next)
}

/// Stage 4: choose the model and compute the base value
///
/// Only the chosen model's fields are taken from `inputs`; fields of the
/// other models keep their earlier values.
pub fn select_model(
    state: &SessionState,
    model: ValuationModel,
    inputs: &ModelInputs,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    ensure_stage(state, Stage::ModelSelection)?;

    let mut next = state.clone();
    next.model_choice = model;
    match model {
        ValuationModel::Revenue => {
            next.model_inputs.revenue = inputs.revenue;
            next.model_inputs.cost = inputs.cost;
        }
        ValuationModel::Market => next.model_inputs.market_price = inputs.market_price,
        ValuationModel::WillingnessToPay => next.model_inputs.wtp = inputs.wtp,
    }

    let base = compute_base_value(model, &next.model_inputs, profile.revenue_multiple);
    next.scores.insert(keys::BASE_VALUE.to_string(), base);
    tracing::debug!(model = %model, base_value = base, "base value computed");
    Ok(next)
}

/// Coefficients for the profile's adjustment factors, in profile order
pub fn factor_adjustments(
    state: &SessionState,
    profile: &WorkflowProfile,
) -> Vec<FactorAdjustment> {
    profile
        .adjustment_factors
        .iter()
        .map(|&kind| match state.factor_blocks.get(&kind) {
            Some(block) => adjust_factor(kind, block, &profile.grade_coefficients),
            None => FactorAdjustment::neutral(kind),
        })
        .collect()
}

fn quality_state(
    adjustments: &[FactorAdjustment],
    state: &SessionState,
    profile: &WorkflowProfile,
) -> QualityState {
    let quality = adjustments
        .iter()
        .find(|a| a.kind == FactorKind::Quality)
        .copied()
        .unwrap_or_else(|| match state.factor_blocks.get(&FactorKind::Quality) {
            Some(block) => adjust_factor(FactorKind::Quality, block, &profile.grade_coefficients),
            None => FactorAdjustment::neutral(FactorKind::Quality),
        });
    QualityState {
        score: quality.score,
        grade: quality.grade,
        coefficient: quality.coefficient,
    }
}

/// Stage 5: derive the quality grade and apply the factor coefficients
pub fn apply_quality(state: &SessionState, profile: &WorkflowProfile) -> Result<SessionState> {
    ensure_stage(state, Stage::QualityAdjustment)?;

    let adjustments = factor_adjustments(state, profile);
    let adjusted = state.score(keys::BASE_VALUE) * combined_coefficient(&adjustments);

    let mut next = state.clone();
    next.quality = quality_state(&adjustments, state, profile);
    next.scores.insert(keys::QUALITY_ADJUSTED_VALUE.to_string(), adjusted);
    tracing::debug!(
        grade = ?next.quality.grade,
        coefficient = next.quality.coefficient,
        adjusted_value = adjusted,
        "quality adjustment applied"
    );
    Ok(next)
}

/// Stage 6: classify the risk register and apply its coefficient
pub fn apply_risk(
    state: &SessionState,
    rows: Vec<RiskRow>,
    mode: RiskMode,
    profile: &WorkflowProfile,
) -> Result<SessionState> {
    ensure_stage(state, Stage::RiskAdjustment)?;

    let assessment = compute_risk_coefficient(&rows, mode, &profile.risk)?;
    let adjusted = state.score(keys::QUALITY_ADJUSTED_VALUE) * assessment.coefficient;

    let mut next = state.clone();
    next.scores.insert(keys::RISK_COEFFICIENT.to_string(), assessment.coefficient);
    next.scores.insert(keys::RISK_ADJUSTED_VALUE.to_string(), adjusted);
    tracing::debug!(
        mode = %mode,
        rows = rows.len(),
        coefficient = assessment.coefficient,
        "risk adjustment applied"
    );
    next.risk = RiskState {
        mode,
        rows,
        assessment: Some(assessment),
    };
    Ok(next)
}

/// Pure composition of the final value
pub fn compose_final_value(base: f64, factor_coefficients: &[f64], risk_coefficient: f64) -> f64 {
    base * factor_coefficients.iter().product::<f64>() * risk_coefficient
}

/// Every number behind the final value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Composition {
    pub base_value: f64,
    pub factors: Vec<FactorAdjustment>,
    /// base × Π(factor coefficients)
    pub adjusted_value: f64,
    pub risk: RiskAssessment,
    pub final_value: f64,
}

/// Stage 7: recompose the final value from current state
pub fn compose_report(
    state: &SessionState,
    profile: &WorkflowProfile,
) -> Result<(SessionState, Composition)> {
    ensure_stage(state, Stage::Report)?;

    let base_value = state.score(keys::BASE_VALUE);
    let factors = factor_adjustments(state, profile);
    let coefficients: Vec<f64> = factors.iter().map(|f| f.coefficient).collect();
    let risk = compute_risk_coefficient(&state.risk.rows, state.risk.mode, &profile.risk)?;
    let final_value = compose_final_value(base_value, &coefficients, risk.coefficient);

    let mut next = state.clone();
    next.quality = quality_state(&factors, state, profile);
    next.risk.assessment = Some(risk.clone());
    next.scores.insert(keys::FINAL_VALUE.to_string(), final_value);

    tracing::info!(
        name = %state.metadata.name,
        base_value,
        risk_coefficient = risk.coefficient,
        final_value,
        "valuation composed"
    );

    let composition = Composition {
        base_value,
        adjusted_value: base_value * combined_coefficient(&factors),
        factors,
        risk,
        final_value,
    };
    Ok((next, composition))
}
