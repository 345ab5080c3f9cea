//! Workflow profiles
//!
//! A profile is a named, versioned bundle of every table and parameter the
//! engine reads. Workflow variants differ only by profile, never by code path.

use crate::factor::FactorKind;
use crate::grading::GradeCoefficientTable;
use crate::model::DEFAULT_REVENUE_MULTIPLE;
use crate::risk::{CategoryCoefficients, RiskMode, RiskParams};
use crate::scoring::{
    business_table, feasibility_criteria, market_table, quality_table, rights_table,
    CriteriaTable, SliderCriterion,
};
use serde::Serialize;

pub const STANDARD_PROFILE: &str = "standard";
pub const EXTENDED_PROFILE: &str = "extended";

/// Names accepted by [`WorkflowProfile::by_name`]
pub const PROFILE_NAMES: &[&str] = &[STANDARD_PROFILE, EXTENDED_PROFILE];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowProfile {
    pub name: String,
    pub version: u32,
    pub feasibility: Vec<SliderCriterion>,
    pub quality: CriteriaTable,
    pub rights: CriteriaTable,
    pub market: CriteriaTable,
    pub business: CriteriaTable,
    pub grade_coefficients: GradeCoefficientTable,
    pub risk_mode: RiskMode,
    pub risk: RiskParams,
    pub revenue_multiple: f64,
    /// Factor blocks whose coefficients multiply into the final value, in order
    pub adjustment_factors: Vec<FactorKind>,
    /// Clear a stage's results when navigation re-enters it
    pub reset_on_revisit: bool,
}

impl WorkflowProfile {
    /// Seven-stage workflow: quality is the only factor, max-category risk,
    /// normalized risk range [0.8, 1.1]
    pub fn standard() -> Self {
        WorkflowProfile {
            name: STANDARD_PROFILE.to_string(),
            version: 1,
            feasibility: feasibility_criteria(),
            quality: quality_table(),
            rights: rights_table(),
            market: market_table(),
            business: business_table(),
            grade_coefficients: GradeCoefficientTable::default(),
            risk_mode: RiskMode::MaxCategory,
            risk: RiskParams::default(),
            revenue_multiple: DEFAULT_REVENUE_MULTIPLE,
            adjustment_factors: vec![FactorKind::Quality],
            reset_on_revisit: false,
        }
    }

    /// All four factor blocks compose multiplicatively; normalized-severity
    /// risk over [0.6, 1.0]
    pub fn extended() -> Self {
        WorkflowProfile {
            name: EXTENDED_PROFILE.to_string(),
            risk_mode: RiskMode::NormalizedSeverity,
            risk: RiskParams {
                upper_bound: 1.0,
                range: 0.4,
                categories: CategoryCoefficients::default(),
            },
            adjustment_factors: FactorKind::ALL.to_vec(),
            ..Self::standard()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            STANDARD_PROFILE => Some(Self::standard()),
            EXTENDED_PROFILE => Some(Self::extended()),
            _ => None,
        }
    }

    /// Criteria table graded for a factor block
    pub fn table(&self, kind: FactorKind) -> &CriteriaTable {
        match kind {
            FactorKind::Quality => &self.quality,
            FactorKind::Rights => &self.rights,
            FactorKind::Market => &self.market,
            FactorKind::Business => &self.business,
        }
    }
}

impl Default for WorkflowProfile {
    fn default() -> Self {
        Self::standard()
    }
}
