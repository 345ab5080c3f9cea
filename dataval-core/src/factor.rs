//! Factor adjustment
//!
//! Turns a scored criteria table into a multiplicative coefficient:
//! score → letter band → coefficient.
//!
//! Global invariants enforced:
//! - Coefficients compose by multiplication; the identity is 1.0
//! - A block with no selected grades resolves to exactly 1.0
//! - A block graded all-C resolves to the E coefficient, not to 1.0

use crate::grading::{score_to_grade, GradeCoefficientTable, Letter};
use crate::scoring::TableScore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Independent factor blocks graded in the factor-analysis stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorKind {
    Quality,
    Rights,
    Market,
    Business,
}

impl FactorKind {
    pub const ALL: [FactorKind; 4] = [
        FactorKind::Quality,
        FactorKind::Rights,
        FactorKind::Market,
        FactorKind::Business,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FactorKind::Quality => "quality",
            FactorKind::Rights => "rights",
            FactorKind::Market => "market",
            FactorKind::Business => "business",
        }
    }
}

impl fmt::Display for FactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coefficient derived from one factor block
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FactorAdjustment {
    pub kind: FactorKind,
    pub score: f64,
    /// None when no grade in the block was selected
    pub grade: Option<Letter>,
    pub coefficient: f64,
}

impl FactorAdjustment {
    /// Neutral adjustment for a block with nothing selected
    pub fn neutral(kind: FactorKind) -> Self {
        FactorAdjustment {
            kind,
            score: 0.0,
            grade: None,
            coefficient: 1.0,
        }
    }

    pub fn apply(&self, value: f64) -> f64 {
        value * self.coefficient
    }
}

/// Derive the adjustment for a scored block
///
/// `any_selected` is what separates "nothing graded" (1.0) from "graded
/// all C" (E band); both produce a raw score of 0.
pub fn adjust_factor(
    kind: FactorKind,
    block: &TableScore,
    table: &GradeCoefficientTable,
) -> FactorAdjustment {
    if !block.any_selected {
        return FactorAdjustment::neutral(kind);
    }

    let grade = score_to_grade(block.score);
    FactorAdjustment {
        kind,
        score: block.score,
        grade: Some(grade),
        coefficient: table.coefficient(grade),
    }
}

/// Product of coefficients; 1.0 for an empty slice
pub fn combined_coefficient(adjustments: &[FactorAdjustment]) -> f64 {
    adjustments.iter().map(|a| a.coefficient).product()
}
