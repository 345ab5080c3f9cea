//! Legal risk aggregation
//!
//! Each register row carries probability and impact on a 1..3 scale.
//! severity = probability × impact ∈ [1, 9]
//!
//! Category staircase (inclusive lower bounds):
//! - severity >= 7 → Severe
//! - severity >= 4 → Caution
//! - otherwise     → Watch
//!
//! Aggregation modes:
//! - MaxCategory: coefficient of the worst category present
//! - AverageCategory: coefficient of the category of the mean severity
//! - NormalizedSeverity: upper_bound - range × clamp((Σs - N) / 8N, 0, 1)
//!
//! Global invariants enforced:
//! - Deterministic classification, no overlapping bands
//! - An empty register resolves to the best case, never divides by zero
//! - The applied coefficient always lies within the configured bounds

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity at or above which a row is Caution
pub const CAUTION_SEVERITY: f64 = 4.0;
/// Severity at or above which a row is Severe
pub const SEVERE_SEVERITY: f64 = 7.0;

const MIN_LEVEL: u8 = 1;
const MAX_LEVEL: u8 = 3;
/// Spread between the lowest (1) and highest (9) severity of a single row
const SEVERITY_SPAN: f64 = 8.0;

/// Risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Watch,
    Caution,
    Severe,
}

impl RiskCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskCategory::Watch => "watch",
            RiskCategory::Caution => "caution",
            RiskCategory::Severe => "severe",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a (possibly averaged) severity
pub fn classify_severity(severity: f64) -> RiskCategory {
    if severity >= SEVERE_SEVERITY {
        RiskCategory::Severe
    } else if severity >= CAUTION_SEVERITY {
        RiskCategory::Caution
    } else {
        RiskCategory::Watch
    }
}

/// Category of a single row's severity
pub fn category(severity: u8) -> RiskCategory {
    classify_severity(f64::from(severity))
}

/// One row of the risk register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRow {
    pub label: String,
    pub probability: u8,
    pub impact: u8,
    #[serde(default)]
    pub mitigation: String,
}

impl RiskRow {
    /// Build a row, rejecting levels outside 1..=3
    pub fn new(
        label: impl Into<String>,
        probability: u8,
        impact: u8,
        mitigation: impl Into<String>,
    ) -> Result<Self> {
        let row = RiskRow {
            label: label.into(),
            probability,
            impact,
            mitigation: mitigation.into(),
        };
        row.validate()?;
        Ok(row)
    }

    pub fn validate(&self) -> Result<()> {
        check_level("probability", self.probability)?;
        check_level("impact", self.impact)
    }

    pub fn severity(&self) -> u8 {
        self.probability.saturating_mul(self.impact)
    }

    pub fn category(&self) -> RiskCategory {
        category(self.severity())
    }
}

fn check_level(field: &'static str, value: u8) -> Result<()> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&value) {
        Ok(())
    } else {
        Err(ValuationError::InvalidRiskLevel { field, value })
    }
}

/// Aggregation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskMode {
    #[default]
    MaxCategory,
    AverageCategory,
    NormalizedSeverity,
}

impl RiskMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskMode::MaxCategory => "max_category",
            RiskMode::AverageCategory => "average_category",
            RiskMode::NormalizedSeverity => "normalized_severity",
        }
    }
}

impl fmt::Display for RiskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coefficient applied per category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryCoefficients {
    pub watch: f64,
    pub caution: f64,
    pub severe: f64,
}

impl Default for CategoryCoefficients {
    fn default() -> Self {
        CategoryCoefficients {
            watch: 1.00,
            caution: 0.90,
            severe: 0.80,
        }
    }
}

impl CategoryCoefficients {
    pub fn coefficient(&self, category: RiskCategory) -> f64 {
        match category {
            RiskCategory::Watch => self.watch,
            RiskCategory::Caution => self.caution,
            RiskCategory::Severe => self.severe,
        }
    }
}

/// Deployment-specific risk parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskParams {
    /// Best-case coefficient in normalized-severity mode
    pub upper_bound: f64,
    /// Distance from best to worst case in normalized-severity mode
    pub range: f64,
    pub categories: CategoryCoefficients,
}

impl Default for RiskParams {
    fn default() -> Self {
        RiskParams {
            upper_bound: 1.1,
            range: 0.3,
            categories: CategoryCoefficients::default(),
        }
    }
}

impl RiskParams {
    pub fn lower_bound(&self) -> f64 {
        self.upper_bound - self.range
    }

    /// Bounds any coefficient produced under these parameters must lie in
    pub fn coefficient_bounds(&self, mode: RiskMode) -> (f64, f64) {
        match mode {
            RiskMode::NormalizedSeverity => {
                let lower = self.lower_bound();
                (lower.min(self.upper_bound), lower.max(self.upper_bound))
            }
            RiskMode::MaxCategory | RiskMode::AverageCategory => {
                let c = &self.categories;
                (
                    c.watch.min(c.caution).min(c.severe),
                    c.watch.max(c.caution).max(c.severe),
                )
            }
        }
    }
}

/// Row after classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssessedRow {
    pub label: String,
    pub probability: u8,
    pub impact: u8,
    pub severity: u8,
    pub category: RiskCategory,
    pub mitigation: String,
}

/// Result of aggregating a register
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub mode: RiskMode,
    pub rows: Vec<AssessedRow>,
    pub total_severity: u32,
    /// Category that selected the coefficient (category modes only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<RiskCategory>,
    /// Normalized severity in [0, 1] (normalized mode only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity_norm: Option<f64>,
    pub coefficient: f64,
}

/// Normalize a severity total onto [0, 1]
///
/// Rescales the sum from its minimum (N) to its maximum (9N). N = 0 yields 0.
pub fn normalize_severity(total: u32, rows: usize) -> f64 {
    if rows == 0 {
        return 0.0;
    }
    let n = rows as f64;
    ((f64::from(total) - n) / (SEVERITY_SPAN * n)).clamp(0.0, 1.0)
}

/// Classify every row and aggregate the register into a coefficient
pub fn compute_risk_coefficient(
    rows: &[RiskRow],
    mode: RiskMode,
    params: &RiskParams,
) -> Result<RiskAssessment> {
    let mut assessed = Vec::with_capacity(rows.len());
    for row in rows {
        row.validate()?;
        assessed.push(AssessedRow {
            label: row.label.clone(),
            probability: row.probability,
            impact: row.impact,
            severity: row.severity(),
            category: row.category(),
            mitigation: row.mitigation.clone(),
        });
    }

    let total_severity: u32 = assessed.iter().map(|r| u32::from(r.severity)).sum();

    let (category, severity_norm, raw) = match mode {
        RiskMode::MaxCategory => {
            let worst = assessed
                .iter()
                .map(|r| r.category)
                .max()
                .unwrap_or(RiskCategory::Watch);
            (Some(worst), None, params.categories.coefficient(worst))
        }
        RiskMode::AverageCategory => {
            let mean = if assessed.is_empty() {
                0.0
            } else {
                f64::from(total_severity) / assessed.len() as f64
            };
            let cat = classify_severity(mean);
            (Some(cat), None, params.categories.coefficient(cat))
        }
        RiskMode::NormalizedSeverity => {
            let norm = normalize_severity(total_severity, assessed.len());
            (None, Some(norm), params.upper_bound - params.range * norm)
        }
    };

    let (low, high) = params.coefficient_bounds(mode);

    Ok(RiskAssessment {
        mode,
        rows: assessed,
        total_severity,
        category,
        severity_norm,
        coefficient: raw.max(low).min(high),
    })
}

/// Default legal risk register, every row at probability 2 / impact 2
pub fn default_register() -> Vec<RiskRow> {
    [
        (
            "personal data not de-identified",
            "pseudonymize, obtain consent, run a privacy impact assessment",
        ),
        (
            "content with unverified copyright",
            "confirm rights holders and acquire licenses",
        ),
        (
            "unclear third-party provision terms",
            "amend contracts to state the permitted scope of use",
        ),
        (
            "possible trade secret infringement",
            "establish a confidentiality management plan",
        ),
        (
            "unclear acquisition path",
            "supplement evidence and confirm ownership",
        ),
    ]
    .into_iter()
    .map(|(label, mitigation)| RiskRow {
        label: label.to_string(),
        probability: 2,
        impact: 2,
        mitigation: mitigation.to_string(),
    })
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(levels: &[(u8, u8)]) -> Vec<RiskRow> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &(p, impact))| RiskRow::new(format!("risk {}", i), p, impact, "").unwrap())
            .collect()
    }

    #[test]
    fn test_category_staircase() {
        assert_eq!(category(1), RiskCategory::Watch);
        assert_eq!(category(3), RiskCategory::Watch);
        assert_eq!(category(4), RiskCategory::Caution);
        assert_eq!(category(6), RiskCategory::Caution);
        assert_eq!(category(7), RiskCategory::Severe);
        assert_eq!(category(9), RiskCategory::Severe);
    }

    #[test]
    fn test_invalid_levels_rejected() {
        assert_eq!(
            RiskRow::new("x", 0, 2, "").unwrap_err(),
            ValuationError::InvalidRiskLevel {
                field: "probability",
                value: 0
            }
        );
        assert_eq!(
            RiskRow::new("x", 2, 4, "").unwrap_err(),
            ValuationError::InvalidRiskLevel {
                field: "impact",
                value: 4
            }
        );
    }

    #[test]
    fn test_max_category_mode_picks_worst() {
        let params = RiskParams::default();
        let register = rows(&[(1, 1), (2, 2), (3, 3)]);
        let result = compute_risk_coefficient(&register, RiskMode::MaxCategory, &params).unwrap();
        assert_eq!(result.category, Some(RiskCategory::Severe));
        assert_eq!(result.coefficient, 0.80);

        let mild = rows(&[(1, 1), (1, 3)]);
        let result = compute_risk_coefficient(&mild, RiskMode::MaxCategory, &params).unwrap();
        assert_eq!(result.category, Some(RiskCategory::Watch));
        assert_eq!(result.coefficient, 1.00);
    }

    #[test]
    fn test_average_category_mode() {
        let params = RiskParams::default();
        // severities 1 + 9 → mean 5 → caution
        let register = rows(&[(1, 1), (3, 3)]);
        let result =
            compute_risk_coefficient(&register, RiskMode::AverageCategory, &params).unwrap();
        assert_eq!(result.category, Some(RiskCategory::Caution));
        assert_eq!(result.coefficient, 0.90);
    }

    #[test]
    fn test_normalized_mode_extremes() {
        let params = RiskParams::default();
        let mode = RiskMode::NormalizedSeverity;
        let best = compute_risk_coefficient(&rows(&[(1, 1); 5]), mode, &params).unwrap();
        assert_eq!(best.severity_norm, Some(0.0));
        assert_eq!(best.coefficient, params.upper_bound);

        let worst = compute_risk_coefficient(&rows(&[(3, 3); 5]), mode, &params).unwrap();
        assert_eq!(worst.severity_norm, Some(1.0));
        assert!((worst.coefficient - (params.upper_bound - params.range)).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_mode_alternate_range() {
        let params = RiskParams {
            upper_bound: 1.0,
            range: 0.4,
            categories: CategoryCoefficients::default(),
        };
        let mode = RiskMode::NormalizedSeverity;
        let worst = compute_risk_coefficient(&rows(&[(3, 3); 3]), mode, &params).unwrap();
        assert!((worst.coefficient - 0.6).abs() < 1e-12);

        // five rows at severity 4: (20 - 5) / 40 = 0.375
        let mid = compute_risk_coefficient(&default_register(), mode, &params).unwrap();
        assert_eq!(mid.severity_norm, Some(0.375));
        assert!((mid.coefficient - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_empty_register_is_best_case() {
        let params = RiskParams::default();
        for mode in [
            RiskMode::MaxCategory,
            RiskMode::AverageCategory,
            RiskMode::NormalizedSeverity,
        ] {
            let result = compute_risk_coefficient(&[], mode, &params).unwrap();
            assert_eq!(result.total_severity, 0);
            let expected = match mode {
                RiskMode::NormalizedSeverity => params.upper_bound,
                _ => params.categories.watch,
            };
            assert_eq!(result.coefficient, expected, "mode {}", mode);
        }
        assert_eq!(normalize_severity(0, 0), 0.0);
    }

    #[test]
    fn test_default_register() {
        let register = default_register();
        assert_eq!(register.len(), 5);
        assert!(register.iter().all(|r| r.severity() == 4));
        assert!(register.iter().all(|r| r.category() == RiskCategory::Caution));
    }

    #[test]
    fn test_deserialized_rows_are_validated() {
        let register: Vec<RiskRow> =
            serde_json::from_str(r#"[{"label": "x", "probability": 5, "impact": 1}]"#).unwrap();
        let err = compute_risk_coefficient(&register, RiskMode::MaxCategory, &RiskParams::default())
            .unwrap_err();
        assert!(matches!(err, ValuationError::InvalidRiskLevel { value: 5, .. }));
    }
}
