//! Session state for one valuation run
//!
//! Global invariants enforced:
//! - `current_stage` is always a valid stage (1..=7)
//! - Scores are keyed by name in a `BTreeMap` for deterministic ordering
//! - Each score key is owned by exactly one stage
//! - State is a plain value; transitions return a new state

use crate::error::{Result, ValuationError};
use crate::factor::FactorKind;
use crate::grading::{GradeCoefficientTable, Letter};
use crate::model::{ModelInputs, ValuationModel};
use crate::profile::WorkflowProfile;
use crate::risk::{RiskAssessment, RiskMode, RiskRow};
use crate::scoring::TableScore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Named entries in `SessionState::scores`
pub mod keys {
    pub const FEASIBILITY: &str = "feasibility";
    pub const DQI: &str = "dqi";
    pub const RIGHTS: &str = "rights";
    pub const MARKET: &str = "market";
    pub const BUSINESS: &str = "business";
    pub const BASE_VALUE: &str = "base_value";
    pub const QUALITY_ADJUSTED_VALUE: &str = "quality_adjusted_value";
    pub const RISK_COEFFICIENT: &str = "risk_coefficient";
    pub const RISK_ADJUSTED_VALUE: &str = "risk_adjusted_value";
    pub const FINAL_VALUE: &str = "final_value";
}

/// Workflow stages in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Stage {
    Preparation,
    Feasibility,
    FactorAnalysis,
    ModelSelection,
    QualityAdjustment,
    RiskAdjustment,
    Report,
}

impl Stage {
    pub const ALL: [Stage; 7] = [
        Stage::Preparation,
        Stage::Feasibility,
        Stage::FactorAnalysis,
        Stage::ModelSelection,
        Stage::QualityAdjustment,
        Stage::RiskAdjustment,
        Stage::Report,
    ];

    /// 1-based stage number
    pub fn number(&self) -> u8 {
        match self {
            Stage::Preparation => 1,
            Stage::Feasibility => 2,
            Stage::FactorAnalysis => 3,
            Stage::ModelSelection => 4,
            Stage::QualityAdjustment => 5,
            Stage::RiskAdjustment => 6,
            Stage::Report => 7,
        }
    }

    pub fn from_number(value: u8) -> Result<Self> {
        Stage::ALL
            .iter()
            .copied()
            .find(|s| s.number() == value)
            .ok_or(ValuationError::InvalidStage { value })
    }

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Preparation => "preparation",
            Stage::Feasibility => "business feasibility",
            Stage::FactorAnalysis => "factor analysis",
            Stage::ModelSelection => "model selection",
            Stage::QualityAdjustment => "quality adjustment",
            Stage::RiskAdjustment => "legal risk adjustment",
            Stage::Report => "pricing and report",
        }
    }

    pub fn next(&self) -> Option<Stage> {
        Stage::from_number(self.number() + 1).ok()
    }

    pub fn previous(&self) -> Option<Stage> {
        self.number()
            .checked_sub(1)
            .and_then(|n| Stage::from_number(n).ok())
    }

    /// Score keys this stage writes
    pub fn owned_keys(&self) -> &'static [&'static str] {
        match self {
            Stage::Preparation => &[],
            Stage::Feasibility => &[keys::FEASIBILITY],
            Stage::FactorAnalysis => &[keys::DQI, keys::RIGHTS, keys::MARKET, keys::BUSINESS],
            Stage::ModelSelection => &[keys::BASE_VALUE],
            Stage::QualityAdjustment => &[keys::QUALITY_ADJUSTED_VALUE],
            Stage::RiskAdjustment => &[keys::RISK_COEFFICIENT, keys::RISK_ADJUSTED_VALUE],
            Stage::Report => &[keys::FINAL_VALUE],
        }
    }
}

impl TryFrom<u8> for Stage {
    type Error = ValuationError;

    fn try_from(value: u8) -> Result<Self> {
        Stage::from_number(value)
    }
}

impl From<Stage> for u8 {
    fn from(stage: Stage) -> Self {
        stage.number()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.number(), self.title())
    }
}

/// Score key for a factor block's aggregate
pub fn factor_key(kind: FactorKind) -> &'static str {
    match kind {
        FactorKind::Quality => keys::DQI,
        FactorKind::Rights => keys::RIGHTS,
        FactorKind::Market => keys::MARKET,
        FactorKind::Business => keys::BUSINESS,
    }
}

/// Identity fields of the data asset
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub name: String,
    pub owner: String,
    pub version: String,
    pub description: String,
}

impl Default for Metadata {
    fn default() -> Self {
        Metadata {
            name: String::new(),
            owner: String::new(),
            version: "v0.1".to_string(),
            description: String::new(),
        }
    }
}

impl Metadata {
    /// True when the data name is filled in (whitespace does not count)
    pub fn has_identity(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// Business feasibility inputs
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeasibilityInputs {
    /// Slider positions (0..5) in criterion order
    pub sliders: Vec<u8>,
    pub purpose: String,
    pub scope: String,
    pub audience: String,
}

/// Derived quality adjustment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityState {
    pub score: f64,
    /// None when no quality grade was selected
    pub grade: Option<Letter>,
    pub coefficient: f64,
}

impl Default for QualityState {
    fn default() -> Self {
        QualityState {
            score: 0.0,
            grade: Some(Letter::E),
            coefficient: GradeCoefficientTable::default().e,
        }
    }
}

/// Risk register and its latest aggregation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RiskState {
    pub mode: RiskMode,
    pub rows: Vec<RiskRow>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assessment: Option<RiskAssessment>,
}

/// Mutable aggregate for one valuation run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub current_stage: Stage,
    pub visited: BTreeSet<Stage>,
    pub metadata: Metadata,
    pub feasibility: FeasibilityInputs,
    pub model_choice: ValuationModel,
    pub model_inputs: ModelInputs,
    /// Scored factor blocks from the factor-analysis stage
    pub factor_blocks: BTreeMap<FactorKind, TableScore>,
    pub scores: BTreeMap<String, f64>,
    pub quality: QualityState,
    pub risk: RiskState,
}

impl SessionState {
    /// Fresh state at stage 1 using the profile's default risk mode
    pub fn new(profile: &WorkflowProfile) -> Self {
        SessionState {
            current_stage: Stage::Preparation,
            visited: BTreeSet::from([Stage::Preparation]),
            metadata: Metadata::default(),
            feasibility: FeasibilityInputs::default(),
            model_choice: ValuationModel::default(),
            model_inputs: ModelInputs::default(),
            factor_blocks: BTreeMap::new(),
            scores: BTreeMap::new(),
            quality: QualityState::default(),
            risk: RiskState {
                mode: profile.risk_mode,
                rows: Vec::new(),
                assessment: None,
            },
        }
    }

    /// Discard everything and start over at stage 1
    pub fn restart(&self, profile: &WorkflowProfile) -> Self {
        Self::new(profile)
    }

    /// Score by key, 0.0 if the owning stage has not run
    pub fn score(&self, key: &str) -> f64 {
        self.scores.get(key).copied().unwrap_or(0.0)
    }

    pub fn has_visited(&self, stage: Stage) -> bool {
        self.visited.contains(&stage)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(&WorkflowProfile::standard())
    }
}
