//! Weighted scoring
//!
//! Converts graded criteria into a 0..100 aggregate.
//!
//! Formula:
//! weighted = (points / 5) × weight
//! aggregate = Σ weighted
//!
//! Global invariants enforced:
//! - Pure arithmetic, no clamping at this layer
//! - Unselected grades contribute 0 and stay in the denominator
//! - Table weights are not renormalized (a table summing to 100 yields a percentage)

use crate::error::{Result, ValuationError};
use crate::grading::Grade;
use serde::Serialize;

/// One row of a criteria table
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Criterion {
    pub area: &'static str,
    pub name: &'static str,
    pub weight: f64,
}

const fn criterion(area: &'static str, name: &'static str, weight: f64) -> Criterion {
    Criterion { area, name, weight }
}

/// How a table's grades are presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GradeScale {
    /// A / B / C
    Letters,
    /// 5 / 3 / 0 with descriptive labels
    Points,
}

impl GradeScale {
    /// Descriptive label for a grade on this scale
    pub fn describe(&self, grade: Grade) -> &'static str {
        match (self, grade) {
            (GradeScale::Letters, Grade::A) => "excellent",
            (GradeScale::Letters, Grade::B) => "adequate",
            (GradeScale::Letters, Grade::C) => "poor",
            (GradeScale::Points, Grade::A) => "high / superior / large / present",
            (GradeScale::Points, Grade::B) => "medium / similar / mid-size / partial",
            (GradeScale::Points, Grade::C) => "low / inferior / small / absent",
        }
    }
}

/// Static criteria table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriteriaTable {
    pub title: &'static str,
    pub scale: GradeScale,
    pub criteria: Vec<Criterion>,
}

impl CriteriaTable {
    pub fn total_weight(&self) -> f64 {
        self.criteria.iter().map(|c| c.weight).sum()
    }
}

/// A criterion with its grade and contribution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredCriterion {
    pub area: &'static str,
    pub name: &'static str,
    pub weight: f64,
    pub grade: Option<Grade>,
    pub weighted: f64,
}

/// Aggregate result for one table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableScore {
    pub title: &'static str,
    pub rows: Vec<ScoredCriterion>,
    pub score: f64,
    /// True when at least one grade was selected
    pub any_selected: bool,
}

/// Weighted contribution of a graded criterion: `(points / 5) × weight`
pub fn weighted_score(points: u8, weight_percent: f64) -> f64 {
    (f64::from(points) / 5.0) * weight_percent
}

/// Sum of weighted contributions. `None` grades contribute 0.
pub fn aggregate(items: &[(Option<Grade>, f64)]) -> f64 {
    items
        .iter()
        .map(|(grade, weight)| match grade {
            Some(g) => weighted_score(g.points(), *weight),
            None => 0.0,
        })
        .sum()
}

/// Score a table against grades supplied in criterion order
pub fn score_table(table: &CriteriaTable, grades: &[Option<Grade>]) -> Result<TableScore> {
    if grades.len() != table.criteria.len() {
        return Err(ValuationError::GradeCountMismatch {
            table: table.title.to_string(),
            expected: table.criteria.len(),
            actual: grades.len(),
        });
    }

    let rows: Vec<ScoredCriterion> = table
        .criteria
        .iter()
        .zip(grades)
        .map(|(criterion, grade)| ScoredCriterion {
            area: criterion.area,
            name: criterion.name,
            weight: criterion.weight,
            grade: *grade,
            weighted: grade.map_or(0.0, |g| weighted_score(g.points(), criterion.weight)),
        })
        .collect();

    let items: Vec<(Option<Grade>, f64)> = rows.iter().map(|r| (r.grade, r.weight)).collect();

    Ok(TableScore {
        title: table.title,
        score: aggregate(&items),
        any_selected: grades.iter().any(Option::is_some),
        rows,
    })
}

/// Slider-scored criterion (0..5)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SliderCriterion {
    pub name: &'static str,
    pub weight: f64,
}

impl SliderCriterion {
    pub const fn new(name: &'static str, weight: f64) -> Self {
        SliderCriterion { name, weight }
    }
}

pub const SLIDER_MAX: u8 = 5;

/// Sum of `(slide / 5) × weight` over the sliders; each slide must be 0..=5
pub fn score_sliders(criteria: &[SliderCriterion], values: &[u8]) -> Result<f64> {
    if criteria.len() != values.len() {
        return Err(ValuationError::GradeCountMismatch {
            table: "feasibility".to_string(),
            expected: criteria.len(),
            actual: values.len(),
        });
    }

    let mut total = 0.0;
    for (criterion, &value) in criteria.iter().zip(values) {
        if value > SLIDER_MAX {
            return Err(ValuationError::InvalidSliderValue {
                criterion: criterion.name.to_string(),
                value,
            });
        }
        total += weighted_score(value, criterion.weight);
    }
    Ok(total)
}

/// Business feasibility sliders (40 / 30 / 30)
pub fn feasibility_criteria() -> Vec<SliderCriterion> {
    vec![
        SliderCriterion::new("demand size", 40.0),
        SliderCriterion::new("substitutability", 30.0),
        SliderCriterion::new("growth", 30.0),
    ]
}

/// Data quality criteria, 20% each
pub fn quality_table() -> CriteriaTable {
    CriteriaTable {
        title: "quality",
        scale: GradeScale::Letters,
        criteria: vec![
            criterion("quality", "accuracy", 20.0),
            criterion("quality", "completeness", 20.0),
            criterion("quality", "consistency", 20.0),
            criterion("quality", "timeliness", 20.0),
            criterion("quality", "accessibility", 20.0),
        ],
    }
}

/// Ownership, usage and legal-defect criteria
pub fn rights_table() -> CriteriaTable {
    CriteriaTable {
        title: "rights",
        scale: GradeScale::Letters,
        criteria: vec![
            criterion("ownership", "clarity of producer", 20.0),
            criterion("usage", "lawful acquisition", 15.0),
            criterion("usage", "purpose and scope clarity", 15.0),
            criterion("usage", "third-party provision", 10.0),
            criterion("legal defect", "IP infringement risk", 15.0),
            criterion("legal defect", "personal or sensitive data", 15.0),
            criterion("legal defect", "trade secret exposure", 10.0),
        ],
    }
}

/// Substitutability and demand criteria, graded 5/3/0
pub fn market_table() -> CriteriaTable {
    CriteriaTable {
        title: "market",
        scale: GradeScale::Points,
        criteria: vec![
            criterion("substitutability", "competing data", 20.0),
            criterion("substitutability", "substitute quality and price", 20.0),
            criterion("substitutability", "switching cost", 10.0),
            criterion("demand", "current market size", 20.0),
            criterion("demand", "growth rate (3-5y)", 15.0),
            criterion("demand", "average WTP", 15.0),
        ],
    }
}

/// Utilization potential and scalability criteria, graded 5/3/0
pub fn business_table() -> CriteriaTable {
    CriteriaTable {
        title: "business",
        scale: GradeScale::Points,
        criteria: vec![
            criterion("potential", "multi-domain applicability", 20.0),
            criterion("potential", "ease of combination", 15.0),
            criterion("potential", "policy and industry fit", 15.0),
            criterion("scalability", "market expansion", 20.0),
            criterion("scalability", "service expansion", 15.0),
            criterion("scalability", "infrastructure readiness", 15.0),
        ],
    }
}
