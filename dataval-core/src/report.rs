//! Reporting and output generation
//!
//! Global invariants enforced:
//! - The report is built from a composition, never from cached stage values
//! - Timestamps are supplied by the caller; nothing here reads the clock
//! - Byte-for-byte identical output for identical inputs

use crate::factor::FactorAdjustment;
use crate::model::ValuationModel;
use crate::pipeline::Composition;
use crate::profile::WorkflowProfile;
use crate::risk::RiskAssessment;
use crate::session::{keys, Metadata, QualityState, SessionState, Stage};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use std::collections::BTreeMap;

/// UTF-8 byte order mark so spreadsheet tools detect the encoding
const BOM: &str = "\u{FEFF}";

/// Leading CSV columns; one column per named score follows
const CSV_LABELS: [&str; 10] = [
    "name",
    "owner",
    "version",
    "description",
    "generated_at",
    "profile",
    "model",
    "quality_grade",
    "quality_coefficient",
    "risk_mode",
];

/// Every named score key, in the order of the stages that own them
fn score_keys() -> impl Iterator<Item = &'static str> {
    Stage::ALL
        .into_iter()
        .flat_map(|stage| stage.owned_keys().iter().copied())
}

/// Section summary scores (0..100)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SectionScores {
    pub feasibility: f64,
    pub dqi: f64,
    pub rights: f64,
    pub market: f64,
    pub business: f64,
}

/// One step of the computation path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathStep {
    pub step: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coefficient: Option<f64>,
    pub value: f64,
}

/// Complete valuation report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationReport {
    pub generated_at: String,
    pub profile: String,
    pub metadata: Metadata,
    pub model: ValuationModel,
    pub scores: SectionScores,
    /// Every named session score at full precision, 0.0 for stages not run
    pub named_scores: BTreeMap<String, f64>,
    pub factors: Vec<FactorAdjustment>,
    pub quality: QualityState,
    pub risk: RiskAssessment,
    pub path: Vec<PathStep>,
    pub base_value: f64,
    pub adjusted_value: f64,
    pub final_value: f64,
}

impl ValuationReport {
    /// Assemble the report for a composed session
    pub fn new(
        state: &SessionState,
        composition: &Composition,
        profile: &WorkflowProfile,
        generated_at: DateTime<FixedOffset>,
    ) -> Self {
        let mut path = vec![PathStep {
            step: format!("base value ({})", state.model_choice.label()),
            coefficient: None,
            value: composition.base_value,
        }];
        let mut running = composition.base_value;
        for factor in &composition.factors {
            running = factor.apply(running);
            path.push(PathStep {
                step: format!("{} adjustment", factor.kind),
                coefficient: Some(factor.coefficient),
                value: running,
            });
        }
        path.push(PathStep {
            step: format!("risk adjustment ({})", composition.risk.mode),
            coefficient: Some(composition.risk.coefficient),
            value: composition.final_value,
        });

        ValuationReport {
            generated_at: generated_at.to_rfc3339(),
            profile: profile.name.clone(),
            metadata: state.metadata.clone(),
            model: state.model_choice,
            scores: SectionScores {
                feasibility: state.score(keys::FEASIBILITY),
                dqi: state.score(keys::DQI),
                rights: state.score(keys::RIGHTS),
                market: state.score(keys::MARKET),
                business: state.score(keys::BUSINESS),
            },
            named_scores: score_keys()
                .map(|key| (key.to_string(), state.score(key)))
                .collect(),
            factors: composition.factors.clone(),
            quality: state.quality,
            risk: composition.risk.clone(),
            path,
            base_value: composition.base_value,
            adjusted_value: composition.adjusted_value,
            final_value: composition.final_value,
        }
    }
}

/// Format a monetary value with thousands separators and no decimals
pub fn format_money(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

fn grade_str(quality: &QualityState) -> &'static str {
    quality.grade.map_or("-", |g| g.as_str())
}

/// Render the report as text output
pub fn render_text(report: &ValuationReport) -> String {
    let mut output = String::new();
    let meta = &report.metadata;

    output.push_str("DATA VALUATION REPORT\n");
    output.push_str(&format!("{:<14} {}\n", "Generated", report.generated_at));
    output.push_str(&format!("{:<14} {}\n\n", "Profile", report.profile));

    output.push_str("Metadata\n");
    output.push_str(&format!("  {:<12} {}\n", "Name", meta.name));
    output.push_str(&format!("  {:<12} {}\n", "Owner", meta.owner));
    output.push_str(&format!("  {:<12} {}\n", "Version", meta.version));
    if !meta.description.is_empty() {
        output.push_str(&format!("  {:<12} {}\n", "Description", meta.description));
    }
    output.push('\n');

    output.push_str("Section scores\n");
    let s = &report.scores;
    for (label, score) in [
        ("Feasibility", s.feasibility),
        ("Quality", s.dqi),
        ("Rights", s.rights),
        ("Market", s.market),
        ("Business", s.business),
    ] {
        output.push_str(&format!("  {:<12} {:>6.1}\n", label, score));
    }
    output.push('\n');

    output.push_str(&format!(
        "Quality grade  {} (coefficient {:.2})\n",
        grade_str(&report.quality),
        report.quality.coefficient
    ));
    let risk_label = match (report.risk.category, report.risk.severity_norm) {
        (Some(category), _) => category.as_str().to_string(),
        (None, Some(norm)) => format!("severity {:.3}", norm),
        (None, None) => "-".to_string(),
    };
    output.push_str(&format!(
        "Legal risk     {} over {} rows (coefficient {:.2})\n\n",
        risk_label,
        report.risk.rows.len(),
        report.risk.coefficient
    ));

    output.push_str("Computation path\n");
    for step in &report.path {
        let coefficient = step
            .coefficient
            .map_or(String::new(), |c| format!("x {:.4}", c));
        output.push_str(&format!(
            "  {:<52} {:<10} {:>16}\n",
            step.step,
            coefficient,
            format_money(step.value)
        ));
    }
    output.push('\n');

    output.push_str(&format!("FINAL VALUE    {}\n", format_money(report.final_value)));
    output
}

/// Render the report as JSON output
pub fn render_json(report: &ValuationReport) -> String {
    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
}

/// Quote a CSV field when it contains a delimiter, quote or line break
fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Render the report as a single-row CSV with a UTF-8 BOM
///
/// Numbers are written with `{}` so every value parses back to the same `f64`.
pub fn render_csv(report: &ValuationReport) -> String {
    let meta = &report.metadata;
    let mut row = vec![
        meta.name.clone(),
        meta.owner.clone(),
        meta.version.clone(),
        meta.description.clone(),
        report.generated_at.clone(),
        report.profile.clone(),
        report.model.as_str().to_string(),
        grade_str(&report.quality).to_string(),
        report.quality.coefficient.to_string(),
        report.risk.mode.as_str().to_string(),
    ];
    for key in score_keys() {
        let value = report.named_scores.get(key).copied().unwrap_or(0.0);
        row.push(value.to_string());
    }

    let header: Vec<&str> = CSV_LABELS.into_iter().chain(score_keys()).collect();

    let mut output = String::from(BOM);
    output.push_str(&header.join(","));
    output.push_str("\r\n");
    output.push_str(
        &row.iter()
            .map(|field| csv_field(field))
            .collect::<Vec<_>>()
            .join(","),
    );
    output.push_str("\r\n");
    output
}
