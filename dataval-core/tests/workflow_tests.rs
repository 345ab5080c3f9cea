//! End-to-end workflow tests
//!
//! Drive the stage machine the way the CLI does and check the numbers that
//! come out the other end.

use chrono::{DateTime, FixedOffset};
use dataval_core::factor::FactorKind;
use dataval_core::grading::{Grade, Letter};
use dataval_core::input::{run_workflow, EvaluationInput, FactorGrades, ModelSection, RiskSection};
use dataval_core::model::{ModelInputs, ValuationModel};
use dataval_core::pipeline::{self, advance_stage};
use dataval_core::profile::WorkflowProfile;
use dataval_core::risk::{RiskCategory, RiskMode, RiskRow};
use dataval_core::session::{keys, Metadata, SessionState, Stage};
use dataval_core::{evaluate, render_csv, render_text, ValuationError};

const EPS: f64 = 1e-6;

fn generated_at() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-05-04T12:00:00Z").unwrap()
}

fn revenue_input() -> EvaluationInput {
    EvaluationInput {
        metadata: Metadata {
            name: "logistics telemetry".to_string(),
            ..Metadata::default()
        },
        feasibility: Default::default(),
        factors: FactorGrades {
            quality: vec![Some(Grade::A); 5],
            ..FactorGrades::default()
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
            mode: Some(RiskMode::MaxCategory),
            rows: Some(vec![
                RiskRow::new("minor licensing gap", 1, 2, "").unwrap(),
                RiskRow::new("stale consent records", 1, 3, "").unwrap(),
            ]),
        },
    }
}

#[test]
fn test_revenue_all_a_watch_only() {
    let profile = WorkflowProfile::standard();
    let (state, composition) = run_workflow(&revenue_input(), &profile).unwrap();

    assert_eq!(composition.base_value, 1_800_000.0);
    assert!((composition.adjusted_value - 1_980_000.0).abs() < EPS);
    assert_eq!(composition.risk.category, Some(RiskCategory::Watch));
    assert_eq!(composition.risk.coefficient, 1.0);
    assert!((composition.final_value - 1_980_000.0).abs() < EPS);

    assert_eq!(state.quality.grade, Some(Letter::A));
    assert_eq!(state.quality.coefficient, 1.10);
    assert!((state.score(keys::QUALITY_ADJUSTED_VALUE) - 1_980_000.0).abs() < EPS);
    assert!((state.score(keys::RISK_ADJUSTED_VALUE) - 1_980_000.0).abs() < EPS);
    assert_eq!(state.score(keys::RISK_COEFFICIENT), 1.0);
}

#[test]
fn test_report_renders_end_to_end_values() {
    let report = evaluate(&revenue_input(), &WorkflowProfile::standard(), generated_at()).unwrap();
    let text = render_text(&report);
    assert!(text.contains("1,800,000"));
    assert!(text.contains("FINAL VALUE    1,980,000"));

    let csv = render_csv(&report);
    assert!(csv.contains("2026-05-04T12:00:00+00:00"));
    let lines: Vec<&str> = csv.trim_start_matches('\u{FEFF}').split("\r\n").collect();
    let header: Vec<&str> = lines[0].split(',').collect();
    let row: Vec<&str> = lines[1].split(',').collect();
    let cell = |key: &str| row[header.iter().position(|h| *h == key).unwrap()];
    assert_eq!(cell(keys::BASE_VALUE), "1800000");
    assert_eq!(cell(keys::RISK_COEFFICIENT), "1");
    for key in [keys::QUALITY_ADJUSTED_VALUE, keys::RISK_ADJUSTED_VALUE, keys::FINAL_VALUE] {
        let value: f64 = cell(key).parse().unwrap();
        assert_eq!(value, report.named_scores[key]);
        assert!((value - 1_980_000.0).abs() < EPS, "{} = {}", key, value);
    }
}

#[test]
fn test_blank_quality_is_neutral_but_all_c_is_not() {
    let profile = WorkflowProfile::standard();

    let mut blank = revenue_input();
    blank.factors = FactorGrades::default();
    let (_, composition) = run_workflow(&blank, &profile).unwrap();
    assert!((composition.final_value - 1_800_000.0).abs() < EPS);

    let mut worst = revenue_input();
    worst.factors.quality = vec![Some(Grade::C); 5];
    let (state, composition) = run_workflow(&worst, &profile).unwrap();
    assert_eq!(state.quality.grade, Some(Letter::E));
    assert!((composition.final_value - 1_440_000.0).abs() < EPS);
}

#[test]
fn test_extended_profile_composes_every_factor() {
    let profile = WorkflowProfile::extended();
    let mut input = revenue_input();
    input.factors = FactorGrades {
        quality: vec![Some(Grade::A); 5],
        rights: vec![Some(Grade::A); 7],
        market: vec![Some(Grade::C); 6],
        // left blank, contributes 1.0
        business: Vec::new(),
    };
    input.risk = RiskSection {
        mode: None,
        rows: Some(Vec::new()),
    };

    let (state, composition) = run_workflow(&input, &profile).unwrap();
    let kinds: Vec<FactorKind> = composition.factors.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, FactorKind::ALL.to_vec());

    // 1.10 × 1.10 × 0.80 × 1.00, empty register → upper bound 1.0
    assert_eq!(composition.risk.mode, RiskMode::NormalizedSeverity);
    assert_eq!(composition.risk.coefficient, 1.0);
    assert!((composition.final_value - 1_800_000.0 * 1.1 * 1.1 * 0.8).abs() < EPS);
    assert_eq!(state.score(keys::BUSINESS), 0.0);
}

#[test]
fn test_extended_profile_worst_case_risk() {
    let profile = WorkflowProfile::extended();
    let mut input = revenue_input();
    input.factors = FactorGrades::default();
    input.risk.mode = None;
    input.risk.rows = Some(
        (0..5)
            .map(|i| RiskRow::new(format!("r{}", i), 3, 3, "").unwrap())
            .collect(),
    );

    let (_, composition) = run_workflow(&input, &profile).unwrap();
    assert_eq!(composition.risk.severity_norm, Some(1.0));
    assert!((composition.risk.coefficient - 0.6).abs() < 1e-12);
    assert!((composition.final_value - 1_080_000.0).abs() < EPS);
}

#[test]
fn test_market_and_wtp_models_pass_through() {
    let profile = WorkflowProfile::standard();
    for (model, inputs, expected) in [
        (
            ValuationModel::Market,
            ModelInputs {
                market_price: 250_000.0,
                ..ModelInputs::default()
            },
            250_000.0,
        ),
        (
            ValuationModel::WillingnessToPay,
            ModelInputs {
                wtp: 42_000.0,
                ..ModelInputs::default()
            },
            42_000.0,
        ),
    ] {
        let mut input = revenue_input();
        input.model = ModelSection {
            choice: model,
            inputs,
        };
        let (state, composition) = run_workflow(&input, &profile).unwrap();
        assert_eq!(state.score(keys::BASE_VALUE), expected);
        assert!((composition.final_value - expected * 1.1).abs() < EPS);
    }
}

#[test]
fn test_gate_on_empty_name() {
    let profile = WorkflowProfile::standard();
    let state = SessionState::new(&profile);
    let err = advance_stage(&state, Stage::Feasibility, &profile).unwrap_err();
    assert_eq!(err, ValuationError::MissingIdentity);
    assert_eq!(state.current_stage, Stage::Preparation);

    let mut input = revenue_input();
    input.metadata.name = String::new();
    assert_eq!(
        run_workflow(&input, &profile).unwrap_err(),
        ValuationError::MissingIdentity
    );
}

#[test]
fn test_invalid_risk_row_in_document_is_rejected() {
    let json = r#"{
        "metadata": {"name": "x"},
        "risk": {"rows": [{"label": "bad", "probability": 4, "impact": 1}]}
    }"#;
    let input: EvaluationInput = serde_json::from_str(json).unwrap();
    let err = run_workflow(&input, &WorkflowProfile::standard()).unwrap_err();
    assert_eq!(
        err,
        ValuationError::InvalidRiskLevel {
            field: "probability",
            value: 4
        }
    );
}

#[test]
fn test_wrong_grade_count_is_rejected() {
    let mut input = revenue_input();
    input.factors.quality = vec![Some(Grade::A); 3];
    let err = run_workflow(&input, &WorkflowProfile::standard()).unwrap_err();
    assert!(matches!(
        err,
        ValuationError::GradeCountMismatch {
            expected: 5,
            actual: 3,
            ..
        }
    ));
}

#[test]
fn test_interactive_navigation_matches_batch_run() {
    let profile = WorkflowProfile::standard();
    let input = revenue_input();
    let (_, batch) = run_workflow(&input, &profile).unwrap();

    // Visit stages out of order: model first, then factors, then jump to the report
    let state = SessionState::new(&profile);
    let state = pipeline::set_metadata(&state, input.metadata.clone()).unwrap();
    let state = pipeline::jump_to(&state, 4, &profile).unwrap();
    let state =
        pipeline::select_model(&state, input.model.choice, &input.model.inputs, &profile).unwrap();
    let state = pipeline::jump_to(&state, 3, &profile).unwrap();
    let state = pipeline::record_factor_grades(&state, &input.factors, &profile).unwrap();
    let state = pipeline::jump_to(&state, 6, &profile).unwrap();
    let state = pipeline::apply_risk(
        &state,
        input.risk.rows_or_default(),
        RiskMode::MaxCategory,
        &profile,
    )
    .unwrap();
    let state = pipeline::jump_to(&state, 7, &profile).unwrap();
    let (_, interactive) = pipeline::compose_report(&state, &profile).unwrap();

    assert_eq!(interactive.final_value, batch.final_value);
}
