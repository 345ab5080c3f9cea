//! Invariant Tests
//!
//! Properties that must hold for every input: determinism, idempotent
//! recomposition, band boundaries and coefficient bounds.

use chrono::{DateTime, FixedOffset};
use dataval_core::grading::{score_to_grade, Grade, Letter};
use dataval_core::input::{run_workflow, EvaluationInput};
use dataval_core::pipeline::{compose_report, jump_to};
use dataval_core::profile::WorkflowProfile;
use dataval_core::risk::{
    category, compute_risk_coefficient, RiskCategory, RiskMode, RiskParams, RiskRow,
};
use dataval_core::scoring::{
    business_table, market_table, quality_table, rights_table, score_table, weighted_score,
};
use dataval_core::{evaluate, render_csv, render_json, render_text};

fn generated_at() -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339("2026-01-15T08:00:00+01:00").unwrap()
}

/// Every (probability, impact) pair on the 1..3 scale
fn all_levels() -> Vec<(u8, u8)> {
    let mut levels = Vec::new();
    for p in 1..=3 {
        for i in 1..=3 {
            levels.push((p, i));
        }
    }
    levels
}

#[test]
fn test_weighted_score_property() {
    for grade in [Grade::A, Grade::B, Grade::C] {
        for w in [0.0, 7.5, 10.0, 15.0, 20.0, 40.0, 100.0] {
            let expected = (f64::from(grade.points()) / 5.0) * w;
            assert_eq!(weighted_score(grade.points(), w), expected);
        }
    }
}

#[test]
fn test_grade_band_boundaries() {
    let cases = [
        (90.0, Letter::A),
        (89.999, Letter::B),
        (80.0, Letter::B),
        (79.999, Letter::C),
        (70.0, Letter::C),
        (69.999, Letter::D),
        (60.0, Letter::D),
        (59.999, Letter::E),
        (150.0, Letter::A),
        (-10.0, Letter::E),
        (f64::NAN, Letter::E),
    ];
    for (score, letter) in cases {
        assert_eq!(score_to_grade(score), letter, "score {}", score);
    }
}

#[test]
fn test_score_never_decreases_when_a_grade_improves() {
    for table in [quality_table(), rights_table(), market_table(), business_table()] {
        let n = table.criteria.len();
        for idx in 0..n {
            let mut grades = vec![Some(Grade::B); n];
            let mut last = f64::NEG_INFINITY;
            for g in [None, Some(Grade::C), Some(Grade::B), Some(Grade::A)] {
                grades[idx] = g;
                let score = score_table(&table, &grades).unwrap().score;
                assert!(score >= last, "{} row {} not monotone", table.title, idx);
                last = score;
            }
        }
    }
}

#[test]
fn test_category_boundaries() {
    assert_eq!(category(1), RiskCategory::Watch);
    assert_eq!(category(4), RiskCategory::Caution);
    assert_eq!(category(6), RiskCategory::Caution);
    assert_eq!(category(7), RiskCategory::Severe);
    assert_eq!(category(9), RiskCategory::Severe);
}

#[test]
fn test_risk_coefficient_stays_within_bounds() {
    let profiles = [WorkflowProfile::standard(), WorkflowProfile::extended()];
    let modes = [
        RiskMode::MaxCategory,
        RiskMode::AverageCategory,
        RiskMode::NormalizedSeverity,
    ];
    let levels = all_levels();

    for profile in &profiles {
        for mode in modes {
            let (low, high) = profile.risk.coefficient_bounds(mode);
            // Registers of 0..=4 rows drawn from every level pair
            for len in 0..=4 {
                for start in 0..levels.len() {
                    let rows: Vec<RiskRow> = (0..len)
                        .map(|k| {
                            let (p, i) = levels[(start + k * 2) % levels.len()];
                            RiskRow::new(format!("row {}", k), p, i, "").unwrap()
                        })
                        .collect();
                    let result = compute_risk_coefficient(&rows, mode, &profile.risk).unwrap();
                    assert!(
                        result.coefficient >= low - 1e-12 && result.coefficient <= high + 1e-12,
                        "{} {} rows={} coefficient {}",
                        profile.name,
                        mode,
                        len,
                        result.coefficient
                    );
                    if let Some(norm) = result.severity_norm {
                        assert!((0.0..=1.0).contains(&norm));
                    }
                }
            }
        }
    }
}

#[test]
fn test_normalized_extremes_with_five_rows() {
    let params = RiskParams::default();
    let best: Vec<RiskRow> = (0..5)
        .map(|k| RiskRow::new(format!("{}", k), 1, 1, "").unwrap())
        .collect();
    let worst: Vec<RiskRow> = (0..5)
        .map(|k| RiskRow::new(format!("{}", k), 3, 3, "").unwrap())
        .collect();

    let best = compute_risk_coefficient(&best, RiskMode::NormalizedSeverity, &params).unwrap();
    assert_eq!(best.severity_norm, Some(0.0));
    assert_eq!(best.coefficient, params.upper_bound);

    let worst = compute_risk_coefficient(&worst, RiskMode::NormalizedSeverity, &params).unwrap();
    assert_eq!(worst.severity_norm, Some(1.0));
    assert!((worst.coefficient - params.lower_bound()).abs() < 1e-12);
}

#[test]
fn test_recomposition_is_idempotent() {
    let profile = WorkflowProfile::standard();
    let (state, first) = run_workflow(&EvaluationInput::template(), &profile).unwrap();

    let (state, second) = compose_report(&state, &profile).unwrap();
    let (state, third) = compose_report(&state, &profile).unwrap();
    assert_eq!(first, second);
    assert_eq!(second, third);

    // Navigating away and back without changing inputs changes nothing
    let away = jump_to(&state, 2, &profile).unwrap();
    let back = jump_to(&away, 7, &profile).unwrap();
    let (_, fourth) = compose_report(&back, &profile).unwrap();
    assert_eq!(first, fourth);
}

#[test]
fn test_output_is_byte_identical_across_runs() {
    for profile in [WorkflowProfile::standard(), WorkflowProfile::extended()] {
        let a = evaluate(&EvaluationInput::template(), &profile, generated_at()).unwrap();
        let b = evaluate(&EvaluationInput::template(), &profile, generated_at()).unwrap();
        assert_eq!(render_text(&a), render_text(&b));
        assert_eq!(render_json(&a), render_json(&b));
        assert_eq!(render_csv(&a), render_csv(&b));
    }
}

#[test]
fn test_final_value_is_product_of_path() {
    let profile = WorkflowProfile::extended();
    let (_, composition) = run_workflow(&EvaluationInput::template(), &profile).unwrap();
    let product: f64 = composition.factors.iter().map(|f| f.coefficient).product();
    let expected = composition.base_value * product * composition.risk.coefficient;
    assert!((composition.final_value - expected).abs() < 1e-6);
}
