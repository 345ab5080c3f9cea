//! Grading tables
//!
//! Two independent lookups:
//! - input grades (A/B/C, also written 5/3/0) → points on a 0..5 scale
//! - aggregate score (0..100) → letter band (A..E) → multiplicative coefficient
//!
//! Global invariants enforced:
//! - Bands are checked in descending order, first match wins
//! - Every real score resolves to exactly one letter (< 60, NaN included, is E)
//! - Out-of-range scores are accepted and fall into the boundary bands

use crate::error::{Result, ValuationError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Score thresholds for letters A..D, highest first. Anything below the last is E.
pub const SCORE_BANDS: [(f64, Letter); 4] = [
    (90.0, Letter::A),
    (80.0, Letter::B),
    (70.0, Letter::C),
    (60.0, Letter::D),
];

/// Categorical input grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Grade {
    A,
    B,
    C,
}

impl Grade {
    /// Points on the 0..5 scale: A=5, B=3, C=0
    pub fn points(&self) -> u8 {
        match self {
            Grade::A => 5,
            Grade::B => 3,
            Grade::C => 0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
        }
    }

    /// Point label used by tables that grade on the 5/3/0 scale
    pub fn point_label(&self) -> &'static str {
        match self {
            Grade::A => "5",
            Grade::B => "3",
            Grade::C => "0",
        }
    }
}

impl FromStr for Grade {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A" | "a" | "5" => Ok(Grade::A),
            "B" | "b" | "3" => Ok(Grade::B),
            "C" | "c" | "0" => Ok(Grade::C),
            other => Err(ValuationError::InvalidGrade {
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Grade {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Grade> for String {
    fn from(grade: Grade) -> Self {
        grade.as_str().to_string()
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Convert an exact letter "A", "B" or "C" to points (5, 3, 0)
///
/// Stricter than `Grade::from_str`: point labels, lowercase and padded
/// letters are rejected. Unselected inputs are not letters; callers model
/// them as `Option<Grade>` and skip the lookup.
pub fn letter_to_score(letter: &str) -> Result<u8> {
    let grade = match letter {
        "A" => Grade::A,
        "B" => Grade::B,
        "C" => Grade::C,
        other => {
            return Err(ValuationError::InvalidGrade {
                value: other.to_string(),
            })
        }
    };
    Ok(grade.points())
}

/// Letter band assigned to an aggregate score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Letter {
    A,
    B,
    C,
    D,
    E,
}

impl Letter {
    pub const ALL: [Letter; 5] = [Letter::A, Letter::B, Letter::C, Letter::D, Letter::E];

    pub fn as_str(&self) -> &'static str {
        match self {
            Letter::A => "A",
            Letter::B => "B",
            Letter::C => "C",
            Letter::D => "D",
            Letter::E => "E",
        }
    }
}

impl FromStr for Letter {
    type Err = ValuationError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "A" | "a" => Ok(Letter::A),
            "B" | "b" => Ok(Letter::B),
            "C" | "c" => Ok(Letter::C),
            "D" | "d" => Ok(Letter::D),
            "E" | "e" => Ok(Letter::E),
            other => Err(ValuationError::InvalidLetter {
                value: other.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Letter {
    type Error = ValuationError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Letter> for String {
    fn from(letter: Letter) -> Self {
        letter.as_str().to_string()
    }
}

impl fmt::Display for Letter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map an aggregate score to its letter band
///
/// 90+ → A, 80+ → B, 70+ → C, 60+ → D, otherwise E.
pub fn score_to_grade(score: f64) -> Letter {
    for (threshold, letter) in SCORE_BANDS {
        if score >= threshold {
            return letter;
        }
    }
    Letter::E
}

/// Letter → multiplicative coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeCoefficientTable {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
}

impl Default for GradeCoefficientTable {
    fn default() -> Self {
        GradeCoefficientTable {
            a: 1.10,
            b: 1.05,
            c: 1.00,
            d: 0.90,
            e: 0.80,
        }
    }
}

impl GradeCoefficientTable {
    pub fn coefficient(&self, letter: Letter) -> f64 {
        match letter {
            Letter::A => self.a,
            Letter::B => self.b,
            Letter::C => self.c,
            Letter::D => self.d,
            Letter::E => self.e,
        }
    }

    /// Coefficients in A..E order
    pub fn values(&self) -> [f64; 5] {
        [self.a, self.b, self.c, self.d, self.e]
    }
}

/// Coefficient for a letter using the default table
pub fn grade_to_coefficient(letter: Letter) -> f64 {
    GradeCoefficientTable::default().coefficient(letter)
}
