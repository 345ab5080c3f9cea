//! Configuration file support for dataval
//!
//! Loads deployment-specific parameters from JSON files and folds them into
//! a workflow profile.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.datavalrc.json` in the working directory
//! 3. `dataval.config.json` in the working directory
//!
//! All fields are optional. Unset fields keep the selected profile's values.

use crate::factor::FactorKind;
use crate::grading::GradeCoefficientTable;
use crate::profile::{WorkflowProfile, PROFILE_NAMES, STANDARD_PROFILE};
use crate::risk::{CategoryCoefficients, RiskMode, RiskParams};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const RC_FILE: &str = ".datavalrc.json";
const CONFIG_FILE: &str = "dataval.config.json";

/// dataval configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatavalConfig {
    /// Base profile: "standard" (default) or "extended"
    #[serde(default)]
    pub profile: Option<String>,

    /// Risk aggregation overrides
    #[serde(default)]
    pub risk: Option<RiskConfig>,

    /// Letter band → coefficient overrides
    #[serde(default)]
    pub grade_coefficients: Option<GradeCoefficientConfig>,

    /// Multiple applied to net revenue (default: 3.0)
    #[serde(default)]
    pub revenue_multiple: Option<f64>,

    /// Factor blocks folded into the final value
    #[serde(default)]
    pub adjustment_factors: Option<Vec<FactorKind>>,

    /// Clear a stage's results when it is re-entered (default: false)
    #[serde(default)]
    pub reset_on_revisit: Option<bool>,
}

/// Risk aggregation overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    pub mode: Option<RiskMode>,
    /// Best-case coefficient in normalized mode
    pub upper_bound: Option<f64>,
    /// Best-to-worst distance in normalized mode
    pub range: Option<f64>,
    /// Category coefficient for Watch (default: 1.0)
    pub watch: Option<f64>,
    /// Category coefficient for Caution (default: 0.9)
    pub caution: Option<f64>,
    /// Category coefficient for Severe (default: 0.8)
    pub severe: Option<f64>,
}

/// Grade coefficient overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GradeCoefficientConfig {
    pub a: Option<f64>,
    pub b: Option<f64>,
    pub c: Option<f64>,
    pub d: Option<f64>,
    pub e: Option<f64>,
}

/// Profile with every override applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub profile: WorkflowProfile,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

fn base_profile(name: Option<&str>) -> Result<WorkflowProfile> {
    let name = name.unwrap_or(STANDARD_PROFILE);
    WorkflowProfile::by_name(name).ok_or_else(|| {
        anyhow::anyhow!(
            "unknown profile '{}' (expected one of: {})",
            name,
            PROFILE_NAMES.join(", ")
        )
    })
}

fn merged_grades(
    base: &GradeCoefficientTable,
    cfg: Option<&GradeCoefficientConfig>,
) -> GradeCoefficientTable {
    match cfg {
        Some(g) => GradeCoefficientTable {
            a: g.a.unwrap_or(base.a),
            b: g.b.unwrap_or(base.b),
            c: g.c.unwrap_or(base.c),
            d: g.d.unwrap_or(base.d),
            e: g.e.unwrap_or(base.e),
        },
        None => *base,
    }
}

fn merged_risk(base: &RiskParams, cfg: Option<&RiskConfig>) -> RiskParams {
    match cfg {
        Some(r) => RiskParams {
            upper_bound: r.upper_bound.unwrap_or(base.upper_bound),
            range: r.range.unwrap_or(base.range),
            categories: CategoryCoefficients {
                watch: r.watch.unwrap_or(base.categories.watch),
                caution: r.caution.unwrap_or(base.categories.caution),
                severe: r.severe.unwrap_or(base.categories.severe),
            },
        },
        None => *base,
    }
}

impl DatavalConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        let base = base_profile(self.profile.as_deref())?;

        // Risk bounds: positive upper bound, range within (0, upper]
        let risk = merged_risk(&base.risk, self.risk.as_ref());
        if risk.upper_bound <= 0.0 {
            anyhow::bail!("risk.upper_bound must be positive (got {})", risk.upper_bound);
        }
        if risk.range <= 0.0 || risk.range > risk.upper_bound {
            anyhow::bail!(
                "risk.range must be in (0, upper_bound = {}] (got {})",
                risk.upper_bound,
                risk.range
            );
        }

        let c = &risk.categories;
        for (name, v) in [("watch", c.watch), ("caution", c.caution), ("severe", c.severe)] {
            if v <= 0.0 {
                anyhow::bail!("risk.{} must be positive (got {})", name, v);
            }
        }
        if c.caution > c.watch {
            anyhow::bail!(
                "risk.caution ({}) must not exceed risk.watch ({})",
                c.caution,
                c.watch
            );
        }
        if c.severe > c.caution {
            anyhow::bail!(
                "risk.severe ({}) must not exceed risk.caution ({})",
                c.severe,
                c.caution
            );
        }

        // Grade coefficients: positive, non-increasing from A to E
        let grades = merged_grades(&base.grade_coefficients, self.grade_coefficients.as_ref());
        let letters = ["a", "b", "c", "d", "e"];
        let values = grades.values();
        for (name, v) in letters.iter().zip(values) {
            if v <= 0.0 {
                anyhow::bail!("grade_coefficients.{} must be positive (got {})", name, v);
            }
        }
        for i in 1..values.len() {
            if values[i] > values[i - 1] {
                anyhow::bail!(
                    "grade_coefficients.{} ({}) must not exceed grade_coefficients.{} ({})",
                    letters[i],
                    values[i],
                    letters[i - 1],
                    values[i - 1]
                );
            }
        }

        if let Some(multiple) = self.revenue_multiple {
            if multiple < 0.0 {
                anyhow::bail!("revenue_multiple must be non-negative (got {})", multiple);
            }
        }

        if let Some(ref factors) = self.adjustment_factors {
            let mut seen = BTreeSet::new();
            for kind in factors {
                if !seen.insert(*kind) {
                    anyhow::bail!("adjustment_factors lists '{}' more than once", kind);
                }
            }
        }

        Ok(())
    }

    /// Resolve config into a workflow profile ready for use
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        let base = base_profile(self.profile.as_deref())?;
        let profile = WorkflowProfile {
            grade_coefficients: merged_grades(
                &base.grade_coefficients,
                self.grade_coefficients.as_ref(),
            ),
            risk_mode: self
                .risk
                .as_ref()
                .and_then(|r| r.mode)
                .unwrap_or(base.risk_mode),
            risk: merged_risk(&base.risk, self.risk.as_ref()),
            revenue_multiple: self.revenue_multiple.unwrap_or(base.revenue_multiple),
            adjustment_factors: self
                .adjustment_factors
                .clone()
                .unwrap_or_else(|| base.adjustment_factors.clone()),
            reset_on_revisit: self.reset_on_revisit.unwrap_or(base.reset_on_revisit),
            ..base
        };

        Ok(ResolvedConfig {
            profile,
            config_path: None,
        })
    }
}

impl ResolvedConfig {
    /// Build a ResolvedConfig with all defaults (no config file)
    pub fn defaults() -> Result<Self> {
        DatavalConfig::default().resolve()
    }
}

/// Discover and load a config file from a directory
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(DatavalConfig, PathBuf)>> {
    for name in [RC_FILE, CONFIG_FILE] {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<DatavalConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: DatavalConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns the standard profile if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (DatavalConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    if let Some(ref path) = source_path {
        tracing::debug!(path = %path.display(), profile = %resolved.profile.name, "config loaded");
    }
    resolved.config_path = source_path;
    Ok(resolved)
}
