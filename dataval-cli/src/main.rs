//! dataval CLI - staged valuation of data assets

#![deny(warnings)]

// Global invariants enforced:
// - stdout carries only report output; diagnostics go to stderr
// - The clock is read once per run, here, and passed into the core

mod logging;

use anyhow::Context;
use chrono::{DateTime, FixedOffset, Local};
use clap::{Parser, Subcommand};
use dataval_core::config::{self, ResolvedConfig};
use dataval_core::factor::FactorKind;
use dataval_core::grading::Grade;
use dataval_core::input::{load_input, EvaluationInput};
use dataval_core::profile::{WorkflowProfile, PROFILE_NAMES};
use dataval_core::scoring::{CriteriaTable, GradeScale};
use dataval_core::{evaluate, render_csv, render_json, render_text};
use logging::LogFormat;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "dataval")]
#[command(about = "Staged valuation of data assets")]
#[command(version = env!("DATAVAL_VERSION"))]
struct Cli {
    /// Log level (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every stage for an input document and print the report
    Evaluate {
        /// Path to the evaluation input (JSON)
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Write the report to this file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the criteria tables of a profile
    Criteria {
        /// Profile name (default: from config, else "standard")
        #[arg(long)]
        profile: Option<String>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a starter evaluation input
    Template,
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without running an evaluation
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved profile (defaults merged with the config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Csv,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Evaluate {
            input,
            format,
            config: config_path,
            output,
        } => {
            let resolved = load_config(config_path.as_deref())?;
            let document = load_input(&input)?;

            let generated_at: DateTime<FixedOffset> = Local::now().into();
            let report = evaluate(&document, &resolved.profile, generated_at)
                .with_context(|| format!("evaluation failed for {}", input.display()))?;

            let rendered = match format {
                OutputFormat::Text => render_text(&report),
                OutputFormat::Json => format!("{}\n", render_json(&report)),
                OutputFormat::Csv => render_csv(&report),
            };

            match output {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write report: {}", path.display()))?;
                    eprintln!("Report written to {}", path.display());
                }
                None => print!("{}", rendered),
            }
        }
        Commands::Criteria {
            profile,
            config: config_path,
        } => {
            let profile = match profile {
                Some(name) => WorkflowProfile::by_name(&name).ok_or_else(|| {
                    anyhow::anyhow!(
                        "unknown profile '{}' (expected one of: {})",
                        name,
                        PROFILE_NAMES.join(", ")
                    )
                })?,
                None => load_config(config_path.as_deref())?.profile,
            };
            print!("{}", render_criteria(&profile));
        }
        Commands::Template => {
            println!("{}", EvaluationInput::template().to_json()?);
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let root = std::env::current_dir()?;
                match config::load_and_resolve(&root, path.as_deref()) {
                    Ok(resolved) => {
                        if let Some(ref p) = resolved.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let resolved = load_config(path.as_deref())?;
                print!("{}", render_config(&resolved));
            }
        },
    }

    Ok(())
}

fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    let resolved =
        config::load_and_resolve(&root, config_path).context("failed to load configuration")?;
    if let Some(path) = &resolved.config_path {
        eprintln!("Using config: {}", path.display());
    }
    Ok(resolved)
}

fn render_table(output: &mut String, table: &CriteriaTable) {
    output.push_str(&format!("{} ({})\n", table.title, scale_legend(table)));
    for criterion in &table.criteria {
        output.push_str(&format!(
            "  {:<16} {:<32} {:>5.1}\n",
            criterion.area, criterion.name, criterion.weight
        ));
    }
    output.push('\n');
}

fn scale_legend(table: &CriteriaTable) -> String {
    [Grade::A, Grade::B, Grade::C]
        .iter()
        .map(|g| {
            let label = match table.scale {
                GradeScale::Letters => g.as_str(),
                GradeScale::Points => g.point_label(),
            };
            format!("{}={}", label, table.scale.describe(*g))
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_criteria(profile: &WorkflowProfile) -> String {
    let mut output = format!("Profile: {} (v{})\n\n", profile.name, profile.version);

    output.push_str("feasibility (sliders 0-5)\n");
    for slider in &profile.feasibility {
        output.push_str(&format!("  {:<49} {:>5.1}\n", slider.name, slider.weight));
    }
    output.push('\n');

    for kind in FactorKind::ALL {
        render_table(&mut output, profile.table(kind));
    }
    output
}

fn render_config(resolved: &ResolvedConfig) -> String {
    let p = &resolved.profile;
    let mut output = String::from("Configuration:\n");
    match resolved.config_path {
        Some(ref path) => output.push_str(&format!("  Source: {}\n", path.display())),
        None => output.push_str("  Source: defaults (no config file found)\n"),
    }
    output.push_str(&format!("  Profile: {} (v{})\n\n", p.name, p.version));

    let g = &p.grade_coefficients;
    output.push_str("Grade coefficients:\n");
    output.push_str(&format!(
        "  A: {}  B: {}  C: {}  D: {}  E: {}\n\n",
        g.a, g.b, g.c, g.d, g.e
    ));

    let c = &p.risk.categories;
    output.push_str("Risk:\n");
    output.push_str(&format!("  mode: {}\n", p.risk_mode));
    output.push_str(&format!("  upper_bound: {}\n", p.risk.upper_bound));
    output.push_str(&format!("  range: {}\n", p.risk.range));
    output.push_str(&format!(
        "  categories: watch {}  caution {}  severe {}\n\n",
        c.watch, c.caution, c.severe
    ));

    let factors = p
        .adjustment_factors
        .iter()
        .map(|k| k.as_str())
        .collect::<Vec<_>>();
    output.push_str("Workflow:\n");
    output.push_str(&format!("  revenue_multiple: {}\n", p.revenue_multiple));
    output.push_str(&format!(
        "  adjustment_factors: {}\n",
        if factors.is_empty() {
            "none".to_string()
        } else {
            factors.join(", ")
        }
    ));
    output.push_str(&format!("  reset_on_revisit: {}\n", p.reset_on_revisit));
    output
}
