// ABOUTME: Fitplan CLI - one-shot plan generation, compliance checks, and JSON repair
// ABOUTME: Reads profiles and model output from files and prints JSON results to stdout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//!
//! Usage:
//! ```bash
//! # Generate a verified weekly plan for a profile
//! fitplan generate --profile profile.json
//!
//! # Check a stored plan against a profile without calling a model
//! fitplan check --profile profile.json --plan plan.json
//!
//! # Recover JSON from raw model output
//! fitplan repair-json response.txt
//!
//! # Print the effective configuration
//! fitplan config
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fitplan_core::constants::service_names;
use fitplan_core::models::{DraftPlan, UserProfile};
use fitplan_engine::config::EngineConfig;
use fitplan_engine::llm::FallbackProvider;
use fitplan_engine::logging::LoggingConfig;
use fitplan_engine::plans::{parse_model_json, ComplianceChecker, PlanPipeline};
use fitplan_intelligence::derive_targets;
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(
    name = "fitplan",
    about = "Fitness and nutrition plan engine CLI",
    long_about = "Generate weekly base plans, check plans against a profile, and recover JSON from model output."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Run the generate and verify pipeline for one profile
    Generate {
        /// Path to a profile snapshot (JSON)
        #[arg(long)]
        profile: PathBuf,
    },
    /// Report constraint issues in a plan without calling a model
    Check {
        /// Path to a profile snapshot (JSON)
        #[arg(long)]
        profile: PathBuf,
        /// Path to a plan document (JSON, repaired if needed)
        #[arg(long)]
        plan: PathBuf,
    },
    /// Parse raw model output, applying the repair stages
    RepairJson {
        /// File holding the raw text
        file: PathBuf,
    },
    /// Print the configuration loaded from the environment
    Config,
}

fn read_profile(path: &Path) -> Result<UserProfile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading profile {}", path.display()))?;
    let profile: UserProfile = serde_json::from_str(&text).context("parsing profile JSON")?;
    profile.validate_snapshot()?;
    Ok(profile)
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn generate(profile_path: &Path) -> Result<()> {
    let profile = read_profile(profile_path)?;
    let config = EngineConfig::from_env();
    let llm = Arc::new(FallbackProvider::from_config(&config.llm)?);
    let pipeline = PlanPipeline::new(llm, config.pipeline.clone(), config.llm.model.clone());

    let plan = pipeline.generate(&profile).await?;
    info!(attempts = plan.attempts, "Plan ready");
    print_json(&json!({
        "user_id": profile.user_id,
        "targets": plan.targets,
        "attempts": plan.attempts,
        "repair_stage": plan.repair_stage.to_string(),
        "days": plan.days,
    }))
}

fn check(profile_path: &Path, plan_path: &Path) -> Result<()> {
    let profile = read_profile(profile_path)?;
    let text = fs::read_to_string(plan_path)
        .with_context(|| format!("reading plan {}", plan_path.display()))?;
    let recovered = parse_model_json(&text)?;
    let draft = DraftPlan::from_value(&recovered.value);
    let targets = derive_targets(&profile);
    let report = ComplianceChecker::new(&profile, targets).check(&draft);
    print_json(&json!({
        "targets": targets,
        "clean": report.is_clean(),
        "issues": report.issues,
    }))
}

fn repair_json(path: &Path) -> Result<()> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let recovered = parse_model_json(&text)?;
    print_json(&json!({
        "stage": recovered.stage.to_string(),
        "value": recovered.value,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::for_service(service_names::FITPLAN_CLI);
    if cli.verbose {
        "debug".clone_into(&mut logging.level);
    }
    logging.init()?;

    match cli.command {
        Command::Generate { profile } => generate(&profile).await,
        Command::Check { profile, plan } => check(&profile, &plan),
        Command::RepairJson { file } => repair_json(&file),
        Command::Config => {
            println!("{}", EngineConfig::from_env().summary());
            Ok(())
        }
    }
}
