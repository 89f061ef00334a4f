//! WARDEN Operations-Portal Reference Runtime: Demo CLI
//!
//! Runs the reference scenarios, the consistency verifier, or prints the
//! resolved grant tree for one fixture principal.
//!
//! Usage:
//!   cargo run -p demo -- run-all
//!   cargo run -p demo -- batch-toggle
//!   cargo run -p demo -- legacy-migration
//!   cargo run -p demo -- catalog-drift
//!   cargo run -p demo -- verify [--config path/to/portal.toml]
//!   cargo run -p demo -- tree --principal alice

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use warden_contracts::{
    decision::{GrantState, TenantNode},
    error::{WardenError, WardenResult},
};
use warden_policy::CatalogAccessEngine;
use warden_ref_portal::{
    fixtures,
    scenarios::{batch_toggle, catalog_drift, legacy_migration},
};
use warden_verify::ConsistencyVerifier;

// ── CLI definition ────────────────────────────────────────────────────────────

/// WARDEN: tenant-scoped authorization for an operations portal.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "WARDEN operations-portal reference runtime demo",
    long_about = "Runs WARDEN reference scenarios showing access decisions,\n\
                  batch grant mutation, legacy migration and consistency verification."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all three reference scenarios in sequence.
    RunAll,
    /// Scenario 1: Batch Toggle (atomic, sequential and partial batches).
    BatchToggle,
    /// Scenario 2: Legacy Migration (nested and alias-keyed grants).
    LegacyMigration,
    /// Scenario 3: Catalog Drift (orphans, malformed keys, duplicates).
    CatalogDrift,
    /// Run the consistency verifier over the representative principals.
    Verify {
        /// Portal TOML to verify against instead of the reference catalog.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the resolved tenant → unit → capability tree for a principal.
    Tree {
        /// Fixture principal: root, alice, bob, carol or dave.
        #[arg(long)]
        principal: String,
        /// Portal TOML to resolve against instead of the reference catalog.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for per-decision output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    print_banner();

    let result = match cli.command {
        Command::RunAll => run_all(),
        Command::BatchToggle => batch_toggle::run_scenario(),
        Command::LegacyMigration => legacy_migration::run_scenario(),
        Command::CatalogDrift => catalog_drift::run_scenario(),
        Command::Verify { config } => run_verify(config),
        Command::Tree { principal, config } => run_tree(&principal, config),
    };

    match result {
        Ok(()) => {
            println!("Done.");
        }
        Err(e) => {
            eprintln!("Demo error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

fn run_all() -> WardenResult<()> {
    batch_toggle::run_scenario()?;
    legacy_migration::run_scenario()?;
    catalog_drift::run_scenario()?;
    Ok(())
}

fn load_engine(config: Option<PathBuf>) -> WardenResult<CatalogAccessEngine> {
    match config {
        Some(path) => CatalogAccessEngine::from_file(&path),
        None => fixtures::engine(),
    }
}

fn run_verify(config: Option<PathBuf>) -> WardenResult<()> {
    let engine = load_engine(config)?;
    let report = ConsistencyVerifier::new(&engine, engine.catalog())
        .run(&fixtures::representatives(), &fixtures::expectations());

    println!(
        "Verified {} leaves for {} principals: {} passed, {} failed, {} unchecked",
        engine.catalog().leaf_count(),
        fixtures::representatives().len(),
        report.passed(),
        report.failed(),
        report.unchecked()
    );
    for check in report.failures() {
        println!(
            "  FAIL {:<6} {:<32} expected {:<5} got {}",
            check.principal,
            check.key,
            check.expected.map_or("-".to_string(), |e| e.to_string()),
            check.decision
        );
    }
    for finding in &report.findings {
        println!(
            "  WARN {:<6} {:<32} {}",
            finding.principal.as_deref().unwrap_or("-"),
            finding.key,
            finding.message
        );
    }
    println!();

    if report.is_clean() {
        Ok(())
    } else {
        Err(WardenError::ConfigError {
            reason: format!("{} decision(s) did not match expectations", report.failed()),
        })
    }
}

fn run_tree(id: &str, config: Option<PathBuf>) -> WardenResult<()> {
    let engine = load_engine(config)?;
    let principal = fixtures::principal(id).ok_or_else(|| WardenError::ConfigError {
        reason: format!("unknown fixture principal '{id}'"),
    })?;

    println!("Grant tree for {} (role {}):", principal.id, principal.role);
    for tenant in engine.grant_tree(&principal) {
        print_tenant(&tenant);
    }
    println!();
    Ok(())
}

// ── Output ────────────────────────────────────────────────────────────────────

fn mark(state: GrantState) -> &'static str {
    match state {
        GrantState::Full => "[x]",
        GrantState::Partial => "[-]",
        GrantState::None => "[ ]",
    }
}

fn print_tenant(tenant: &TenantNode) {
    println!("{} {} ({})", mark(tenant.state), tenant.name, tenant.key);
    for unit in &tenant.units {
        println!("    {} {} ({})", mark(unit.state), unit.name, unit.key);
        for capability in &unit.capabilities {
            println!(
                "        {} {:<24} {}",
                mark(GrantState::from_granted(capability.decision.is_granted())),
                capability.name,
                capability.decision
            );
        }
    }
}

fn print_banner() {
    println!();
    println!("WARDEN: Tenant-scoped Authorization");
    println!("Operations Portal Reference Demo");
    println!("===================================");
    println!();
    println!("Every access check resolves (tenant, unit, capability):");
    println!("  [1] Admin role or wildcard grant → granted");
    println!("  [2] Target must name a live catalog leaf, otherwise denied");
    println!("  [3] Flat grant key, then legacy nested grant; flat wins");
    println!("  [4] Nothing found → denied");
    println!();
}
