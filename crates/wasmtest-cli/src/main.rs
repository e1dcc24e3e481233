use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process;

use tracing_subscriber::EnvFilter;
use wasmtest_core::contracts;
use wasmtest_core::executor::{CaseOutcome, Runner, SuiteReport};
use wasmtest_core::verifier::{self, Severity, VerificationResult};
use wasmtest_core::{normalizer, parser, Error, Result, RunnerConfig};

/// wasmtest — contract fixture runner
///
/// Check, format, hash, and run JSON contract fixtures.
#[derive(Parser)]
#[command(name = "wasmtest", version, about, long_about = None)]
struct Cli {
    /// Runner configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential stdout
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and verify a fixture
    Check {
        /// Path to fixture .json file
        file: PathBuf,
        /// Verify against this reference contract's methods
        #[arg(long)]
        contract: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print a fixture in canonical form
    Fmt {
        /// Path to fixture .json file
        file: PathBuf,
    },

    /// Compute the SHA-256 fixture hash
    Hash {
        /// Path to fixture .json file
        file: PathBuf,
    },

    /// Run a fixture against a reference contract
    Run {
        /// Path to fixture .json file
        file: PathBuf,
        /// Target contract name (e.g. test_add.wasm)
        #[arg(long)]
        contract: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run every reference contract's embedded fixture
    Selftest {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List reference contracts and their methods
    Contracts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let exit_code = match dispatch(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            2
        }
    };

    process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = EnvFilter::try_from_env("WASMTEST_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    // a second init (never expected) is not worth failing over
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr)
        .try_init();
}

fn dispatch(cli: &Cli) -> Result<i32> {
    let config = match &cli.config {
        Some(path) => RunnerConfig::load(path)?,
        None => RunnerConfig::default(),
    };
    tracing::debug!(?config, "runner config");

    match &cli.command {
        Commands::Check {
            file,
            contract,
            json,
        } => cmd_check(file, contract.as_deref(), *json, cli.quiet),
        Commands::Fmt { file } => cmd_fmt(file),
        Commands::Hash { file } => cmd_hash(file),
        Commands::Run {
            file,
            contract,
            json,
        } => cmd_run(&config, file, contract, *json, cli.quiet),
        Commands::Selftest { json } => cmd_selftest(&config, *json, cli.quiet),
        Commands::Contracts { json } => cmd_contracts(*json),
    }
}

// ── Commands ──────────────────────────────────────────────

fn cmd_check(file: &Path, contract: Option<&str>, json: bool, quiet: bool) -> Result<i32> {
    let suite = parser::parse_suite_file(file)?;
    let result = match contract {
        Some(name) => verifier::verify(&suite, &find_contract(name)?.table),
        None => verifier::verify_literals(&suite),
    };

    if json {
        print_json(&serde_json::json!({
            "valid": result.is_valid(),
            "cases": suite.case_count(),
            "errors": result.errors().len(),
            "warnings": result.warnings().len(),
            "diagnostics": result.diagnostics,
        }))?;
    } else {
        print_diagnostics(&result);
        if !quiet && result.is_valid() {
            println!(
                "{} {} ({} case(s))",
                "✓".green(),
                "valid".green(),
                suite.case_count()
            );
        }
    }

    Ok(if result.is_valid() { 0 } else { 1 })
}

fn cmd_fmt(file: &Path) -> Result<i32> {
    let text = read_fixture(file)?;
    print!("{}", normalizer::normalize(&text)?);
    Ok(0)
}

fn cmd_hash(file: &Path) -> Result<i32> {
    let suite = parser::parse_suite_file(file)?;
    println!("{}", normalizer::compute_fixture_hash(&suite)?);
    Ok(0)
}

fn cmd_run(config: &RunnerConfig, file: &Path, contract: &str, json: bool, quiet: bool) -> Result<i32> {
    let suite = parser::parse_suite_file(file)?;
    let module = find_contract(contract)?;
    let mut engine = config.build_engine()?;
    let target = engine
        .address_of(module.name)
        .ok_or_else(|| Error::Config(format!("contract '{}' is not deployed", module.name)))?;

    let report = Runner::new(config.run_options()).run_suite(&mut engine, &target, &suite);

    if json {
        print_json(&report)?;
    } else {
        print_report(module.name, &report, quiet);
    }
    Ok(if report.is_success() { 0 } else { 1 })
}

fn cmd_selftest(config: &RunnerConfig, json: bool, quiet: bool) -> Result<i32> {
    let runner = Runner::new(config.run_options());
    let mut reports = Vec::new();
    for name in contracts::names() {
        let mut engine = config.build_engine()?;
        reports.push((name, runner.run_embedded(&mut engine, name)?));
    }

    if json {
        let entries: Vec<_> = reports
            .iter()
            .map(|(name, report)| serde_json::json!({ "contract": name, "report": report }))
            .collect();
        print_json(&entries)?;
    } else {
        for (name, report) in &reports {
            print_report(name, report, quiet);
        }
    }

    let all_passed = reports.iter().all(|(_, r)| r.is_success());
    Ok(if all_passed { 0 } else { 1 })
}

fn cmd_contracts(json: bool) -> Result<i32> {
    let modules = contracts::builtin();

    if json {
        let entries: Vec<_> = modules
            .iter()
            .map(|m| {
                let methods: serde_json::Map<String, serde_json::Value> = m
                    .table
                    .method_names()
                    .filter_map(|method| {
                        let sig = m.table.signature(method)?;
                        Some((method.to_string(), serde_json::to_value(sig).ok()?))
                    })
                    .collect();
                serde_json::json!({
                    "name": m.name,
                    "address": wasmtest_core::Address::from_code(m.name.as_bytes()),
                    "methods": methods,
                })
            })
            .collect();
        print_json(&entries)?;
        return Ok(0);
    }

    for m in &modules {
        println!(
            "{} {}",
            m.name.bold(),
            wasmtest_core::Address::from_code(m.name.as_bytes())
                .to_string()
                .dimmed()
        );
        for method in m.table.method_names() {
            if let Some(sig) = m.table.signature(method) {
                let params: Vec<&str> = sig.params.iter().map(|p| p.tag()).collect();
                let returns = sig.returns.map(|r| r.tag()).unwrap_or("void");
                let context = if sig.needs_context { " [context]" } else { "" };
                println!("  {}({}) -> {}{}", method, params.join(", "), returns, context);
            }
        }
    }
    Ok(0)
}

// ── Helpers ───────────────────────────────────────────────

fn read_fixture(file: &Path) -> Result<String> {
    std::fs::read_to_string(file).map_err(|e| Error::Io(format!("{}: {}", file.display(), e)))
}

fn find_contract(name: &str) -> Result<contracts::ContractModule> {
    contracts::find(name).ok_or_else(|| {
        Error::Config(format!(
            "unknown contract '{}' (available: {})",
            name,
            contracts::names().join(", ")
        ))
    })
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| Error::Io(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

fn print_diagnostics(result: &VerificationResult) {
    for d in &result.diagnostics {
        match d.severity {
            Severity::Error => eprintln!("{}", d.to_string().red()),
            Severity::Warning => eprintln!("{}", d.to_string().yellow()),
        }
    }
}

fn print_report(name: &str, report: &SuiteReport, quiet: bool) {
    if !quiet {
        println!("{} {}", name.bold(), report.target.to_string().dimmed());
        for group in &report.groups {
            for case in &group.cases {
                match &case.outcome {
                    CaseOutcome::Pass => println!(
                        "  {} group {} case {} {}",
                        "PASS".green(),
                        group.index,
                        case.index,
                        case.method
                    ),
                    CaseOutcome::Fail(failure) => println!(
                        "  {} group {} case {} {} ({}): {}",
                        "FAIL".red(),
                        group.index,
                        case.index,
                        case.method,
                        failure.phase,
                        failure.message
                    ),
                }
            }
        }
    }

    let summary = format!("{} passed, {} failed", report.passed, report.failed);
    if report.is_success() {
        println!("{} {}", "✓".green(), summary.green());
    } else {
        println!("{} {}", "✗".red(), summary.red());
    }
}
