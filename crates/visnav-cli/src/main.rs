//! `visnav-cli` – command line entry point.
//!
//! Runs one navigation goal against the simulated desktop:
//!
//! 1. Loads (or first-run initialises) `~/.visnav/config.toml`.
//! 2. Initialises structured logging / optional OTLP export.
//! 3. Subscribes to the engine's verdict and transition streams and prints
//!    them live.
//! 4. Intercepts **Ctrl-C** to cancel the running goal cleanly – the engine
//!    finishes with a failure report instead of being killed mid-cycle.
//!
//! Usage: `visnav [target-context]`, e.g. `visnav main_menu`. The target
//! falls back to the configured one.

mod config;

use std::sync::Arc;
use std::sync::atomic::Ordering;

use colored::Colorize;
use tracing::error;

use visnav_hal::SimDesktop;
use visnav_middleware::Topic;
use visnav_perception::ContextCatalog;
use visnav_runtime::{EngineConfig, NavigationEngine, telemetry};
use visnav_types::{ContextLabel, EventPayload, NavError, NavigationReport};

use crate::config::{CliConfig, parse_context};

fn main() {
    // Hold the guard so pending OTel spans flush on exit.
    let _telemetry_guard = telemetry::init_tracing("visnav");

    print_banner();

    let config_path = CliConfig::default_path();
    let config = match CliConfig::load_or_init(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} failed to load {}: {e}",
                "error:".red().bold(),
                config_path.display()
            );
            std::process::exit(1);
        }
    };

    // `visnav <target>` overrides the configured target.
    let target_name = std::env::args().nth(1).unwrap_or_else(|| config.target.clone());
    let Some(target) = parse_context(&target_name) else {
        eprintln!(
            "{} unknown target context '{target_name}' (try main_menu, single_player_menu, options_menu, in_game)",
            "error:".red().bold()
        );
        std::process::exit(2);
    };
    let start = parse_context(&config.start_context).unwrap_or(ContextLabel::InGame);

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{} failed to start async runtime: {e}", "error:".red().bold());
            std::process::exit(1);
        }
    };

    match runtime.block_on(run_goal(config.engine, start, target)) {
        Ok(report) => {
            print_success(&report);
        }
        Err(NavError::RecoveryExhausted { report }) => {
            print_failure(&report);
            std::process::exit(1);
        }
        Err(e) => {
            error!(error = %e, "navigation aborted");
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(1);
        }
    }
}

/// Build the simulated desktop + engine, wire Ctrl-C and the event printer,
/// and run one goal to completion.
async fn run_goal(
    engine_config: EngineConfig,
    start: ContextLabel,
    target: ContextLabel,
) -> Result<NavigationReport, NavError> {
    let desktop = SimDesktop::new(start);
    let mut engine = NavigationEngine::new(
        engine_config,
        ContextCatalog::default(),
        Box::new(desktop.screen()),
        Box::new(desktop.input()),
        Arc::new(desktop.recognizer()),
    );

    // ── Ctrl-C: cancel the goal, let the engine finish with a report ──────
    let cancel = engine.cancel_flag();
    if let Err(e) = ctrlc::set_handler(move || {
        eprintln!("\n{}", "cancelling navigation goal…".yellow());
        cancel.store(true, Ordering::Release);
    }) {
        error!(error = %e, "could not install Ctrl-C handler");
    }

    // ── Live event printers ───────────────────────────────────────────────
    let mut verdicts = engine.bus().subscribe_to(Topic::Verdicts);
    tokio::spawn(async move {
        while let Ok(event) = verdicts.recv().await {
            if let EventPayload::Verdict(v) = event.payload {
                println!(
                    "  {} {} ({})",
                    "verdict".cyan(),
                    v.context.to_string().bold(),
                    v.tier
                );
            }
        }
    });
    let mut transitions = engine.bus().subscribe_to(Topic::Transitions);
    tokio::spawn(async move {
        while let Ok(event) = transitions.recv().await {
            if let EventPayload::Transition {
                from,
                to,
                attempt,
                recovery_tier,
            } = event.payload
            {
                if from != to {
                    println!(
                        "  {} {from} → {to} (attempt {attempt}, tier {recovery_tier})",
                        "state  ".magenta()
                    );
                }
            }
        }
    });

    println!(
        "{} {} → {}\n",
        "navigating".green().bold(),
        start,
        target.to_string().bold()
    );
    engine.navigate(target).await
}

fn print_banner() {
    println!(
        "{}",
        r"
        _
 __   _(_)___ _ __   __ ___   __
 \ \ / / / __| '_ \ / _` \ \ / /
  \ V /| \__ \ | | | (_| |\ V /
   \_/ |_|___/_| |_|\__,_| \_/
"
        .cyan()
    );
    println!(
        "  {}\n",
        "signal-fusion screen navigation".italic().dimmed()
    );
}

fn print_success(report: &NavigationReport) {
    println!(
        "\n{} reached {} in {} attempt(s), {} ms (highest tier {})",
        "success:".green().bold(),
        report.final_context.to_string().bold(),
        report.attempts,
        report.elapsed_ms,
        report.highest_tier,
    );
}

fn print_failure(report: &NavigationReport) {
    println!(
        "\n{} could not reach {} – {} (attempts {}, highest tier {}, {} cycles observed)",
        "failed:".red().bold(),
        report.target.to_string().bold(),
        report
            .failure_reason
            .as_deref()
            .unwrap_or("unknown reason"),
        report.attempts,
        report.highest_tier,
        report.trail.len(),
    );
    for entry in &report.trail {
        println!(
            "    cycle: {} ({}) → {}",
            entry.verdict.context, entry.verdict.tier, entry.phase
        );
    }
}
