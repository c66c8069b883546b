//! `caveat simulate` - Run a scenario against the in-memory host.

use super::super::args::{OutputFormat, SimulateArgs};
use super::report;
use crate::exit_codes::{EXPECTATION_MISMATCH, SUCCESS};
use crate::scenario::{run_scenario, Scenario, ScenarioReport};
use anyhow::{Context, Result};

pub fn cmd_simulate(args: SimulateArgs) -> i32 {
    report(run_simulate(args))
}

fn run_simulate(args: SimulateArgs) -> Result<i32> {
    let raw = std::fs::read_to_string(&args.scenario)
        .with_context(|| format!("failed to read scenario: {}", args.scenario.display()))?;
    let scenario = Scenario::from_yaml(&raw)
        .with_context(|| format!("invalid scenario: {}", args.scenario.display()))?;

    let outcome = run_scenario(&scenario, args.fail_fast)?;
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_text(&outcome),
    }

    Ok(if outcome.passed() {
        SUCCESS
    } else {
        EXPECTATION_MISMATCH
    })
}

fn print_text(outcome: &ScenarioReport) {
    for step in &outcome.steps {
        let status = if step.matched { "PASS" } else { "FAIL" };
        let label = step.name.as_deref().unwrap_or(step.action);
        if step.matched {
            println!("[{status}] #{} {label}: {}", step.index, step.outcome_str());
        } else {
            println!(
                "[{status}] #{} {label}: expected {}, got {}",
                step.index,
                step.expected.as_str(),
                step.outcome_str()
            );
        }
        if let Some(error) = &step.error {
            println!("       {error}");
        }
    }

    for call in &outcome.failed_calls {
        println!(
            "skipped call #{} on {}: {}",
            call.index, call.account, call.reason
        );
    }

    println!();
    println!(
        "{} step(s), {} mismatch(es), {} event(s)",
        outcome.steps.len(),
        outcome.mismatches(),
        outcome.events.len()
    );
}
