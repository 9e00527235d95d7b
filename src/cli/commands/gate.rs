//! Gate command - replay address/energy steps against an energy gate

use crate::cli::args::{GateArgs, OutputFormat};
use crate::config::Config;
use crate::error::{QueryKitError, QueryKitResult};
use crate::gate::{EnergyGate, EnergyWait};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use tracing::debug;

/// One scripted change to the account
#[derive(Debug, Clone, PartialEq)]
pub enum GateStep {
    Address(String),
    Energy(f64),
}

impl GateStep {
    /// Parse `addr:<id>` or `energy:<number>`
    pub fn parse(raw: &str) -> QueryKitResult<Self> {
        let (kind, value) = raw
            .split_once(':')
            .ok_or_else(|| QueryKitError::InvalidStep(raw.to_string()))?;

        match kind {
            "addr" | "address" if !value.is_empty() => Ok(Self::Address(value.to_string())),
            "energy" => value
                .trim()
                .parse()
                .map(Self::Energy)
                .map_err(|_| QueryKitError::InvalidStep(raw.to_string())),
            _ => Err(QueryKitError::InvalidStep(raw.to_string())),
        }
    }
}

/// Row of the final report
#[derive(Debug, Serialize)]
struct WaitReport {
    id: u64,
    address: String,
    created_after_step: usize,
    resolved: bool,
}

/// Execute the gate command
pub async fn execute(args: GateArgs, config: &Config) -> QueryKitResult<()> {
    let steps = args
        .steps
        .iter()
        .map(|raw| GateStep::parse(raw))
        .collect::<QueryKitResult<Vec<_>>>()?;

    let policy = args.policy.unwrap_or(config.gate.policy);
    let gate = EnergyGate::new(args.address.clone(), args.energy, policy);
    debug!("Replaying {} step(s) with policy {}", steps.len(), policy);

    // Collect every wait the gate hands out, remembering when it appeared
    let mut waits: Vec<(EnergyWait, String, usize)> =
        vec![(gate.latest(), args.address.clone(), 0)];

    for (index, step) in steps.iter().enumerate() {
        match step {
            GateStep::Address(address) => gate.set_address(address.clone()),
            GateStep::Energy(energy) => {
                gate.set_energy(*energy);
            }
        }

        let latest = gate.latest();
        if waits.last().is_some_and(|(wait, _, _)| wait.id() != latest.id()) {
            waits.push((latest, gate.address(), index + 1));
        }
    }

    let mut report = Vec::with_capacity(waits.len());
    for (wait, address, created_after_step) in waits {
        let resolved = wait.is_resolved();
        if resolved {
            // Resolved waits complete immediately
            wait.clone().wait().await?;
        }
        report.push(WaitReport {
            id: wait.id(),
            address,
            created_after_step,
            resolved,
        });
    }

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => {
            for row in &report {
                println!("{} {} {}", row.id, row.address, row.resolved);
            }
        }
        OutputFormat::Table => print_table(&report, policy.to_string()),
    }

    Ok(())
}

fn print_table(report: &[WaitReport], policy: String) {
    let ctx = UiContext::detect();
    ui::intro(&ctx, &format!("Energy gate ({})", policy));

    println!(
        "{:<6} {:<20} {:<8} {:<10}",
        style("WAIT").bold(),
        style("ADDRESS").bold(),
        style("STEP").bold(),
        style("STATUS").bold()
    );
    println!("{}", "-".repeat(46));

    for row in report {
        let status = if row.resolved {
            style("resolved").green()
        } else {
            style("pending").yellow()
        };
        println!(
            "{:<6} {:<20} {:<8} {:<10}",
            row.id, row.address, row.created_after_step, status
        );
    }

    let pending = report.iter().filter(|row| !row.resolved).count();
    println!();
    ui::key_value_status(
        &ctx,
        "pending waits",
        &pending.to_string(),
        pending == 0,
    );
}
