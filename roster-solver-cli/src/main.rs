/*
 * Copyright (c) 2025 Clément GRENNERAT
 *
 * This program is free software: you can redistribute it and/or modify it under the terms of the
 * GNU General Public License as published by the Free Software Foundation, version 3.
 * This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without
 * even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.
 * See the GNU General Public License for more details.
 * You should have received a copy of the GNU General Public License along with this program.
 * If not, see https://www.gnu.org/licenses/.
 *
 */

use chrono::{Days, NaiveDate};
use log::{LevelFilter, info};
use roster_solver_core::model::configuration::SolverConfig;
use roster_solver_core::model::driver::DriverSpec;
use roster_solver_core::model::plan::Plan;
use roster_solver_core::model::tour::Tour;
use roster_solver_core::solver::events::{CancellationToken, Event, EventSink};
use roster_solver_core::solver::run::{SolveRequest, solve};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::ExitCode;

/// Input bundle: the normalised tour list plus an optional driver pool.
/// A bare JSON array of tours is accepted as well.
#[derive(Deserialize)]
struct InputFile {
    tours: Vec<Tour>,
    #[serde(default)]
    drivers: Option<Vec<DriverSpec>>,
}

struct LogSink;

impl EventSink for LogSink {
    fn on_event(&mut self, event: &Event) {
        info!("event #{}: {:?}", event.seq, event.kind);
    }
}

fn main() -> ExitCode {
    env_logger::Builder::new()
        .filter(None, LevelFilter::Info)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let mut week_start: Option<NaiveDate> = None;
    let mut files: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        if let Some(date) = arg.strip_prefix("--week-start=") {
            match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
                Ok(parsed) => week_start = Some(parsed),
                Err(e) => {
                    eprintln!("Invalid --week-start date {date}: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            files.push(arg);
        }
    }
    let [input_path, config_path @ ..] = files.as_slice() else {
        eprintln!("Usage: roster-solver-cli <tours.json> [config.yaml] [--week-start=YYYY-MM-DD]");
        return ExitCode::FAILURE;
    };

    let input = match load_input(input_path) {
        Ok(input) => input,
        Err(message) => {
            eprintln!("{message}");
            return ExitCode::FAILURE;
        }
    };
    let (config, config_reasons) = match config_path.first() {
        Some(path) => match load_config(path) {
            Ok(loaded) => loaded,
            Err(message) => {
                eprintln!("{message}");
                return ExitCode::FAILURE;
            }
        },
        None => (SolverConfig::default(), Vec::new()),
    };

    let request = SolveRequest {
        tours: input.tours,
        drivers: input.drivers,
        config,
        config_reasons,
    };
    let plan = match solve(request, Some(Box::new(LogSink)), CancellationToken::new()) {
        Ok(plan) => plan,
        Err(e) => {
            eprintln!("Kernel error: {e}");
            return ExitCode::FAILURE;
        }
    };

    print_summary(&plan, week_start);
    println!("{}", serde_json::to_string_pretty(&plan).expect("plan serialises"));
    if plan.status.is_accepted() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    }
}

fn load_input(path: &str) -> Result<InputFile, String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Cannot read {path}: {e}"))?;
    // Either the full bundle or a bare tour array.
    serde_json::from_str::<InputFile>(&content)
        .or_else(|_| {
            serde_json::from_str::<Vec<Tour>>(&content)
                .map(|tours| InputFile { tours, drivers: None })
        })
        .map_err(|e| format!("Cannot parse {path}: {e}"))
}

/// Loads the configuration bundle from a flat YAML mapping. Values are passed
/// through the kernel's own `key=value` boundary, so unknown keys and locked
/// keys are rejected with the same errors an API caller would see.
fn load_config(
    path: &str,
) -> Result<(SolverConfig, Vec<roster_solver_core::model::plan::Reason>), String> {
    let content =
        std::fs::read_to_string(path).map_err(|e| format!("Cannot read {path}: {e}"))?;
    let raw: BTreeMap<String, serde_yaml::Value> =
        serde_yaml::from_str(&content).map_err(|e| format!("Cannot parse {path}: {e}"))?;
    let mut entries = BTreeMap::new();
    for (key, value) in raw {
        entries.insert(key, yaml_scalar(&value)?);
    }
    SolverConfig::from_entries(&entries).map_err(|e| format!("Configuration rejected: {e}"))
}

fn yaml_scalar(value: &serde_yaml::Value) -> Result<String, String> {
    match value {
        serde_yaml::Value::String(s) => Ok(s.clone()),
        serde_yaml::Value::Number(n) => Ok(n.to_string()),
        serde_yaml::Value::Bool(b) => Ok(b.to_string()),
        serde_yaml::Value::Sequence(items) => {
            let parts: Result<Vec<String>, String> = items.iter().map(yaml_scalar).collect();
            Ok(parts?.join(","))
        }
        _ => Err("Configuration values must be scalars or flat lists".to_string()),
    }
}

fn print_summary(plan: &Plan, week_start: Option<NaiveDate>) {
    if let Some(monday) = week_start {
        let labels: Vec<String> = (0..7u64)
            .map(|d| {
                monday
                    .checked_add_days(Days::new(d))
                    .map(|date| date.format("%a %Y-%m-%d").to_string())
                    .unwrap_or_default()
            })
            .collect();
        info!("Week starting {}: {}", monday, labels.join(" | "));
    }
    info!(
        "Status {:?}: {} drivers ({} FTE / {} PT), {}/{} tours, PT share {:.1}%",
        plan.status,
        plan.kpis.drivers_total,
        plan.kpis.fte_count,
        plan.kpis.pt_count,
        plan.kpis.tours_assigned,
        plan.kpis.tours_total,
        plan.kpis.pt_share_hours_pct,
    );
    for reason in &plan.reasons {
        info!("Reason {:?}: {}", reason.code, reason.detail);
    }
    plan.to_table().printstd();
}
