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

use crate::model::column::{Column, ColumnIdx, DriverType};
use crate::solver::budget::Phase;
use crate::solver::events::CancellationToken;
use crate::solver::lower_bound::LowerBounds;
use crate::solver::master::{
    MasterContext, MasterOutcome, MasterStatus, generate_columns, restricted_mip,
};
use crate::solver::pool::ColumnPool;
use crate::solver::pricing::ColumnProducer;
use crate::solver::rules::RuleSet;
use log::{debug, info};
use std::time::{Duration, Instant};

/// Penalty per 1-tour block whose tour had a multi-tour alternative.
const POLISH_SINGLE_PENALTY: f64 = 10.0;
/// Bonus per 3-tour block.
const POLISH_TRIPLE_BONUS: f64 = 1.0;
/// Blocks a column can hold at most, one per weekday.
const MAX_BLOCKS_PER_COLUMN: f64 = 7.0;

#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best feasible solution found: driver count and selection.
    pub best: Option<(usize, Vec<ColumnIdx>)>,
    /// True when the bisection closed without an undecided cap and the final
    /// MIP at D* finished proven.
    pub proven_optimal: bool,
    pub cancelled: bool,
    pub timed_out: bool,
}

/// Lexicographic D-search, first objective: minimise the driver count by
/// coarse bisection between the combined lower bound and the singleton upper
/// bound, then a fine descent when a trial was undecided.
pub fn search(
    mc: &mut MasterContext,
    pool: &mut ColumnPool,
    oracle: &mut ColumnProducer,
    bounds: &LowerBounds,
    pool_cap: Option<usize>,
    cancel: &CancellationToken,
) -> SearchOutcome {
    let mut outcome = SearchOutcome {
        best: None,
        proven_optimal: false,
        cancelled: false,
        timed_out: false,
    };
    let singleton_ub = mc.tours.len().max(1);
    let start_ub = pool_cap.unwrap_or(singleton_ub).min(singleton_ub);
    if start_ub == 0 {
        return outcome;
    }
    let mut lo = bounds.final_lb.max(1);
    if lo > start_ub {
        // The pool cap sits below the proven lower bound.
        if pool_cap.is_some() {
            info!("Driver pool cap {} is below the lower bound {}", start_ub, lo);
            let trial = try_cap(mc, pool, oracle, start_ub, &mut outcome);
            if trial.status == MasterStatus::Timeout {
                outcome.timed_out = true;
            }
            record_feasible(&mut outcome, trial);
            return outcome;
        }
        lo = start_ub;
    }

    // Anchor the search with the upper bound.
    let anchor = try_cap(mc, pool, oracle, start_ub, &mut outcome);
    if anchor.status == MasterStatus::Timeout {
        outcome.timed_out = true;
    }
    let mut proven_at_best = record_feasible(&mut outcome, anchor);
    let Some((mut hi, _)) = outcome.best.clone() else {
        return outcome;
    };

    // Coarse bisection while every trial is decisive.
    let mut decisive = true;
    while lo < hi {
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            return outcome;
        }
        if mc.budget.phase_elapsed(Phase::Search) {
            outcome.timed_out = true;
            break;
        }
        let mid = (lo + hi) / 2;
        debug!("D-search bisection: lo={}, hi={}, trying cap {}", lo, hi, mid);
        let trial = try_cap(mc, pool, oracle, mid, &mut outcome);
        match trial.status {
            MasterStatus::Optimal | MasterStatus::Feasible => {
                let drivers = trial.selected.len().max(lo);
                proven_at_best = record_feasible(&mut outcome, trial);
                hi = drivers.min(mid);
            }
            MasterStatus::Infeasible => {
                lo = mid + 1;
            }
            MasterStatus::Timeout | MasterStatus::ZeroSupport => {
                decisive = false;
                break;
            }
        }
    }

    // Fine search: descend one cap at a time below the incumbent.
    if !decisive {
        let mut d = hi;
        while d > lo {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                return outcome;
            }
            if mc.budget.phase_elapsed(Phase::Search) {
                outcome.timed_out = true;
                break;
            }
            let trial = try_cap(mc, pool, oracle, d - 1, &mut outcome);
            match trial.status {
                MasterStatus::Optimal | MasterStatus::Feasible => {
                    proven_at_best = record_feasible(&mut outcome, trial);
                    d -= 1;
                }
                _ => break,
            }
        }
    }

    outcome.proven_optimal = decisive && !outcome.timed_out && proven_at_best;
    if let Some((d, _)) = &outcome.best {
        info!(
            "D-search finished: D*={}, proven={}, lb={}",
            d, outcome.proven_optimal, bounds.final_lb
        );
    }
    outcome
}

/// One trial at driver cap D: column generation to price the cap, restricted
/// MIP, and escalation to the final MIP on the whole pool when the verdict is
/// not proven and budget remains. ZERO_SUPPORT asks the producer for more
/// columns once and retries.
fn try_cap(
    mc: &mut MasterContext,
    pool: &mut ColumnPool,
    oracle: &mut ColumnProducer,
    cap: usize,
    outcome: &mut SearchOutcome,
) -> MasterOutcome {
    for attempt in 0..2 {
        let report = generate_columns(mc, pool, oracle, cap, Phase::Search);
        if !report.feasible {
            return MasterOutcome {
                status: MasterStatus::Infeasible,
                selected: Vec::new(),
                objective: f64::INFINITY,
                unsupported: Vec::new(),
            };
        }
        let deadline = mip_deadline(mc, mc.cfg.mip_time_limit_restricted);
        let restricted = restricted_mip(
            mc,
            pool,
            &report,
            &|_| 1.0,
            cap,
            mc.cfg.n_subset_cap,
            deadline,
        );
        match restricted.status {
            MasterStatus::ZeroSupport if attempt == 0 => {
                debug!("Zero support at cap {}; requesting more columns", cap);
                continue;
            }
            MasterStatus::Optimal | MasterStatus::Infeasible => return restricted,
            MasterStatus::Feasible | MasterStatus::Timeout => {
                if Instant::now() >= mc.budget.total_deadline() {
                    if restricted.status == MasterStatus::Timeout {
                        outcome.timed_out = true;
                    }
                    return restricted;
                }
                // Final MIP on the full pool with the remaining budget.
                let deadline = mip_deadline(mc, mc.cfg.mip_time_limit_final);
                let full =
                    restricted_mip(mc, pool, &report, &|_| 1.0, cap, pool.len(), deadline);
                return match full.status {
                    MasterStatus::Timeout if restricted.status == MasterStatus::Feasible => {
                        restricted
                    }
                    _ => full,
                };
            }
            MasterStatus::ZeroSupport => return restricted,
        }
    }
    unreachable!("try_cap retries are bounded")
}

fn mip_deadline(mc: &MasterContext, limit_seconds: f64) -> Instant {
    let capped = Instant::now() + Duration::from_secs_f64(limit_seconds);
    capped.min(mc.budget.total_deadline())
}

fn record_feasible(outcome: &mut SearchOutcome, trial: MasterOutcome) -> bool {
    match trial.status {
        MasterStatus::Optimal | MasterStatus::Feasible => {
            let drivers = trial.selected.len();
            let better = match &outcome.best {
                None => true,
                Some((best, _)) => drivers < *best,
            };
            if better {
                outcome.best = Some((drivers, trial.selected));
            }
            trial.status == MasterStatus::Optimal
        }
        _ => false,
    }
}

/// Secondary objectives at fixed D*: a weighted composite realising the
/// lexicographic order (PT-hour share, then block-mix quality), with the
/// separation weights sized to D* so the order stays strict. The final
/// signature tiebreak falls out of the deterministic branching order.
pub fn polish(
    mc: &mut MasterContext,
    pool: &mut ColumnPool,
    d_star: usize,
    incumbent: Vec<ColumnIdx>,
) -> Vec<ColumnIdx> {
    let cost_fn = polish_cost_fn(mc, d_star);
    let order = pool.canonical_order();
    let cols: Vec<crate::solver::simplex::LpColumn> = order
        .iter()
        .map(|&c| {
            let column = pool.column(c);
            crate::solver::simplex::LpColumn {
                cost: cost_fn(column),
                rows: column.tour_idxs.to_vec(),
            }
        })
        .collect();
    let lp = crate::solver::simplex::solve_set_partition_lp(&cols, mc.tours.len(), d_star as f64);
    let mut values = vec![0.0; pool.len()];
    for (pos, &c) in order.iter().enumerate() {
        values[c as usize] = lp.values[pos];
    }
    let report = crate::solver::master::RmpReport {
        feasible: lp.status == crate::solver::simplex::LpStatus::Optimal,
        objective: lp.objective,
        values,
    };
    if !report.feasible {
        return incumbent;
    }
    let deadline = mip_deadline(mc, mc.cfg.mip_time_limit_final);
    let polished = restricted_mip(
        mc,
        pool,
        &report,
        &cost_fn,
        d_star,
        mc.cfg.n_subset_cap,
        deadline,
    );
    match polished.status {
        MasterStatus::Optimal | MasterStatus::Feasible if !polished.selected.is_empty() => {
            info!(
                "Polish accepted: objective {:.1} over {} drivers",
                polished.objective,
                polished.selected.len()
            );
            polished.selected
        }
        _ => incumbent,
    }
}

struct PolishWeights {
    driver: f64,
    pt: f64,
}

/// Separation weights sized to the instance. The objective order is strict
/// only if a 1-minute PT-hour delta outweighs the largest possible block-mix
/// swing over the whole selection, and one driver outweighs the largest
/// possible PT-hour term; both bounds scale with the driver cap.
fn polish_weights(rules: &RuleSet, d_cap: usize) -> PolishWeights {
    let columns = d_cap.max(1) as f64;
    let mix_bound =
        (POLISH_SINGLE_PENALTY + POLISH_TRIPLE_BONUS) * MAX_BLOCKS_PER_COLUMN * columns;
    let pt = 2.0 * 60.0 * mix_bound;
    let pt_bound = pt * (rules.weekly_cap_min as f64 / 60.0) * columns;
    let driver = 2.0 * (pt_bound + mix_bound);
    PolishWeights { driver, pt }
}

fn polish_cost_fn<'a>(mc: &MasterContext<'a>, d_cap: usize) -> impl Fn(&Column) -> f64 + use<'a> {
    let rules = mc.rules;
    let blocks = mc.blocks;
    let weights = polish_weights(rules, d_cap);
    move |column: &Column| {
        let pt_hours = match rules.driver_type(column.work_min) {
            DriverType::Pt => column.hours(),
            DriverType::Fte => 0.0,
        };
        let mut mix = 0.0;
        for &b in column.block_idxs.iter() {
            let block = blocks.block(b);
            match block.tours_count() {
                3 => mix -= POLISH_TRIPLE_BONUS,
                1 => {
                    // Penalise only when the tour had a multi-tour alternative.
                    let tour = block.tour_idxs[0];
                    if blocks.by_tour[tour as usize].len() > 1 {
                        mix += POLISH_SINGLE_PENALTY;
                    }
                }
                _ => {}
            }
        }
        weights.driver + weights.pt * pt_hours + mix
    }
}
