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

use crate::model::column::{Column, ColumnIdx};
use crate::model::configuration::SolverConfig;
use crate::model::tour::{TourIdx, TourList};
use crate::solver::block_builder::BlockPool;
use crate::solver::budget::{MemoryGauge, MemoryPressure, Phase, RunBudget};
use crate::solver::events::{EventKind, EventLog};
use crate::solver::pool::ColumnPool;
use crate::solver::pricing::{ColumnProducer, Duals, PoolView};
use crate::solver::rules::RuleSet;
use crate::solver::simplex::{LpColumn, LpStatus, solve_set_partition_lp};
use log::{debug, info, warn};
use rand::rngs::StdRng;
use std::collections::BTreeSet;
use std::time::Instant;

const INT_EPS: f64 = 1e-6;
/// Column-generation rounds are additionally iteration-bounded so that small
/// instances terminate on convergence, not on the wall clock.
const MAX_CG_ROUNDS: usize = 60;
/// Columns requested from the oracle per round under normal memory pressure.
const CG_BATCH: usize = 40;
/// Batch size once the memory gauge reports soft pressure.
const CG_BATCH_BACKOFF: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MasterStatus {
    Optimal,
    Feasible,
    Infeasible,
    Timeout,
    ZeroSupport,
}

#[derive(Debug, Clone)]
pub struct MasterOutcome {
    pub status: MasterStatus,
    /// Selected columns in canonical signature order.
    pub selected: Vec<ColumnIdx>,
    pub objective: f64,
    /// Tour ids without support, only set on ZERO_SUPPORT.
    pub unsupported: Vec<TourIdx>,
}

impl MasterOutcome {
    fn of(status: MasterStatus) -> MasterOutcome {
        MasterOutcome { status, selected: Vec::new(), objective: f64::INFINITY, unsupported: Vec::new() }
    }
}

/// Mutable run state shared by the master and the D-search. Passed by
/// explicit reference; no component owns global state.
pub struct MasterContext<'a> {
    pub tours: &'a TourList,
    pub blocks: &'a BlockPool,
    pub rules: &'a RuleSet,
    pub cfg: &'a SolverConfig,
    pub rng: &'a mut StdRng,
    pub events: &'a mut EventLog,
    pub budget: &'a RunBudget,
    pub gauge: &'a MemoryGauge,
}

/// Verifies that every tour id has at least one covering column before any
/// solver time is spent.
pub fn zero_support_check(pool: &ColumnPool) -> Result<(), Vec<TourIdx>> {
    let missing = pool.uncovered_tours();
    if missing.is_empty() { Ok(()) } else { Err(missing) }
}

/// Result of the final RMP of a column-generation loop: the fractional values
/// per column (indexed by [`ColumnIdx`]) and the LP objective.
pub struct RmpReport {
    pub feasible: bool,
    pub objective: f64,
    pub values: Vec<f64>,
}

fn solve_rmp(
    pool: &ColumnPool,
    order: &[ColumnIdx],
    cost_fn: &dyn Fn(&Column) -> f64,
    n_tours: usize,
    cap: f64,
) -> (crate::solver::simplex::LpSolution, RmpReport) {
    let cols: Vec<LpColumn> = order
        .iter()
        .map(|&c| {
            let column = pool.column(c);
            LpColumn { cost: cost_fn(column), rows: column.tour_idxs.to_vec() }
        })
        .collect();
    let lp = solve_set_partition_lp(&cols, n_tours, cap);
    let mut values = vec![0.0; pool.len()];
    for (pos, &c) in order.iter().enumerate() {
        values[c as usize] = lp.values[pos];
    }
    let report = RmpReport {
        feasible: lp.status == LpStatus::Optimal,
        objective: lp.objective,
        values,
    };
    (lp, report)
}

/// The RMP / pricing loop: solve the LP relaxation over the current pool,
/// feed the duals to the oracle, insert the returned columns, and repeat
/// until no negative-reduced-cost column exists or the phase budget is
/// exhausted. Returns the last RMP report.
pub fn generate_columns(
    mc: &mut MasterContext,
    pool: &mut ColumnPool,
    oracle: &mut ColumnProducer,
    cap: usize,
    phase: Phase,
) -> RmpReport {
    let n_tours = mc.tours.len();
    let mut last = RmpReport { feasible: false, objective: f64::INFINITY, values: vec![0.0; pool.len()] };
    let mut rescue_rounds = 0usize;
    for round in 0..MAX_CG_ROUNDS {
        let order = pool.canonical_order();
        let (lp, report) = solve_rmp(pool, &order, &|_| 1.0, n_tours, cap as f64);
        last = report;
        if !last.feasible {
            // An infeasible RMP under a tight cap can still become feasible
            // through wider columns. One coverage-priced rescue round pulls
            // them in before infeasibility is reported.
            if rescue_rounds >= 2 {
                debug!("RMP infeasible at cap {} after round {}", cap, round);
                return last;
            }
            rescue_rounds += 1;
            let duals = Duals { tour: vec![2.0; n_tours], cap: 0.0 };
            let batch = {
                let view =
                    PoolView { tours: mc.tours, blocks: mc.blocks, rules: mc.rules, columns: pool };
                oracle.produce(&view, &duals, &mc.budget.phase_budget(phase, CG_BATCH), mc.rng)
            };
            let mut added = 0usize;
            for column in batch {
                if pool.insert(column).is_some() {
                    added += 1;
                }
            }
            pool.next_round();
            mc.events.emit(EventKind::ColumnGenerated { round: pool.round(), added });
            if added == 0 {
                debug!("RMP infeasible at cap {} and no rescue column found", cap);
                return last;
            }
            continue;
        }
        if mc.budget.phase_elapsed(phase) {
            debug!("Column generation stopped by the {} slice", phase.name());
            break;
        }
        let pressure = mc.gauge.pressure(pool.approx_bytes());
        if pressure == MemoryPressure::Hard {
            warn!("Column pool at hard memory cap; stopping generation");
            break;
        }
        let max_new = if pressure == MemoryPressure::Soft { CG_BATCH_BACKOFF } else { CG_BATCH };
        let duals = Duals { tour: lp.duals.clone(), cap: lp.cap_dual };
        let batch = {
            let view = PoolView { tours: mc.tours, blocks: mc.blocks, rules: mc.rules, columns: pool };
            oracle.produce(&view, &duals, &mc.budget.phase_budget(phase, max_new), mc.rng)
        };
        let mut added = 0usize;
        for column in batch {
            if pool.insert(column).is_some() {
                added += 1;
            }
        }
        pool.next_round();
        mc.events.emit(EventKind::ColumnGenerated { round: pool.round(), added });
        if added == 0 {
            debug!("No improving column in round {}; LP objective {:.3}", round, last.objective);
            break;
        }
    }
    // The inserted columns shift the relaxation; refresh the values once.
    let order = pool.canonical_order();
    let (_, report) = solve_rmp(pool, &order, &|_| 1.0, n_tours, cap as f64);
    last = report;
    last
}

/// Restricted MIP: imposes integrality on a bounded subset of columns chosen
/// as elite (by fractional value, then cost) plus freshest (latest rounds),
/// with the only-cover columns always included. Time-limited branch and
/// bound; `Infeasible` is only reported when the searched subset was the
/// whole pool, otherwise an undecided subset solve degrades to `Timeout`.
pub fn restricted_mip(
    mc: &mut MasterContext,
    pool: &ColumnPool,
    rmp: &RmpReport,
    cost_fn: &dyn Fn(&Column) -> f64,
    cap: usize,
    subset_cap: usize,
    deadline: Instant,
) -> MasterOutcome {
    if let Err(missing) = zero_support_check(pool) {
        let mut outcome = MasterOutcome::of(MasterStatus::ZeroSupport);
        outcome.unsupported = missing;
        return outcome;
    }
    let subset = choose_subset(pool, rmp, cost_fn, subset_cap);
    let exhaustive = subset.len() == pool.len();
    debug!(
        "Restricted MIP on {} of {} columns (cap {}, exhaustive: {})",
        subset.len(),
        pool.len(),
        cap,
        exhaustive
    );

    let cols: Vec<MipCol> = subset
        .iter()
        .map(|&c| {
            let column = pool.column(c);
            MipCol {
                idx: c,
                cost: cost_fn(column),
                rows: column.tour_idxs.to_vec(),
                signature: column.signature,
            }
        })
        .collect();
    let mut search = BranchAndBound {
        cols: &cols,
        n_tours: mc.tours.len(),
        deadline,
        incumbent: None,
        timed_out: false,
        nodes: 0,
        events: &mut *mc.events,
    };
    search.run(cap);
    let timed_out = search.timed_out;
    let nodes = search.nodes;
    match search.incumbent.take() {
        Some((objective, chosen)) => {
            let mut selected: Vec<ColumnIdx> = chosen.iter().map(|&i| cols[i].idx).collect();
            selected.sort_by_key(|&c| pool.column(c).signature);
            let status = if timed_out { MasterStatus::Feasible } else { MasterStatus::Optimal };
            info!(
                "MIP finished: {:?}, objective {:.3}, {} columns, {} nodes",
                status,
                objective,
                selected.len(),
                nodes
            );
            MasterOutcome { status, selected, objective, unsupported: Vec::new() }
        }
        None if timed_out => MasterOutcome::of(MasterStatus::Timeout),
        None if exhaustive => MasterOutcome::of(MasterStatus::Infeasible),
        None => MasterOutcome::of(MasterStatus::Timeout),
    }
}

/// Elite + freshest + coverage-completing subset, ordered by signature.
fn choose_subset(
    pool: &ColumnPool,
    rmp: &RmpReport,
    cost_fn: &dyn Fn(&Column) -> f64,
    subset_cap: usize,
) -> Vec<ColumnIdx> {
    let all: Vec<ColumnIdx> = (0..pool.len() as ColumnIdx).collect();
    if pool.len() <= subset_cap {
        let mut subset = all;
        subset.sort_by_key(|&c| pool.column(c).signature);
        return subset;
    }
    let mut subset: BTreeSet<ColumnIdx> = BTreeSet::new();

    let elite_cap = subset_cap * 7 / 10;
    let mut elite = all.clone();
    elite.sort_by(|&a, &b| {
        let (ca, cb) = (pool.column(a), pool.column(b));
        rmp.values[b as usize]
            .partial_cmp(&rmp.values[a as usize])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                cost_fn(ca).partial_cmp(&cost_fn(cb)).unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| ca.signature.cmp(&cb.signature))
    });
    subset.extend(elite.iter().take(elite_cap));

    let fresh_cap = subset_cap - elite_cap;
    let mut fresh = all;
    fresh.sort_by(|&a, &b| {
        pool.round_of(b)
            .cmp(&pool.round_of(a))
            .then_with(|| pool.column(a).signature.cmp(&pool.column(b).signature))
    });
    subset.extend(fresh.iter().take(fresh_cap));

    // Mandatory slice: every tour keeps a cover inside the subset; a tour's
    // only covering column can never be dropped.
    for t in 0..pool.n_tours() as TourIdx {
        let covering = pool.covering(t);
        if covering.iter().any(|c| subset.contains(c)) {
            continue;
        }
        if let Some(&best) = covering.iter().min_by(|&&a, &&b| {
            rmp.values[b as usize]
                .partial_cmp(&rmp.values[a as usize])
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| pool.column(a).signature.cmp(&pool.column(b).signature))
        }) {
            subset.insert(best);
        }
    }

    let mut subset: Vec<ColumnIdx> = subset.into_iter().collect();
    subset.sort_by_key(|&c| pool.column(c).signature);
    subset
}

struct MipCol {
    idx: ColumnIdx,
    cost: f64,
    rows: Vec<TourIdx>,
    signature: u128,
}

/// Depth-first branch and bound over the LP relaxation. Branches dive on the
/// most fractional column first (ties on signature), which reproduces the
/// same tree on every run.
struct BranchAndBound<'a, 'e> {
    cols: &'a [MipCol],
    n_tours: usize,
    deadline: Instant,
    incumbent: Option<(f64, Vec<usize>)>,
    timed_out: bool,
    nodes: u64,
    events: &'e mut EventLog,
}

impl BranchAndBound<'_, '_> {
    fn run(&mut self, cap: usize) {
        let available = vec![true; self.cols.len()];
        let covered = vec![false; self.n_tours];
        self.dfs(available, covered, 0, cap, 0.0, Vec::new());
    }

    /// One node plus its whole exclude-chain: the include branch recurses
    /// (depth bounded by the driver cap), the exclude branch loops in place.
    fn dfs(
        &mut self,
        mut available: Vec<bool>,
        covered: Vec<bool>,
        n_covered: usize,
        cap_left: usize,
        cost: f64,
        chosen: Vec<usize>,
    ) {
        if n_covered == self.n_tours {
            self.offer_incumbent(cost, chosen);
            return;
        }
        if cap_left == 0 {
            return;
        }
        let mut row_map = vec![u32::MAX; self.n_tours];
        let mut n_rows = 0u32;
        for (t, &is_covered) in covered.iter().enumerate() {
            if !is_covered {
                row_map[t] = n_rows;
                n_rows += 1;
            }
        }
        loop {
            if self.timed_out || Instant::now() >= self.deadline {
                self.timed_out = true;
                return;
            }
            self.nodes += 1;

            // Sub-LP over the uncovered rows and the still-compatible columns.
            let mut live: Vec<usize> = Vec::new();
            let mut lp_cols: Vec<LpColumn> = Vec::new();
            for (i, col) in self.cols.iter().enumerate() {
                if !available[i] {
                    continue;
                }
                if col.rows.iter().any(|&r| covered[r as usize]) {
                    available[i] = false;
                    continue;
                }
                live.push(i);
                lp_cols.push(LpColumn {
                    cost: col.cost,
                    rows: col.rows.iter().map(|&r| row_map[r as usize]).collect(),
                });
            }
            let lp = solve_set_partition_lp(&lp_cols, n_rows as usize, cap_left as f64);
            if lp.status == LpStatus::Infeasible {
                return;
            }
            if let Some((best, _)) = &self.incumbent {
                if cost + lp.objective >= best - INT_EPS {
                    return;
                }
            }

            // An integral relaxation solves the node exactly.
            let Some(branch) = pick_fractional(&lp.values, &live, self.cols) else {
                let mut node_chosen = chosen.clone();
                for (pos, &i) in live.iter().enumerate() {
                    if lp.values[pos] > 0.5 {
                        node_chosen.push(i);
                    }
                }
                self.offer_incumbent(cost + lp.objective, node_chosen);
                return;
            };

            // Dive: include the column first, then loop on its exclusion.
            let col = &self.cols[branch];
            let mut covered_in = covered.clone();
            for &r in &col.rows {
                covered_in[r as usize] = true;
            }
            let mut chosen_in = chosen.clone();
            chosen_in.push(branch);
            self.dfs(
                available.clone(),
                covered_in,
                n_covered + col.rows.len(),
                cap_left - 1,
                cost + col.cost,
                chosen_in,
            );
            available[branch] = false;
        }
    }

    fn offer_incumbent(&mut self, objective: f64, chosen: Vec<usize>) {
        let improved = match &self.incumbent {
            None => true,
            Some((best, _)) => objective < best - INT_EPS,
        };
        if improved {
            self.events.emit(EventKind::MipImproved { objective, drivers: chosen.len() });
            self.incumbent = Some((objective, chosen));
        }
    }
}

/// The most fractional live column, ties broken by signature.
fn pick_fractional(values: &[f64], live: &[usize], cols: &[MipCol]) -> Option<usize> {
    let mut best: Option<(f64, usize)> = None;
    for (pos, &i) in live.iter().enumerate() {
        let v = values[pos];
        let distance = v.min(1.0 - v);
        if distance <= INT_EPS {
            continue;
        }
        let replace = match best {
            None => true,
            Some((best_distance, best_i)) => {
                distance > best_distance + INT_EPS
                    || ((distance - best_distance).abs() <= INT_EPS
                        && cols[i].signature < cols[best_i].signature)
            }
        };
        if replace {
            best = Some((distance, i));
        }
    }
    best.map(|(_, i)| i)
}
