use crate::error::KernelError;
use crate::model::column::ColumnIdx;
use crate::model::configuration::SolverConfig;
use crate::model::driver::{DriverPool, DriverSpec};
use crate::model::plan::{Assignment, Kpis, Plan, PlanStatus, Reason, ReasonCode};
use crate::model::tour::{Tour, TourList};
use crate::solver::block_builder::{BlockPool, build_block_pool};
use crate::solver::budget::{MemoryGauge, MemoryPressure, Phase, RunBudget};
use crate::solver::dsearch;
use crate::solver::events::{CancellationToken, EventKind, EventLog, EventSink};
use crate::solver::kpi;
use crate::solver::lower_bound::compute_lower_bounds;
use crate::solver::master::MasterContext;
use crate::solver::pool::ColumnPool;
use crate::solver::pricing::{ColumnProducer, Duals, PoolView, PricingOracle};
use crate::solver::rules::RuleSet;
use crate::solver::signing;
use log::{info, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::collections::{HashMap, HashSet};

/// Pricing batch cap handed to the oracle.
const ORACLE_BATCH: usize = 40;

/// Everything a kernel run consumes. The tour list and the configuration are
/// immutable once the run starts.
pub struct SolveRequest {
    pub tours: Vec<Tour>,
    pub drivers: Option<Vec<DriverSpec>>,
    pub config: SolverConfig,
    /// Clamp reports collected while parsing the configuration bundle.
    pub config_reasons: Vec<Reason>,
}

impl SolveRequest {
    pub fn new(tours: Vec<Tour>, config: SolverConfig) -> SolveRequest {
        SolveRequest { tours, drivers: None, config, config_reasons: Vec::new() }
    }
}

/// Runs the solver kernel: normalisation, block building, seed and priced
/// columns, the lexicographic D-search, polish, validation and signing.
/// Input rejections and hard violations abort with an error; every other
/// outcome is reported through the Plan status.
pub fn solve(
    request: SolveRequest,
    sink: Option<Box<dyn EventSink>>,
    cancel: CancellationToken,
) -> Result<Plan, KernelError> {
    let mut cfg = request.config;
    let mut reasons = request.config_reasons;
    cfg.clamp(&mut reasons);

    let tours = TourList::normalize(request.tours)?;
    let input_hash = signing::input_hash(&tours);
    let config_hash = signing::config_hash(&cfg);
    let pool_spec = match request.drivers {
        Some(specs) => DriverPool::from_specs(specs)?,
        None => DriverPool::virtual_pool(),
    };
    info!(
        "Kernel run: {} tours, input {}, config {}",
        tours.len(),
        &input_hash[..12],
        &config_hash[..12]
    );

    let mut events = EventLog::new(sink);
    let budget = RunBudget::start(&cfg);
    let gauge = MemoryGauge::default();
    let mut rng = StdRng::seed_from_u64(cfg.seed);
    let rules = RuleSet::from_config(&cfg);

    if tours.is_empty() {
        let mut plan = empty_plan(PlanStatus::Optimal, reasons, input_hash, config_hash);
        plan.output_hash = Some(signing::output_hash(&plan.assignments));
        return Ok(plan);
    }

    // --- Profiling phase: pool statistics and bounds.
    events.emit(EventKind::PhaseStarted { phase: Phase::Profiling.name() });
    let blocks = build_block_pool(&tours, &rules, &cfg);
    let bounds = compute_lower_bounds(&tours, &rules);
    record_overrun(&budget, Phase::Profiling, &mut events, &mut reasons);

    // --- Construction phase: seeds plus the guaranteed fallbacks.
    events.emit(EventKind::PhaseStarted { phase: Phase::Construction.name() });
    let mut columns = ColumnPool::new(tours.len());
    {
        let zero_duals = Duals { tour: vec![0.0; tours.len()], cap: 0.0 };
        let mut seeder = ColumnProducer::Seeder;
        let batch = {
            let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &columns };
            seeder.produce(
                &view,
                &zero_duals,
                &budget.phase_budget(Phase::Construction, usize::MAX),
                &mut rng,
            )
        };
        for column in batch {
            columns.insert(column);
        }
    }
    columns.log_stats("seeded");

    // A tour whose last-resort singleton cannot be worked under the weekly
    // caps can never be assigned, whatever the driver cap.
    let impossible = columns.uncovered_tours();
    if !impossible.is_empty() {
        let ids: Vec<&str> = impossible.iter().map(|&t| tours.get(t).id.as_ref()).collect();
        warn!("{} tours cannot be covered by any legal column: {:?}", ids.len(), ids);
        reasons.push(Reason::new(
            ReasonCode::InfeasibleUnderCap,
            format!("tours without any legal column: {}", ids.join(", ")),
        ));
        return Ok(empty_plan(PlanStatus::Infeasible, reasons, input_hash, config_hash));
    }
    if let Some(reason) = qualification_gap(&tours, &pool_spec) {
        reasons.push(reason);
        return Ok(empty_plan(PlanStatus::Infeasible, reasons, input_hash, config_hash));
    }
    if gauge.pressure(columns.approx_bytes()) == MemoryPressure::Hard {
        reasons.push(Reason::new(
            ReasonCode::MemoryExceeded,
            format!("column pool estimate {} bytes", columns.approx_bytes()),
        ));
        return Ok(empty_plan(PlanStatus::MemoryExceeded, reasons, input_hash, config_hash));
    }
    record_overrun(&budget, Phase::Construction, &mut events, &mut reasons);

    // --- Search phase: lexicographic driver minimisation.
    events.emit(EventKind::PhaseStarted { phase: Phase::Search.name() });
    let mut oracle = ColumnProducer::Pricer(PricingOracle::new(ORACLE_BATCH));
    let search_outcome = {
        let mut mc = MasterContext {
            tours: &tours,
            blocks: &blocks,
            rules: &rules,
            cfg: &cfg,
            rng: &mut rng,
            events: &mut events,
            budget: &budget,
            gauge: &gauge,
        };
        dsearch::search(&mut mc, &mut columns, &mut oracle, &bounds, pool_spec.cap(), &cancel)
    };
    record_overrun(&budget, Phase::Search, &mut events, &mut reasons);
    if search_outcome.cancelled {
        events.emit(EventKind::Cancelled);
        reasons.push(Reason::new(ReasonCode::Cancelled, "run cancelled".to_string()));
    }

    let Some((d_star, incumbent)) = search_outcome.best.clone() else {
        let status = if search_outcome.cancelled {
            PlanStatus::Infeasible
        } else if search_outcome.timed_out {
            reasons.push(Reason::new(ReasonCode::Timeout, "no feasible plan within budget".to_string()));
            PlanStatus::Timeout
        } else {
            let cap = pool_spec.cap().unwrap_or(tours.len());
            reasons.push(Reason::new(
                ReasonCode::InfeasibleUnderCap,
                format!("no assignment of every tour is possible under driver cap {cap}"),
            ));
            PlanStatus::Infeasible
        };
        return Ok(empty_plan(status, reasons, input_hash, config_hash));
    };

    // --- Polish phase: secondary objectives at fixed D*.
    events.emit(EventKind::PhaseStarted { phase: Phase::Polish.name() });
    let selection = if search_outcome.cancelled {
        incumbent
    } else {
        let mut mc = MasterContext {
            tours: &tours,
            blocks: &blocks,
            rules: &rules,
            cfg: &cfg,
            rng: &mut rng,
            events: &mut events,
            budget: &budget,
            gauge: &gauge,
        };
        dsearch::polish(&mut mc, &mut columns, d_star, incumbent)
    };
    record_overrun(&budget, Phase::Polish, &mut events, &mut reasons);

    // --- Validation: the kernel fails closed on BLOCK severity findings.
    let violations = kpi::validate(&tours, &blocks, &columns, &selection, &rules);
    if kpi::has_block_violation(&violations) {
        let first = violations
            .iter()
            .find(|v| v.severity == kpi::Severity::Block)
            .map(|v| format!("{}: {}", v.code, v.detail))
            .unwrap_or_default();
        return Err(KernelError::HardViolation(first));
    }
    let mut kpis = kpi::compute_kpis(&tours, &blocks, &columns, &selection, &rules);
    kpis.peak_memory_bytes = columns.approx_bytes();

    let assignments = match build_assignments(&tours, &blocks, &columns, &selection, &rules, &pool_spec) {
        Ok(assignments) => assignments,
        Err(reason) => {
            reasons.push(reason);
            return Ok(empty_plan(PlanStatus::Infeasible, reasons, input_hash, config_hash));
        }
    };

    let status = if search_outcome.cancelled {
        PlanStatus::Partial
    } else if search_outcome.proven_optimal {
        PlanStatus::Optimal
    } else {
        PlanStatus::Feasible
    };
    let output_hash = if status.is_accepted() {
        Some(signing::output_hash(&assignments))
    } else {
        None
    };
    info!(
        "Plan {:?}: {} drivers ({} FTE, {} PT), {}/{} tours",
        status, kpis.drivers_total, kpis.fte_count, kpis.pt_count, kpis.tours_assigned, kpis.tours_total
    );
    Ok(Plan { status, assignments, kpis, reasons, input_hash, config_hash, output_hash })
}

fn empty_plan(
    status: PlanStatus,
    reasons: Vec<Reason>,
    input_hash: String,
    config_hash: String,
) -> Plan {
    Plan {
        status,
        assignments: Vec::new(),
        kpis: Kpis::default(),
        reasons,
        input_hash,
        config_hash,
        output_hash: None,
    }
}

fn record_overrun(budget: &RunBudget, phase: Phase, events: &mut EventLog, reasons: &mut Vec<Reason>) {
    if let Some(reason) = budget.overrun(phase) {
        events.emit(EventKind::BudgetOverrun { phase: phase.name() });
        reasons.push(reason);
    }
}

/// A tour requiring a qualification no pooled driver holds can never be
/// assigned; reported before any solver time is spent on it.
fn qualification_gap(tours: &TourList, pool: &DriverPool) -> Option<Reason> {
    if pool.is_virtual() {
        return None;
    }
    let mut missing: Vec<&str> = Vec::new();
    for tour in tours.iter() {
        if let Some(required) = &tour.qualification {
            let covered = pool
                .drivers()
                .iter()
                .any(|d| d.qualifications.iter().any(|q| q == required));
            if !covered {
                missing.push(tour.id.as_ref());
            }
        }
    }
    if missing.is_empty() {
        None
    } else {
        Some(Reason::new(
            ReasonCode::InfeasibleUnderCap,
            format!("no pooled driver is qualified for tours: {}", missing.join(", ")),
        ))
    }
}

/// Renders the selected columns as assignments. Virtual drivers are minted
/// `FTE-xx`/`PT-xx` in canonical column order; a real pool is matched
/// greedily, most-constrained columns first.
fn build_assignments(
    tours: &TourList,
    blocks: &BlockPool,
    columns: &ColumnPool,
    selection: &[ColumnIdx],
    rules: &RuleSet,
    pool: &DriverPool,
) -> Result<Vec<Assignment>, Reason> {
    let mut ordered: Vec<ColumnIdx> = selection.to_vec();
    ordered.sort_by_key(|&c| columns.column(c).signature);

    let driver_ids: Vec<Box<str>> = if pool.is_virtual() {
        mint_virtual_ids(columns, &ordered, rules)
    } else {
        match_pool_drivers(tours, columns, &ordered, pool)?
    };

    let mut assignments = Vec::new();
    for (column_idx, driver_id) in ordered.iter().zip(driver_ids) {
        let column = columns.column(*column_idx);
        let driver_type = rules.driver_type(column.work_min);
        for &b in column.block_idxs.iter() {
            let block = blocks.block(b);
            assignments.push(Assignment {
                driver_id: driver_id.clone(),
                driver_type,
                day: block.day,
                block_id: block.id.clone(),
                tour_ids: block.tour_idxs.iter().map(|&t| tours.get(t).id.clone()).collect(),
                work_minutes: block.work_min,
            });
        }
    }
    assignments.sort_by(|a, b| (a.driver_id.as_ref(), a.day).cmp(&(b.driver_id.as_ref(), b.day)));
    Ok(assignments)
}

fn mint_virtual_ids(columns: &ColumnPool, ordered: &[ColumnIdx], rules: &RuleSet) -> Vec<Box<str>> {
    let mut fte = 0usize;
    let mut pt = 0usize;
    ordered
        .iter()
        .map(|&c| {
            let column = columns.column(c);
            match rules.driver_type(column.work_min) {
                crate::model::column::DriverType::Fte => {
                    fte += 1;
                    format!("FTE-{fte:02}").into_boxed_str()
                }
                crate::model::column::DriverType::Pt => {
                    pt += 1;
                    format!("PT-{pt:02}").into_boxed_str()
                }
            }
        })
        .collect()
}

fn match_pool_drivers(
    tours: &TourList,
    columns: &ColumnPool,
    ordered: &[ColumnIdx],
    pool: &DriverPool,
) -> Result<Vec<Box<str>>, Reason> {
    // Most-constrained columns first, then canonical order.
    let mut ranked: Vec<usize> = (0..ordered.len()).collect();
    let required_quals: Vec<HashSet<&str>> = ordered
        .iter()
        .map(|&c| {
            columns.column(c)
                .tour_idxs
                .iter()
                .filter_map(|&t| tours.get(t).qualification.as_deref())
                .collect()
        })
        .collect();
    ranked.sort_by(|&a, &b| {
        required_quals[b]
            .len()
            .cmp(&required_quals[a].len())
            .then_with(|| {
                columns.column(ordered[a]).signature.cmp(&columns.column(ordered[b]).signature)
            })
    });

    let mut taken: HashSet<&str> = HashSet::new();
    let mut assigned: HashMap<usize, Box<str>> = HashMap::new();
    for &pos in &ranked {
        let chosen = pool.drivers().iter().find(|d| {
            !taken.contains(d.id.as_ref()) && pool.is_qualified(d, &required_quals[pos])
        });
        match chosen {
            Some(driver) => {
                taken.insert(driver.id.as_ref());
                assigned.insert(pos, driver.id.clone());
            }
            None => {
                return Err(Reason::new(
                    ReasonCode::InfeasibleUnderCap,
                    "driver pool cannot staff the selected roster (qualifications)".to_string(),
                ));
            }
        }
    }
    Ok((0..ordered.len()).map(|pos| assigned.remove(&pos).unwrap()).collect())
}
