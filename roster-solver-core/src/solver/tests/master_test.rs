use crate::model::column::{Column, ColumnOrigin};
use crate::model::configuration::SolverConfig;
use crate::solver::budget::RunBudget;
use crate::solver::events::EventLog;
use crate::solver::lower_bound::compute_lower_bounds;
use crate::solver::master::{
    MasterContext, MasterStatus, RmpReport, restricted_mip, zero_support_check,
};
use crate::solver::pool::ColumnPool;
use crate::solver::tests::support::{blocks_for, init_logging, normalized, rules, tour};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

#[test]
fn zero_support_names_the_uncovered_tours() {
    let pool = ColumnPool::new(3);
    let missing = zero_support_check(&pool).unwrap_err();
    assert_eq!(missing, vec![0, 1, 2]);
}

#[test]
fn restricted_mip_prefers_the_covering_pair() {
    init_logging();
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 0, 630, 870)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let cfg = SolverConfig::default();
    let mut pool = ColumnPool::new(tours.len());
    for &fallback in &blocks.protected {
        pool.insert(Column::from_blocks(&tours, &blocks.blocks, vec![fallback], ColumnOrigin::Fallback));
    }
    let pair = blocks
        .blocks
        .iter()
        .enumerate()
        .find(|(_, b)| b.tours_count() == 2)
        .map(|(i, _)| i as u32)
        .unwrap();
    pool.insert(Column::from_blocks(&tours, &blocks.blocks, vec![pair], ColumnOrigin::Seed));

    let budget = RunBudget::start(&cfg);
    let mut events = EventLog::new(None);
    let mut rng = StdRng::seed_from_u64(0);
    let gauge = crate::solver::budget::MemoryGauge::default();
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
    let report = RmpReport { feasible: true, objective: 1.0, values: vec![0.0; pool.len()] };
    let outcome = restricted_mip(
        &mut mc,
        &pool,
        &report,
        &|_| 1.0,
        5,
        100,
        Instant::now() + Duration::from_secs(30),
    );
    assert_eq!(outcome.status, MasterStatus::Optimal);
    assert_eq!(outcome.selected.len(), 1);
    let chosen = pool.column(outcome.selected[0]);
    assert_eq!(chosen.tour_idxs.len(), 2);
}

#[test]
fn restricted_mip_proves_infeasibility_under_a_tight_cap() {
    init_logging();
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 0, 720, 960)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let cfg = SolverConfig::default();
    let mut pool = ColumnPool::new(tours.len());
    for &fallback in &blocks.protected {
        pool.insert(Column::from_blocks(&tours, &blocks.blocks, vec![fallback], ColumnOrigin::Fallback));
    }
    let budget = RunBudget::start(&cfg);
    let mut events = EventLog::new(None);
    let mut rng = StdRng::seed_from_u64(0);
    let gauge = crate::solver::budget::MemoryGauge::default();
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
    let report = RmpReport { feasible: true, objective: 2.0, values: vec![0.0; pool.len()] };
    let outcome = restricted_mip(
        &mut mc,
        &pool,
        &report,
        &|_| 1.0,
        1,
        100,
        Instant::now() + Duration::from_secs(30),
    );
    assert_eq!(outcome.status, MasterStatus::Infeasible);
}

#[test]
fn lower_bounds_combine_hours_fleet_and_graph() {
    init_logging();
    // Three concurrent tours: the fleet bound dominates.
    let tours = normalized(vec![
        tour("A", 0, 360, 600),
        tour("B", 0, 360, 600),
        tour("C", 0, 360, 600),
    ]);
    let bounds = compute_lower_bounds(&tours, &rules());
    assert_eq!(bounds.fleet_lb, 3);
    assert_eq!(bounds.graph_lb, 3);
    assert_eq!(bounds.hours_lb, 1);
    assert_eq!(bounds.final_lb, 3);

    // An 11h-rest conflict forces two drivers through the graph bound.
    let tours = normalized(vec![tour("A", 0, 960, 1320), tour("B", 1, 360, 600)]);
    let bounds = compute_lower_bounds(&tours, &rules());
    assert_eq!(bounds.fleet_lb, 1);
    assert_eq!(bounds.graph_lb, 2);
    assert_eq!(bounds.final_lb, 2);
}
