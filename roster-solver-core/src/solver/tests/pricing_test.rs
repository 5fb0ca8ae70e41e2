use crate::model::column::{Column, ColumnOrigin};
use crate::solver::budget::PhaseBudget;
use crate::solver::pool::ColumnPool;
use crate::solver::pricing::{Duals, PoolView, PricingOracle};
use crate::solver::tests::support::{blocks_for, normalized, rules, tour};
use std::time::{Duration, Instant};

fn far_deadline() -> PhaseBudget {
    PhaseBudget { deadline: Instant::now() + Duration::from_secs(60), max_new_columns: 100 }
}

#[test]
fn oracle_discovers_a_multi_day_column() {
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 1, 360, 600)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let mut pool = ColumnPool::new(tours.len());
    // Seed only the singletons, so the 2-day column is the missing one.
    for &fallback in &blocks.protected {
        pool.insert(Column::from_blocks(&tours, &blocks.blocks, vec![fallback], ColumnOrigin::Fallback));
    }
    let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &pool };
    let oracle = PricingOracle::new(10);
    // Each tour row prices at 1.0: the 2-day column has reduced cost -1.
    let duals = Duals { tour: vec![1.0, 1.0], cap: 0.0 };
    let batch = oracle.price(&view, &duals, &far_deadline());
    assert!(!batch.is_empty());
    let best = &batch[0];
    assert_eq!(best.tour_idxs.len(), 2);
    assert_eq!(best.days_worked, 2);
    assert_eq!(best.origin, ColumnOrigin::Priced);
}

#[test]
fn oracle_returns_nothing_without_improvement() {
    let tours = normalized(vec![tour("A", 0, 360, 600), tour("B", 1, 360, 600)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let pool = ColumnPool::new(tours.len());
    let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &pool };
    let oracle = PricingOracle::new(10);
    let duals = Duals { tour: vec![0.0, 0.0], cap: 0.0 };
    assert!(oracle.price(&view, &duals, &far_deadline()).is_empty());
}

#[test]
fn oracle_skips_columns_already_pooled() {
    let tours = normalized(vec![tour("A", 0, 360, 600)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let mut pool = ColumnPool::new(tours.len());
    pool.insert(Column::from_blocks(&tours, &blocks.blocks, vec![blocks.protected[0]], ColumnOrigin::Fallback));
    let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &pool };
    let oracle = PricingOracle::new(10);
    let duals = Duals { tour: vec![5.0], cap: 0.0 };
    // The only improving column is already in the pool.
    assert!(oracle.price(&view, &duals, &far_deadline()).is_empty());
}

#[test]
fn oracle_respects_the_weekly_cap() {
    // Two 10h tours on separate days: 20h fits, but not under a 12h cap.
    let mut cfg = crate::model::configuration::SolverConfig::default();
    cfg.weekly_hard_cap = 12.0;
    let rules = crate::solver::rules::RuleSet::from_config(&cfg);
    let tours = normalized(vec![tour("A", 0, 360, 960), tour("B", 1, 360, 960)]);
    let blocks = crate::solver::block_builder::build_block_pool(&tours, &rules, &cfg);
    let pool = ColumnPool::new(tours.len());
    let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &pool };
    let oracle = PricingOracle::new(10);
    let duals = Duals { tour: vec![1.0, 1.0], cap: 0.0 };
    let batch = oracle.price(&view, &duals, &far_deadline());
    assert!(batch.iter().all(|c| c.days_worked == 1));
}

#[test]
fn ties_break_on_the_tour_id_tuple() {
    // Two interchangeable singleton days with identical duals.
    let tours = normalized(vec![tour("X", 0, 360, 600), tour("Y", 1, 360, 600)]);
    let rules = rules();
    let blocks = blocks_for(&tours);
    let pool = ColumnPool::new(tours.len());
    let view = PoolView { tours: &tours, blocks: &blocks, rules: &rules, columns: &pool };
    let oracle = PricingOracle::new(1);
    let duals = Duals { tour: vec![2.0, 2.0], cap: 0.0 };
    let batch = oracle.price(&view, &duals, &far_deadline());
    assert_eq!(batch.len(), 1);
    // The 2-day column covering both is strictly better than either single.
    assert_eq!(batch[0].tour_idxs.len(), 2);
}
