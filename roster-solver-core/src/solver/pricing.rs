use crate::model::block::BlockIdx;
use crate::model::column::{Column, ColumnOrigin};
use crate::model::tour::{TourIdx, TourList};
use crate::solver::block_builder::BlockPool;
use crate::solver::budget::PhaseBudget;
use crate::solver::chains;
use crate::solver::pool::ColumnPool;
use crate::solver::rules::RuleSet;
use log::debug;
use rand::rngs::StdRng;
use std::cmp::Ordering;

/// Reduced costs below this are considered improving.
const RC_EPS: f64 = 1e-9;
/// Label frontier kept per day before dominance would blow up.
const MAX_LABELS_PER_DAY: usize = 2_000;

/// Read-only view over the run's arenas, shared by every column producer.
pub struct PoolView<'a> {
    pub tours: &'a TourList,
    pub blocks: &'a BlockPool,
    pub rules: &'a RuleSet,
    pub columns: &'a ColumnPool,
}

/// LP duals of the restricted master: one value per tour row plus the value
/// of the driver-cap row. A column's reduced cost is
/// `cost - sum(tour duals) - cap`.
#[derive(Debug, Clone)]
pub struct Duals {
    pub tour: Vec<f64>,
    pub cap: f64,
}

/// The family of column producers behind a single entry point.
pub enum ColumnProducer {
    /// One-shot seed builder (greedy partitions + fallback singletons).
    Seeder,
    /// Dual-driven pricing oracle.
    Pricer(PricingOracle),
}

impl ColumnProducer {
    pub fn produce(
        &mut self,
        view: &PoolView,
        duals: &Duals,
        budget: &PhaseBudget,
        rng: &mut StdRng,
    ) -> Vec<Column> {
        match self {
            ColumnProducer::Seeder => {
                let mut out = chains::seed_columns(view, rng);
                out.extend(chains::fallback_singletons(view));
                out
            }
            ColumnProducer::Pricer(oracle) => oracle.price(view, duals, budget),
        }
    }
}

/// Constrained shortest path over the expanded day graph, label-setting with
/// dominance. States carry `(day, last block, tours that day, weekly
/// minutes)`; arcs place a block on a later day under the chain rules.
pub struct PricingOracle {
    pub batch_cap: usize,
}

#[derive(Debug, Clone)]
struct Label {
    last_block: BlockIdx,
    last_tours: u8,
    last_end: u32,
    work_min: u32,
    /// Accumulated `-sum(duals)` over the covered tours.
    price: f64,
    blocks: Vec<BlockIdx>,
}

impl PricingOracle {
    pub fn new(batch_cap: usize) -> PricingOracle {
        PricingOracle { batch_cap }
    }

    /// Returns a batch of columns with negative reduced cost, best first, or
    /// an empty batch when no improving column exists (or the budget ran
    /// out before one was found).
    pub fn price(&self, view: &PoolView, duals: &Duals, budget: &PhaseBudget) -> Vec<Column> {
        let mut labels_by_day: Vec<Vec<Label>> = vec![Vec::new(); 7];
        for day in 0..7u8 {
            if budget.expired() {
                debug!("Pricing budget expired at day {}, returning current labels", day);
                break;
            }
            let mut today: Vec<Label> = Vec::new();
            for (idx, block) in view.blocks.blocks_of_day(day) {
                let block_price: f64 = -block
                    .tour_idxs
                    .iter()
                    .map(|&t| duals.tour[t as usize])
                    .sum::<f64>();
                today.push(Label {
                    last_block: idx,
                    last_tours: block.tours_count() as u8,
                    last_end: block.week_end_minute(),
                    work_min: block.work_min,
                    price: block_price,
                    blocks: vec![idx],
                });
                for prev_day in 0..day {
                    for label in &labels_by_day[prev_day as usize] {
                        if label.work_min + block.work_min > view.rules.weekly_cap_min {
                            continue;
                        }
                        let prev = view.blocks.block(label.last_block);
                        if !view.rules.can_chain_days(prev, block) {
                            continue;
                        }
                        let mut blocks = label.blocks.clone();
                        blocks.push(idx);
                        today.push(Label {
                            last_block: idx,
                            last_tours: block.tours_count() as u8,
                            last_end: block.week_end_minute(),
                            work_min: label.work_min + block.work_min,
                            price: label.price + block_price,
                            blocks,
                        });
                    }
                }
            }
            labels_by_day[day as usize] = prune_labels(today);
        }

        let mut improving: Vec<(f64, Column)> = Vec::new();
        for day_labels in &labels_by_day {
            for label in day_labels {
                let reduced_cost = 1.0 + label.price - duals.cap;
                if reduced_cost >= -RC_EPS {
                    continue;
                }
                if view.rules.column_is_legal(&view.blocks.blocks, &label.blocks).is_err() {
                    continue;
                }
                let column = Column::from_blocks(
                    view.tours,
                    &view.blocks.blocks,
                    label.blocks.clone(),
                    ColumnOrigin::Priced,
                );
                if view.columns.contains_signature(column.signature) {
                    continue;
                }
                improving.push((reduced_cost, column));
            }
        }
        // Ties on equal reduced cost break on the covered-tour-ids tuple,
        // never on insertion order.
        improving.sort_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(Ordering::Equal)
                .then_with(|| tour_tuple_cmp(view.tours, &a.1.tour_idxs, &b.1.tour_idxs))
        });
        improving.dedup_by_key(|(_, c)| c.signature);
        let cap = self.batch_cap.min(budget.max_new_columns);
        improving.truncate(cap);
        debug!("Pricing produced {} improving columns", improving.len());
        improving.into_iter().map(|(_, c)| c).collect()
    }
}

fn tour_tuple_cmp(tours: &TourList, a: &[TourIdx], b: &[TourIdx]) -> Ordering {
    let left = a.iter().map(|&t| tours.get(t).id.as_ref());
    let right = b.iter().map(|&t| tours.get(t).id.as_ref());
    left.cmp(right)
}

/// Keeps only non-dominated labels; a label dominates another when it is no
/// worse on end minute, tour count, weekly minutes and price. The frontier is
/// additionally truncated to a fixed size, best price first.
fn prune_labels(mut labels: Vec<Label>) -> Vec<Label> {
    labels.sort_by(|a, b| {
        a.price
            .partial_cmp(&b.price)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.last_end.cmp(&b.last_end))
            .then_with(|| a.blocks.cmp(&b.blocks))
    });
    let mut kept: Vec<Label> = Vec::new();
    'outer: for label in labels {
        for existing in &kept {
            if existing.last_end <= label.last_end
                && existing.last_tours <= label.last_tours
                && existing.work_min <= label.work_min
                && existing.price <= label.price + RC_EPS
                && existing.blocks != label.blocks
            {
                continue 'outer;
            }
        }
        if kept.len() >= MAX_LABELS_PER_DAY {
            break;
        }
        kept.push(label);
    }
    kept
}
